/// Camera pose conventions shared with the capture driver.
///
/// The driver orbits a fixed-radius sphere around the origin with world +Z
/// up, aiming the camera's -Z axis at the origin. Everything here works on
/// the row-major camera-to-world matrices the driver writes to metadata.
use constants::PITCH_FOLD_TOLERANCE;
use glam::DVec3;

/// Extracted orientation of a single view (radians).
#[derive(Debug, Clone, Copy)]
pub struct CameraAngles {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl CameraAngles {
    /// Manifest representation: `[yaw, pitch, roll]`.
    pub fn to_array(self) -> [f64; 3] {
        [self.yaw, self.pitch, self.roll]
    }
}

/// Camera centre on the capture sphere for the given azimuth/polar angles.
pub fn spherical_position(azimuth: f64, polar: f64, radius: f64) -> DVec3 {
    DVec3::new(
        radius * polar.sin() * azimuth.cos(),
        radius * polar.sin() * azimuth.sin(),
        radius * polar.cos(),
    )
}

/// Row-major camera-to-world matrix for a camera at `position` aimed at the
/// origin, world +Z as the up reference.
///
/// `position` must not be colinear with the up axis; the driver clips its
/// polar angles away from the poles.
pub fn look_at_origin(position: DVec3) -> [[f64; 4]; 4] {
    let back = position.normalize();
    let right = DVec3::Z.cross(back).normalize();
    let up = back.cross(right);

    [
        [right.x, up.x, back.x, position.x],
        [right.y, up.y, back.y, position.y],
        [right.z, up.z, back.z, position.z],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

/// Camera centre stored in a camera-to-world matrix.
pub fn position(transform: &[[f64; 4]; 4]) -> DVec3 {
    DVec3::new(transform[0][3], transform[1][3], transform[2][3])
}

/// Extract yaw/pitch/roll from a row-major camera-to-world matrix.
///
/// Pitch is folded into [0, pi]; a negative pitch further than numeric noise
/// from 0 or -pi means the matrix does not describe an origin-facing orbit
/// pose and the view is reported as corrupt.
pub fn euler_angles(transform: &[[f64; 4]; 4]) -> Result<CameraAngles, String> {
    let yaw = transform[1][0].atan2(transform[0][0]);

    let mut pitch = transform[2][1].atan2(transform[2][2]);
    if pitch < 0.0 {
        if pitch >= -PITCH_FOLD_TOLERANCE
            || (std::f64::consts::PI + pitch).abs() <= PITCH_FOLD_TOLERANCE
        {
            pitch = pitch.abs();
        } else {
            return Err(format!("pitch {pitch:.6} outside the [0, pi] fold"));
        }
    }

    let roll = (-transform[2][0]).atan2(transform[2][1].hypot(transform[2][2]));

    Ok(CameraAngles { yaw, pitch, roll })
}

/// Unit view direction implied by extracted yaw/pitch angles.
/// Inverse of `euler_angles` as far as the look-at direction is concerned.
pub fn look_direction(yaw: f64, pitch: f64) -> DVec3 {
    DVec3::new(
        -pitch.sin() * yaw.sin(),
        pitch.sin() * yaw.cos(),
        -pitch.cos(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::PI;

    const EPS: f64 = 1e-9;

    #[test]
    fn look_at_basis_is_orthonormal() {
        let transform = look_at_origin(spherical_position(0.7, 1.1, 3.5));
        let right = DVec3::new(transform[0][0], transform[1][0], transform[2][0]);
        let up = DVec3::new(transform[0][1], transform[1][1], transform[2][1]);
        let back = DVec3::new(transform[0][2], transform[1][2], transform[2][2]);

        assert!((right.length() - 1.0).abs() < EPS);
        assert!((up.length() - 1.0).abs() < EPS);
        assert!((back.length() - 1.0).abs() < EPS);
        assert!(right.dot(up).abs() < EPS);
        assert!(right.dot(back).abs() < EPS);
        assert!(up.dot(back).abs() < EPS);
    }

    #[test]
    fn pitch_matches_polar_angle() {
        let transform = look_at_origin(spherical_position(0.0, PI / 2.0, 3.5));
        let angles = euler_angles(&transform).unwrap();
        assert!((angles.pitch - PI / 2.0).abs() < EPS);
        assert!(angles.roll.abs() < EPS);
    }

    #[test]
    fn round_trip_reproduces_look_direction() {
        // Same pose distribution the capture driver samples from.
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..64 {
            let azimuth = rng.random::<f64>() * 2.0 * PI - PI;
            let polar = (1.0 - 2.0 * rng.random::<f64>()).acos();
            let eye = spherical_position(azimuth, polar, constants::CAMERA_RADIUS);

            let angles = euler_angles(&look_at_origin(eye)).unwrap();
            assert!(angles.yaw >= -PI && angles.yaw <= PI);
            assert!((angles.pitch - polar).abs() < 1e-6);
            assert!(angles.roll.abs() < 1e-6);

            let expected = -eye.normalize();
            let rebuilt = look_direction(angles.yaw, angles.pitch);
            assert!((rebuilt - expected).length() < 1e-6);
        }
    }

    #[test]
    fn negative_pitch_folds_within_tolerance() {
        let mut transform = look_at_origin(spherical_position(0.3, 1.0, 3.5));
        transform[2][1] = -1e-9;
        transform[2][2] = 1.0;
        let angles = euler_angles(&transform).unwrap();
        assert!(angles.pitch >= 0.0);
    }

    #[test]
    fn out_of_fold_pitch_is_rejected() {
        let mut transform = look_at_origin(spherical_position(0.3, 1.0, 3.5));
        transform[2][1] = -0.5;
        transform[2][2] = 0.866;
        assert!(euler_angles(&transform).is_err());
    }

    #[test]
    fn position_reads_translation_column() {
        let eye = spherical_position(1.2, 0.8, 3.5);
        let transform = look_at_origin(eye);
        assert!((position(&transform) - eye).length() < EPS);
    }
}
