/// Camera conventions shared with the capture driver

/// Views rendered per model by the capture driver
pub const VIEWS_PER_MODEL: usize = 128;

/// Orbit radius the driver places the camera at (world units)
pub const CAMERA_RADIUS: f64 = 3.5;

/// Horizontal field of view the driver renders with (radians)
pub const CAMERA_FOV: f64 = std::f64::consts::FRAC_PI_4;

/// Negative pitch is folded into [0, pi] only within this tolerance of 0 or -pi
pub const PITCH_FOLD_TOLERANCE: f64 = 1e-6;

/// Maximum mean |roll| accepted for origin-facing datasets (radians)
pub const ROLL_TOLERANCE: f64 = 1e-5;

/// Minimum root-sum-square spread of yaw and pitch over a dataset.
/// An all-zero angle column means the metadata is broken.
pub const MIN_ANGLE_SPREAD: f64 = 0.1;
