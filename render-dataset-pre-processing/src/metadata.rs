/// Per-collection camera metadata written by the capture driver.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

/// Camera record for a single rendered view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Image path relative to the dataset root, without extension.
    pub file_path: String,
    /// Row-major camera-to-world matrix at render time.
    pub transform_matrix: [[f64; 4]; 4],
    /// Yaw/pitch/roll the driver sampled for this view (radians).
    pub camera_angles: [f64; 3],
    /// Orbit radius the camera was placed at.
    pub camera_radius: f64,
    /// Horizontal field of view (radians).
    pub fov: f64,
}

/// Full metadata document: model name to its rendered frames.
pub type CollectionMetadata = BTreeMap<String, Vec<FrameRecord>>;

/// Load a collection's `metadata.json`.
pub fn load_collection_metadata(
    path: &Path,
) -> Result<CollectionMetadata, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Write a collection's `metadata.json`.
pub fn save_collection_metadata(
    path: &Path,
    metadata: &CollectionMetadata,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = serde_json::to_string_pretty(metadata)?;
    fs::write(path, text)?;
    Ok(())
}

/// Metadata restricted to the given models, preserving record order.
pub fn retain_models(metadata: &CollectionMetadata, keep: &HashSet<String>) -> CollectionMetadata {
    metadata
        .iter()
        .filter(|(model, _)| keep.contains(model.as_str()))
        .map(|(model, frames)| (model.clone(), frames.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{look_at_origin, spherical_position};

    fn frame(index: usize) -> FrameRecord {
        FrameRecord {
            file_path: format!("apple/model_a/{index:06}"),
            transform_matrix: look_at_origin(spherical_position(
                0.4,
                1.2,
                constants::CAMERA_RADIUS,
            )),
            camera_angles: [0.4, 1.2, 0.0],
            camera_radius: constants::CAMERA_RADIUS,
            fov: constants::CAMERA_FOV,
        }
    }

    #[test]
    fn frame_record_round_trips_through_json() {
        let record = frame(3);
        let text = serde_json::to_string(&record).unwrap();
        let back: FrameRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back.file_path, record.file_path);
        assert_eq!(back.transform_matrix, record.transform_matrix);
        assert_eq!(back.camera_radius, record.camera_radius);
    }

    #[test]
    fn retain_models_drops_unlisted_models() {
        let mut metadata = CollectionMetadata::new();
        metadata.insert("model_a".to_string(), vec![frame(0), frame(1)]);
        metadata.insert("model_b".to_string(), vec![frame(0)]);

        let keep: HashSet<String> = ["model_a".to_string()].into_iter().collect();
        let filtered = retain_models(&metadata, &keep);

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered["model_a"].len(), 2);
        assert!(!filtered.contains_key("model_b"));
    }
}
