/// Training manifest (`dataset.json`) assembly.
use crate::camera::CameraAngles;
use constants::MANIFEST_FILE_NAME;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One converted view, as reported by a conversion worker.
#[derive(Debug, Clone)]
pub struct ViewEntry {
    /// Flattened image path relative to the dataset root.
    pub path: String,
    /// Orientation extracted from the view's camera transform.
    pub angles: CameraAngles,
    /// Class label of the view's collection.
    pub label: u32,
    /// Distance of the camera centre from the look-at centre.
    pub camera_distance: f64,
}

/// Final training-ready index over the packaged images.
#[derive(Debug, Serialize, Deserialize)]
pub struct DatasetManifest {
    /// Extracted yaw/pitch/roll per packaged image path.
    pub camera_angles: BTreeMap<String, [f64; 3]>,
    /// Class label per packaged image path, one class per collection.
    pub labels: BTreeMap<String, u32>,
}

impl DatasetManifest {
    /// Merge worker results into the final index. Runs on the coordinating
    /// thread once the worker pool has joined; workers share no state.
    pub fn from_entries(entries: &[ViewEntry]) -> Self {
        let mut camera_angles = BTreeMap::new();
        let mut labels = BTreeMap::new();
        for entry in entries {
            camera_angles.insert(entry.path.clone(), entry.angles.to_array());
            labels.insert(entry.path.clone(), entry.label);
        }
        Self {
            camera_angles,
            labels,
        }
    }

    /// Write `dataset.json` under the dataset root and return its path.
    pub fn save(&self, dataset_root: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let path = dataset_root.join(MANIFEST_FILE_NAME);
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    /// Number of distinct class labels.
    pub fn class_count(&self) -> usize {
        let mut seen: Vec<u32> = self.labels.values().copied().collect();
        seen.sort_unstable();
        seen.dedup();
        seen.len()
    }
}
