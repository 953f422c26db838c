/// Filtered render tree to packaged training dataset conversion.
use crate::archive::pack_directory;
use crate::camera;
use crate::filesystem::{flatten_view_path, path_key, sorted_subdirectories};
use crate::manifest::{DatasetManifest, ViewEntry};
use crate::metadata::load_collection_metadata;
use constants::{DEPTH_MARKER, METADATA_FILE_NAME, MIN_ANGLE_SPREAD, NORMAL_MARKER, ROLL_TOLERANCE};
use image::imageops::FilterType;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One view scheduled for conversion.
struct ViewTask {
    source: PathBuf,
    /// Flattened output path relative to the dataset root.
    output_key: String,
    transform: [[f64; 4]; 4],
    label: u32,
}

/// Converter producing the flattened, resized training layout plus its
/// `dataset.json` manifest.
pub struct DatasetConverter {
    src_root: PathBuf,
    dst_root: PathBuf,
    resolution: u32,
    jobs: usize,
    pack_archive: bool,
    keep_roll: bool,
}

impl DatasetConverter {
    /// Validates configuration up front; violations are fatal.
    pub fn new(
        src_root: &Path,
        dst_root: &Path,
        resolution: u32,
        jobs: usize,
        pack_archive: bool,
        keep_roll: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        if !src_root.is_dir() {
            return Err(format!("Source directory does not exist: {}", src_root.display()).into());
        }
        if resolution == 0 {
            return Err("Target resolution must be at least 1".into());
        }
        if jobs == 0 {
            return Err("Job count must be at least 1".into());
        }

        fs::create_dir_all(dst_root)?;

        Ok(Self {
            src_root: src_root.to_path_buf(),
            dst_root: dst_root.to_path_buf(),
            resolution,
            jobs,
            pack_archive,
            keep_roll,
        })
    }

    /// Executes the conversion pipeline: transform join, view fan-out,
    /// angle validation, manifest write, optional archive packing.
    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let transforms = self.collect_transforms()?;
        println!("Loaded camera transforms for {} views", transforms.len());

        let tasks = self.collect_tasks(&transforms)?;
        if tasks.is_empty() {
            return Err(format!("No convertible views under {}", self.src_root.display()).into());
        }
        println!(
            "Converting {} views to {}x{}",
            tasks.len(),
            self.resolution,
            self.resolution
        );

        let entries = self.convert_views(&tasks)?;
        if entries.is_empty() {
            return Err("No views survived conversion".into());
        }

        self.validate_angles(&entries)?;
        report_camera_distances(&entries);

        let manifest = DatasetManifest::from_entries(&entries);
        let manifest_path = manifest.save(&self.dst_root)?;
        println!("Generated training manifest: {}", manifest_path.display());
        println!("  Views: {}", manifest.camera_angles.len());
        println!("  Classes: {}", manifest.class_count());

        if self.pack_archive {
            let archive_path = pack_directory(&self.dst_root)?;
            println!("Packed dataset into {}", archive_path.display());
        }

        Ok(())
    }

    /// Nested view key (`collection/model/view.png`) to camera-to-world
    /// transform, joined across all collection metadata files.
    fn collect_transforms(
        &self,
    ) -> Result<HashMap<String, [[f64; 4]; 4]>, Box<dyn std::error::Error>> {
        let mut transforms = HashMap::new();
        for collection_dir in sorted_subdirectories(&self.src_root)? {
            let Some(collection) = dir_name(&collection_dir) else {
                continue;
            };
            let metadata = match load_collection_metadata(&collection_dir.join(METADATA_FILE_NAME))
            {
                Ok(metadata) => metadata,
                Err(err) => {
                    eprintln!("Warning: skipping collection {collection}: {err}");
                    continue;
                }
            };
            for (model, frames) in &metadata {
                for frame in frames {
                    let stem = Path::new(&frame.file_path)
                        .file_stem()
                        .and_then(|stem| stem.to_str());
                    let Some(stem) = stem else {
                        eprintln!(
                            "Warning: malformed file_path in {collection}/{model}: {}",
                            frame.file_path
                        );
                        continue;
                    };
                    transforms.insert(
                        format!("{collection}/{model}/{stem}.png"),
                        frame.transform_matrix,
                    );
                }
            }
        }
        Ok(transforms)
    }

    /// Enumerates convertible view files: everything that is not metadata,
    /// a depth map, or a normal map, and has a camera record.
    fn collect_tasks(
        &self,
        transforms: &HashMap<String, [[f64; 4]; 4]>,
    ) -> Result<Vec<ViewTask>, Box<dyn std::error::Error>> {
        // One class id per collection directory, in sorted order.
        let labels: HashMap<String, u32> = sorted_subdirectories(&self.src_root)?
            .iter()
            .filter_map(|dir| dir_name(dir))
            .enumerate()
            .map(|(index, name)| (name.to_string(), index as u32))
            .collect();

        let mut tasks = Vec::new();
        for entry in WalkDir::new(&self.src_root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if path.extension().and_then(|ext| ext.to_str()) == Some("json")
                || name.contains(DEPTH_MARKER)
                || name.contains(NORMAL_MARKER)
            {
                continue;
            }

            let relative = path.strip_prefix(&self.src_root)?;
            let nested_key = path_key(relative);
            let Some(flattened) = flatten_view_path(relative) else {
                eprintln!("Warning: skipping {nested_key}: not a collection/model/view layout");
                continue;
            };
            let Some(transform) = transforms.get(&nested_key) else {
                eprintln!("Warning: skipping {nested_key}: no camera record");
                continue;
            };
            let Some(&label) = relative
                .components()
                .next()
                .and_then(|c| c.as_os_str().to_str())
                .and_then(|collection| labels.get(collection))
            else {
                continue;
            };

            tasks.push(ViewTask {
                source: path.to_path_buf(),
                output_key: path_key(&flattened),
                transform: *transform,
                label,
            });
        }
        Ok(tasks)
    }

    /// Fans the per-view work out over a bounded pool. Workers own their
    /// task and report one manifest entry each; results are merged by the
    /// calling thread after the pool joins.
    fn convert_views(
        &self,
        tasks: &[ViewTask],
    ) -> Result<Vec<ViewEntry>, Box<dyn std::error::Error>> {
        // Collection directories exist up front so workers never race on
        // directory creation.
        for collection_dir in sorted_subdirectories(&self.src_root)? {
            if let Some(name) = dir_name(&collection_dir) {
                fs::create_dir_all(self.dst_root.join(name))?;
            }
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()?;

        let pb = ProgressBar::new(tasks.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40.green/blue}] {pos}/{len} views ({percent}%) {msg}")
                .unwrap()
                .progress_chars("▉▊▋▌▍▎▏ "),
        );
        pb.set_message("Converting views");

        let results: Vec<Option<ViewEntry>> = pool.install(|| {
            tasks
                .par_iter()
                .map(|task| {
                    let entry = self.convert_view(task);
                    pb.inc(1);
                    match entry {
                        Ok(entry) => Some(entry),
                        Err(err) => {
                            eprintln!("Warning: skipping {}: {}", task.output_key, err);
                            None
                        }
                    }
                })
                .collect()
        });

        pb.finish_with_message("Views converted");
        Ok(results.into_iter().flatten().collect())
    }

    /// Extracts camera angles, then resizes and writes one view. Angle
    /// extraction runs first so a corrupt pose never leaves an image on
    /// disk without a manifest entry.
    fn convert_view(&self, task: &ViewTask) -> Result<ViewEntry, Box<dyn std::error::Error>> {
        let angles = camera::euler_angles(&task.transform)?;
        let image = image::open(&task.source)?;
        let resized = image.resize_exact(self.resolution, self.resolution, FilterType::Lanczos3);
        resized.save(self.dst_root.join(&task.output_key))?;

        Ok(ViewEntry {
            path: task.output_key.clone(),
            angles,
            label: task.label,
            camera_distance: camera::position(&task.transform).length(),
        })
    }

    /// Dataset-level angle checks mirroring the capture conventions.
    fn validate_angles(&self, entries: &[ViewEntry]) -> Result<(), Box<dyn std::error::Error>> {
        let count = entries.len() as f64;

        if !self.keep_roll {
            let mean_abs_roll =
                entries.iter().map(|e| e.angles.roll.abs()).sum::<f64>() / count;
            if mean_abs_roll >= ROLL_TOLERANCE {
                return Err(format!(
                    "Dataset contains roll angles (mean |roll| {mean_abs_roll:.6}); \
                     pass --keep-roll to keep them"
                )
                .into());
            }
        }

        for entry in entries {
            let yaw = entry.angles.yaw;
            let pitch = entry.angles.pitch;
            if !(-PI..=PI).contains(&yaw) {
                return Err(format!("Broken yaw angle {yaw:.6} for {}", entry.path).into());
            }
            if !(0.0..=PI).contains(&pitch) {
                return Err(format!("Broken pitch angle {pitch:.6} for {}", entry.path).into());
            }
        }

        let yaw_spread = entries
            .iter()
            .map(|e| e.angles.yaw.powi(2))
            .sum::<f64>()
            .sqrt();
        let pitch_spread = entries
            .iter()
            .map(|e| e.angles.pitch.powi(2))
            .sum::<f64>()
            .sqrt();
        if yaw_spread <= MIN_ANGLE_SPREAD {
            return Err("Broken yaw angles (all zeros)".into());
        }
        if pitch_spread <= MIN_ANGLE_SPREAD {
            return Err("Broken pitch angles (all zeros)".into());
        }

        Ok(())
    }
}

/// Mean/std of camera distances; orbit captures cluster at the render radius.
fn report_camera_distances(entries: &[ViewEntry]) {
    let count = entries.len() as f64;
    let mean = entries.iter().map(|e| e.camera_distance).sum::<f64>() / count;
    let variance = entries
        .iter()
        .map(|e| (e.camera_distance - mean).powi(2))
        .sum::<f64>()
        / count;
    println!("Camera distance mean/std: {mean:.4} / {:.4}", variance.sqrt());
}

fn dir_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}
