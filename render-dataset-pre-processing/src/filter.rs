/// Occupancy-based model filtering over a raw render dump.
use crate::exclusion::load_exclusion_list;
use crate::filesystem::{copy_dir_recursive, sorted_subdirectories};
use crate::metadata::{load_collection_metadata, retain_models, save_collection_metadata};
use crate::occupancy::{self, ModelOccupancy};
use constants::{METADATA_FILE_NAME, NORMAL_MARKER, VIEWS_PER_MODEL};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// One model directory inside the raw render dump.
struct ModelEntry {
    collection: String,
    model: String,
    path: PathBuf,
}

/// Occupancy filter copying surviving models into a fresh tree.
/// The source tree is never mutated; survival is all-or-nothing per model.
pub struct ModelFilter {
    src_root: PathBuf,
    dst_root: PathBuf,
    occupancy_thresh: f64,
    excluded: HashSet<String>,
    jobs: usize,
}

impl ModelFilter {
    /// Validates configuration up front; violations are fatal.
    pub fn new(
        src_root: &Path,
        dst_root: &Path,
        occupancy_thresh: f64,
        exclusion_list: Option<&Path>,
        jobs: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        if !src_root.is_dir() {
            return Err(format!("Source directory does not exist: {}", src_root.display()).into());
        }
        if !occupancy_thresh.is_finite() || occupancy_thresh <= 0.0 || occupancy_thresh >= 1.0 {
            return Err(
                format!("Occupancy threshold must lie in (0, 1), got {occupancy_thresh}").into(),
            );
        }
        if jobs == 0 {
            return Err("Job count must be at least 1".into());
        }

        let excluded = match exclusion_list {
            Some(path) => load_exclusion_list(path)?,
            None => HashSet::new(),
        };

        fs::create_dir_all(dst_root)?;

        Ok(Self {
            src_root: src_root.to_path_buf(),
            dst_root: dst_root.to_path_buf(),
            occupancy_thresh,
            excluded,
            jobs,
        })
    }

    /// Executes the occupancy pass, selection, and survivor copy.
    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let models = self.discover_models()?;
        if models.is_empty() {
            return Err(format!("No model directories under {}", self.src_root.display()).into());
        }
        let collections: HashSet<&str> = models.iter().map(|m| m.collection.as_str()).collect();
        println!(
            "Found {} models across {} collections",
            models.len(),
            collections.len()
        );

        let occupancies = self.measure_occupancies(&models)?;

        // Occupancy stage. Models with no readable views are dropped here.
        let mut kept: Vec<usize> = Vec::new();
        for (index, occupancy) in occupancies.iter().enumerate() {
            let entry = &models[index];
            if occupancy.views + occupancy.failed != VIEWS_PER_MODEL {
                eprintln!(
                    "Warning: {}/{} has {} views instead of {VIEWS_PER_MODEL}",
                    entry.collection,
                    entry.model,
                    occupancy.views + occupancy.failed
                );
            }
            if occupancy.views == 0 {
                eprintln!(
                    "Warning: skipping {}/{}: no readable views",
                    entry.collection, entry.model
                );
            } else if occupancy.mean >= self.occupancy_thresh {
                kept.push(index);
            }
        }
        let dropped = models.len() - kept.len();
        println!(
            "Dropping {} of {} models below occupancy {:.3} ({:.2}% of all models). {} remain.",
            dropped,
            models.len(),
            self.occupancy_thresh,
            dropped as f64 / models.len() as f64 * 100.0,
            kept.len()
        );

        // Manual exclusion stage.
        let before = kept.len();
        kept.retain(|&index| !self.excluded.contains(models[index].model.as_str()));
        println!(
            "Dropping {} more models from the exclusion list. {} remain.",
            before - kept.len(),
            kept.len()
        );

        let copied = self.copy_survivors(&models, &kept)?;
        println!(
            "Filtering complete: {} models copied to {}",
            copied,
            self.dst_root.display()
        );
        Ok(())
    }

    /// Sorted `collection/model` directories under the source root.
    fn discover_models(&self) -> Result<Vec<ModelEntry>, Box<dyn std::error::Error>> {
        let mut models = Vec::new();
        for collection_dir in sorted_subdirectories(&self.src_root)? {
            let Some(collection) = dir_name(&collection_dir) else {
                continue;
            };
            for model_dir in sorted_subdirectories(&collection_dir)? {
                let Some(model) = dir_name(&model_dir) else {
                    continue;
                };
                models.push(ModelEntry {
                    collection: collection.to_string(),
                    model: model.to_string(),
                    path: model_dir.clone(),
                });
            }
        }
        Ok(models)
    }

    /// Per-model occupancy measurement over a worker pool sized by `--jobs`.
    fn measure_occupancies(
        &self,
        models: &[ModelEntry],
    ) -> Result<Vec<ModelOccupancy>, Box<dyn std::error::Error>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()?;

        let pb = ProgressBar::new(models.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40.green/blue}] {pos}/{len} models ({percent}%) {msg}")
                .unwrap()
                .progress_chars("▉▊▋▌▍▎▏ "),
        );
        pb.set_message("Measuring occupancy");

        let occupancies = pool.install(|| {
            models
                .par_iter()
                .map(|entry| {
                    let occupancy = occupancy::model_occupancy(&view_images(&entry.path));
                    pb.inc(1);
                    occupancy
                })
                .collect()
        });

        pb.finish_with_message("Occupancy measured");
        Ok(occupancies)
    }

    /// Copies surviving models per collection and writes metadata filtered
    /// to the models whose copy succeeded. Returns the copied count.
    fn copy_survivors(
        &self,
        models: &[ModelEntry],
        kept: &[usize],
    ) -> Result<usize, Box<dyn std::error::Error>> {
        let mut per_collection: BTreeMap<&str, Vec<&ModelEntry>> = BTreeMap::new();
        for &index in kept {
            let entry = &models[index];
            per_collection
                .entry(entry.collection.as_str())
                .or_default()
                .push(entry);
        }

        let pb = ProgressBar::new(kept.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40.cyan/blue}] {pos}/{len} models ({percent}%) {msg}")
                .unwrap()
                .progress_chars("▉▊▋▌▍▎▏ "),
        );
        pb.set_message("Copying survivors");

        let mut copied_total = 0usize;
        for (collection, entries) in &per_collection {
            let metadata_path = self.src_root.join(collection).join(METADATA_FILE_NAME);
            let metadata = match load_collection_metadata(&metadata_path) {
                Ok(metadata) => metadata,
                Err(err) => {
                    eprintln!("Warning: skipping collection {collection}: {err}");
                    pb.inc(entries.len() as u64);
                    continue;
                }
            };

            let mut copied: HashSet<String> = HashSet::new();
            for entry in entries {
                let target = self.dst_root.join(collection).join(&entry.model);
                match copy_dir_recursive(&entry.path, &target) {
                    Ok(()) => {
                        copied.insert(entry.model.clone());
                    }
                    Err(err) => {
                        eprintln!("Warning: failed to copy {collection}/{}: {err}", entry.model);
                        let _ = fs::remove_dir_all(&target);
                    }
                }
                pb.inc(1);
            }

            if copied.is_empty() {
                continue;
            }
            copied_total += copied.len();
            let filtered = retain_models(&metadata, &copied);
            save_collection_metadata(
                &self.dst_root.join(collection).join(METADATA_FILE_NAME),
                &filtered,
            )?;
        }

        pb.finish_with_message("Survivors copied");
        Ok(copied_total)
    }
}

/// Colour views of a model: every `.png` that is not a normal map.
fn view_images(model_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(model_dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension().and_then(|ext| ext.to_str()) == Some("png")
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| !name.contains(NORMAL_MARKER))
        })
        .collect();
    paths.sort();
    paths
}

fn dir_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{look_at_origin, spherical_position};
    use crate::metadata::{CollectionMetadata, FrameRecord};
    use image::{Rgba, RgbaImage};
    use walkdir::WalkDir;

    /// 16x16 RGBA view with the requested number of opaque pixels.
    fn write_view(model_dir: &Path, index: usize, opaque_pixels: u32) {
        let mut image = RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 0]));
        let mut remaining = opaque_pixels;
        'fill: for y in 0..16 {
            for x in 0..16 {
                if remaining == 0 {
                    break 'fill;
                }
                image.put_pixel(x, y, Rgba([180, 200, 90, 255]));
                remaining -= 1;
            }
        }
        image
            .save(model_dir.join(format!("{index:06}.png")))
            .unwrap();
    }

    fn seed_model(root: &Path, collection: &str, model: &str, opaque_pixels: u32, views: usize) {
        let model_dir = root.join(collection).join(model);
        fs::create_dir_all(&model_dir).unwrap();
        for index in 0..views {
            write_view(&model_dir, index, opaque_pixels);
        }
    }

    fn seed_metadata(root: &Path, collection: &str, models: &[&str], views: usize) {
        let mut metadata = CollectionMetadata::new();
        for model in models {
            let frames = (0..views)
                .map(|index| FrameRecord {
                    file_path: format!("{collection}/{model}/{index:06}"),
                    transform_matrix: look_at_origin(spherical_position(
                        0.4,
                        1.2,
                        constants::CAMERA_RADIUS,
                    )),
                    camera_angles: [0.4, 1.2, 0.0],
                    camera_radius: constants::CAMERA_RADIUS,
                    fov: constants::CAMERA_FOV,
                })
                .collect();
            metadata.insert(model.to_string(), frames);
        }
        save_collection_metadata(&root.join(collection).join(METADATA_FILE_NAME), &metadata)
            .unwrap();
    }

    /// Sorted file paths relative to `root`.
    fn file_set(root: &Path) -> Vec<String> {
        let mut files: Vec<String> = WalkDir::new(root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| {
                crate::filesystem::path_key(entry.path().strip_prefix(root).unwrap())
            })
            .collect();
        files.sort();
        files
    }

    fn run_filter(src: &Path, dst: &Path, threshold: f64, exclusion: Option<&Path>) {
        ModelFilter::new(src, dst, threshold, exclusion, 2)
            .unwrap()
            .run()
            .unwrap();
    }

    #[test]
    fn threshold_keeps_dense_and_drops_sparse_models() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("raw");
        // 26/256 opaque pixels: occupancy ~0.10. 2/256: occupancy ~0.008.
        seed_model(&src, "apple", "model_dense", 26, 2);
        seed_model(&src, "apple", "model_sparse", 2, 2);
        seed_metadata(&src, "apple", &["model_dense", "model_sparse"], 2);

        let dst = dir.path().join("filtered");
        run_filter(&src, &dst, 0.05, None);

        let files = file_set(&dst);
        assert_eq!(
            files,
            [
                "apple/metadata.json",
                "apple/model_dense/000000.png",
                "apple/model_dense/000001.png",
            ]
        );

        let metadata =
            load_collection_metadata(&dst.join("apple").join(METADATA_FILE_NAME)).unwrap();
        assert!(metadata.contains_key("model_dense"));
        assert!(!metadata.contains_key("model_sparse"));
    }

    #[test]
    fn kept_models_preserve_their_whole_file_set() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("raw");
        seed_model(&src, "apple", "model_dense", 200, 2);
        seed_metadata(&src, "apple", &["model_dense"], 2);
        // Depth and normal payload rides along with the model.
        let model_dir = src.join("apple/model_dense");
        fs::write(model_dir.join("000000_depth_0001.exr"), b"depth").unwrap();
        let normal = RgbaImage::from_pixel(16, 16, Rgba([128, 128, 255, 255]));
        normal
            .save(model_dir.join("000000_normal_0001.png"))
            .unwrap();

        let dst = dir.path().join("filtered");
        run_filter(&src, &dst, 0.05, None);

        let files = file_set(&dst);
        assert!(files.contains(&"apple/model_dense/000000_depth_0001.exr".to_string()));
        assert!(files.contains(&"apple/model_dense/000000_normal_0001.png".to_string()));
        assert!(files.contains(&"apple/model_dense/000000.png".to_string()));
    }

    #[test]
    fn filtering_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("raw");
        seed_model(&src, "apple", "model_dense", 200, 2);
        seed_model(&src, "apple", "model_sparse", 1, 2);
        seed_metadata(&src, "apple", &["model_dense", "model_sparse"], 2);

        let first = dir.path().join("first");
        run_filter(&src, &first, 0.05, None);
        let second = dir.path().join("second");
        run_filter(&first, &second, 0.05, None);

        assert_eq!(file_set(&first), file_set(&second));
    }

    #[test]
    fn exclusion_list_drops_models_that_pass_the_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("raw");
        seed_model(&src, "apple", "model_dense", 200, 2);
        seed_metadata(&src, "apple", &["model_dense"], 2);
        let list = dir.path().join("low-quality-models.txt");
        fs::write(&list, "# rejected after inspection\nmodel_dense\n").unwrap();

        let dst = dir.path().join("filtered");
        run_filter(&src, &dst, 0.05, Some(&list));

        assert!(file_set(&dst).is_empty());
        assert!(!dst.join("apple").exists());
    }

    #[test]
    fn unreadable_model_is_skipped_without_failing_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("raw");
        seed_model(&src, "apple", "model_dense", 200, 2);
        let broken_dir = src.join("apple/model_broken");
        fs::create_dir_all(&broken_dir).unwrap();
        fs::write(broken_dir.join("000000.png"), b"not a png").unwrap();
        seed_metadata(&src, "apple", &["model_dense", "model_broken"], 2);

        let dst = dir.path().join("filtered");
        run_filter(&src, &dst, 0.05, None);

        let files = file_set(&dst);
        assert!(files.contains(&"apple/model_dense/000000.png".to_string()));
        assert!(!files.iter().any(|f| f.contains("model_broken")));
    }

    #[test]
    fn invalid_threshold_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("raw");
        seed_model(&src, "apple", "model_dense", 200, 1);

        let dst = dir.path().join("filtered");
        assert!(ModelFilter::new(&src, &dst, 0.0, None, 2).is_err());
        assert!(ModelFilter::new(&src, &dst, 1.5, None, 2).is_err());
        assert!(ModelFilter::new(&src, &dst, f64::NAN, None, 2).is_err());
    }

    #[test]
    fn missing_source_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(
            ModelFilter::new(
                &dir.path().join("missing"),
                &dir.path().join("filtered"),
                0.05,
                None,
                2,
            )
            .is_err()
        );
    }
}
