/// Uncompressed archive packing for packaged datasets.
use crate::filesystem::path_key;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Pack a dataset directory into a sibling `<dir>.zip` and remove the loose
/// tree. Entries are prefixed with the directory name and stored without
/// compression, matching what the training loader mounts.
pub fn pack_directory(dir: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let dir_name = dir
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| format!("Cannot derive an archive name from {}", dir.display()))?
        .to_string();
    let archive_path = dir.with_extension("zip");

    let mut writer = ZipWriter::new(File::create(&archive_path)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(dir)?;
        writer.start_file(format!("{dir_name}/{}", path_key(relative)), options)?;
        io::copy(&mut File::open(entry.path())?, &mut writer)?;
    }

    writer.finish()?;
    fs::remove_dir_all(dir)?;
    Ok(archive_path)
}
