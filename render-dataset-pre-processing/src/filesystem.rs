/// Directory enumeration and tree copying helpers.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Sorted sub-directories of a directory.
pub fn sorted_subdirectories(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Recursively copy a directory tree, creating `dst`.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Flatten `<collection>/<model>/<file>` into `<collection>/<model>_<file>`.
/// Returns `None` for paths that are not exactly three components deep.
pub fn flatten_view_path(relative: &Path) -> Option<PathBuf> {
    let components: Vec<&str> = relative
        .components()
        .map(|component| component.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;

    match components.as_slice() {
        [collection, model, file] => {
            Some(PathBuf::from(collection).join(format!("{model}_{file}")))
        }
        _ => None,
    }
}

/// Forward-slash rendition of a relative path, as used for manifest keys
/// and archive entry names.
pub fn path_key(relative: &Path) -> String {
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
