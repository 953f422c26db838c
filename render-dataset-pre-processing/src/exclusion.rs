/// Manual exclusion list of models rejected during visual inspection.
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Load an exclusion list: one model name per line, `#` starts a comment.
pub fn load_exclusion_list(path: &Path) -> Result<HashSet<String>, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}
