//! File-system helpers shared by the stage drivers.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::prelude::*;

/// Files directly inside `dir` whose name ends with `suffix`, sorted by path.
pub fn list_files(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    collect_files(WalkDir::new(dir).min_depth(1).max_depth(1), suffix)
}

/// Files anywhere below `dir` whose name ends with `suffix`, sorted by path.
pub fn find_files(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    collect_files(WalkDir::new(dir).min_depth(1), suffix)
}

fn collect_files(walker: WalkDir, suffix: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.wrap_err("Failed to walk input directory")?;
        if entry.file_type().is_file() && entry.file_name().to_string_lossy().ends_with(suffix) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Like [`list_files`], but an empty result is an error.
pub fn require_files(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let files = list_files(dir, suffix)?;
    if files.is_empty() {
        return Err(Error::NoInputs(f!("no *{suffix} files in {}", dir.display())).into());
    }
    Ok(files)
}

/// Read a file as UTF-8, dropping invalid sequences.
pub fn read_text_lossy(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).wrap_err_with(|| f!("Failed to read {}", path.display()))?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).replace('\u{FFFD}', ""),
    })
}

/// Write `contents`, creating parent directories as needed.
pub fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .wrap_err_with(|| f!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, contents).wrap_err_with(|| f!("Failed to write {}", path.display()))
}

/// File name of `path` for display.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
