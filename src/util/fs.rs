//! Filesystem utilities.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents)
        .with_context(|| format!("failed to write file: {}", path.display()))
}

/// Append to an existing file. Fails if the file does not exist.
pub fn append_string(path: &Path, contents: &str) -> Result<()> {
    let mut file = fs::OpenOptions::new()
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open file for appending: {}", path.display()))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("failed to write file: {}", path.display()))
}

/// Copy a file into `dest_dir`, creating the directory if needed.
///
/// Returns the path of the copy.
pub fn copy_into(src: &Path, dest_dir: &Path, file_name: &str) -> Result<PathBuf> {
    ensure_dir(dest_dir)?;
    let dest = dest_dir.join(file_name);
    fs::copy(src, &dest).with_context(|| {
        format!("failed to copy {} to {}", src.display(), dest.display())
    })?;
    Ok(dest)
}

/// Paths matching a glob pattern, sorted.
pub fn glob_paths(pattern: &Path) -> Result<Vec<PathBuf>> {
    let pattern_str = pattern.to_string_lossy();
    let mut results = Vec::new();

    for entry in glob(&pattern_str)
        .with_context(|| format!("invalid glob pattern: {}", pattern_str))?
    {
        match entry {
            Ok(path) => results.push(path),
            Err(e) => {
                tracing::warn!("glob error: {}", e);
            }
        }
    }

    results.sort();
    Ok(results)
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Display `path` relative to the current directory when possible.
pub fn display_relative(path: &Path) -> String {
    match std::env::current_dir() {
        Ok(cwd) => relative_path(&cwd, path).display().to_string(),
        Err(_) => path.display().to_string(),
    }
}
