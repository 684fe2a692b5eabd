//! Removing run leftovers.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

/// Suffixes (last four characters of a name) of files left by runs and
/// notebook conversion.
const LEFTOVER_SUFFIXES: [&str; 9] = [
    ".log", ".aux", ".toc", ".bbl", ".bcf", ".blg", ".tex", ".out", "pynb",
];

/// Directory names left by runs.
const LEFTOVER_DIRS: [&str; 2] = ["work", "notebook_files"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupOptions {
    /// Also clean `<location>/pipeline`
    pub pipeline: bool,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self { pipeline: true }
    }
}

/// Whether an entry name is a leftover.
pub fn is_leftover(name: &str) -> bool {
    if name.starts_with('.') || LEFTOVER_DIRS.contains(&name) {
        return true;
    }
    let chars: Vec<char> = name.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    LEFTOVER_SUFFIXES.contains(&tail.as_str())
}

/// Remove leftovers from `location` and, when asked, `location/pipeline`.
///
/// Returns the removed paths.
pub fn cleanup(location: &Path, options: CleanupOptions) -> Result<Vec<PathBuf>> {
    let mut removed = clean_dir(location)?;
    let pipeline = location.join("pipeline");
    if options.pipeline && pipeline.is_dir() {
        removed.extend(clean_dir(&pipeline)?);
    }
    Ok(removed)
}

fn clean_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if !is_leftover(&name.to_string_lossy()) {
            continue;
        }
        let path = entry.path();
        debug!("Removing {}", path.display());
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        removed.push(path);
    }
    removed.sort();
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_leftover() {
        assert!(is_leftover(".nextflow"));
        assert!(is_leftover("work"));
        assert!(is_leftover("notebook_files"));
        assert!(is_leftover("trace.log"));
        assert!(is_leftover("report.ipynb"));
        assert!(!is_leftover("main.nf"));
        assert!(!is_leftover("results.tsv"));
        assert!(!is_leftover("log"));
    }

    #[test]
    fn test_cleanup() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("work/ab/cd")).unwrap();
        fs::create_dir_all(root.join("pipeline/.nextflow")).unwrap();
        fs::write(root.join(".nextflow.log"), "").unwrap();
        fs::write(root.join("keep.tsv"), "").unwrap();
        fs::write(root.join("pipeline/main.nf"), "").unwrap();
        fs::write(root.join("pipeline/run.tex"), "").unwrap();

        let removed = cleanup(root, CleanupOptions { pipeline: false }).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(root.join("pipeline/run.tex").exists());

        let removed = cleanup(root, CleanupOptions::default()).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(root.join("keep.tsv").exists());
        assert!(root.join("pipeline/main.nf").exists());
        assert!(!root.join("pipeline/.nextflow").exists());
    }
}
