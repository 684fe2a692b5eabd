//! Container image resolution.
//!
//! A process may name a container as a local image file or as a symbolic
//! reference (`docker://org/image:tag`). Symbolic references are built once
//! into a local image inside the pipeline directory and remembered in a
//! [`ContainerCache`] shared by all processes of one pipeline.

use std::path::{Path, PathBuf};
use std::process::Command;

use rustc_hash::FxHashMap;
use tracing::info;

use crate::error::{Error, Result};

/// Builds a local image file from a container reference.
pub trait ImageBuilder {
    /// Materialize `reference` at `target`.
    fn build(&mut self, target: &Path, reference: &str) -> Result<()>;
}

/// Builds images with `singularity build <target> <reference>`.
#[derive(Debug, Clone, Default)]
pub struct SingularityBuilder {
    /// Explicit path to the executable; looked up in PATH otherwise
    program: Option<PathBuf>,
}

impl SingularityBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(program: PathBuf) -> Self {
        Self {
            program: Some(program),
        }
    }

    fn find_program(&self, reference: &str) -> Result<PathBuf> {
        if let Some(program) = &self.program {
            return Ok(program.clone());
        }
        which::which("singularity").map_err(|_| Error::Container {
            image: reference.to_string(),
            message: "singularity not found in PATH".to_string(),
        })
    }
}

impl ImageBuilder for SingularityBuilder {
    fn build(&mut self, target: &Path, reference: &str) -> Result<()> {
        let program = self.find_program(reference)?;
        info!("Building container image {} from {}", target.display(), reference);

        let output = Command::new(&program)
            .arg("build")
            .arg(target)
            .arg(reference)
            .output()
            .map_err(|e| Error::Container {
                image: reference.to_string(),
                message: format!("Failed to run {}: {}", program.display(), e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Container {
                image: reference.to_string(),
                message: format!("build failed: {}", stderr.trim()),
            });
        }
        Ok(())
    }
}

/// Container reference to local image path, for one pipeline.
#[derive(Debug, Clone, Default)]
pub struct ContainerCache {
    paths: FxHashMap<String, PathBuf>,
}

impl ContainerCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, reference: &str) -> Option<&Path> {
        self.paths.get(reference).map(PathBuf::as_path)
    }

    pub fn insert(&mut self, reference: impl Into<String>, path: PathBuf) {
        self.paths.insert(reference.into(), path);
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Local file name for a container reference.
///
/// The part after `://` (the whole reference if there is none) with `/` and
/// `:` replaced by `_`, plus `.sif`.
pub fn image_file_name(reference: &str) -> String {
    let name = reference
        .split_once("://")
        .map_or(reference, |(_, rest)| rest);
    format!("{}.sif", name.replace(['/', ':'], "_"))
}

/// Resolve a container reference to the image path used by the pipeline.
///
/// Existing files are used as they are. Other references are built into
/// `pipeline_dir` unless the cache already holds them.
pub fn resolve_container(
    reference: &str,
    pipeline_dir: &Path,
    cache: &mut ContainerCache,
    builder: &mut dyn ImageBuilder,
) -> Result<PathBuf> {
    let as_path = Path::new(reference);
    if as_path.is_file() {
        return Ok(as_path.to_path_buf());
    }
    if let Some(path) = cache.get(reference) {
        return Ok(path.to_path_buf());
    }

    let target = pipeline_dir.join(image_file_name(reference));
    builder.build(&target, reference)?;
    cache.insert(reference, target.clone());
    Ok(target)
}
