//! Pipeline directory management.
//!
//! Every generated pipeline has the same layout:
//!
//! ```text
//! <location>/
//! ├── main.nf
//! ├── nextflow.config
//! ├── *.sif        # Container images built from references
//! ├── bin/         # One executable script per process, plus the capture shim
//! └── packages/    # In-house Python packages the scripts import
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Directory structure of a generated pipeline.
#[derive(Debug, Clone)]
pub struct PipelineDirs {
    /// The pipeline directory itself.
    pub root: PathBuf,

    /// Executable scripts, put on PATH by Nextflow.
    pub bin_dir: PathBuf,

    /// Python packages copied next to the scripts.
    pub packages_dir: PathBuf,
}

impl PipelineDirs {
    /// Create the directory structure under `root`.
    ///
    /// Creates all necessary directories if they don't exist.
    ///
    /// # Errors
    /// Returns an error if directory creation fails.
    pub fn create(root: &Path) -> Result<Self> {
        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()?.join(root)
        };
        let bin_dir = root.join("bin");
        let packages_dir = root.join("packages");

        fs::create_dir_all(&bin_dir)?;
        fs::create_dir_all(&packages_dir)?;

        Ok(Self {
            root,
            bin_dir,
            packages_dir,
        })
    }

    /// Script of a process.
    pub fn script(&self, process: &str) -> PathBuf {
        self.bin_dir.join(format!("{process}.py"))
    }

    pub fn main_nf(&self) -> PathBuf {
        self.root.join("main.nf")
    }

    pub fn config(&self) -> PathBuf {
        self.root.join("nextflow.config")
    }
}

/// Write an executable file (mode `0o775` on unix).
pub fn write_executable(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o775))?;
    }
    Ok(())
}
