//! Capture command implementation.
//!
//! Called by generated pipelines through the `captureIntoNotebook.py` shim,
//! right after the process script itself ran.

use std::path::{Path, PathBuf};

use flowspect_capture::{CaptureRequest, capture_into};

/// Render one process run as a notebook.
pub fn execute(
    script: &str,
    function: &str,
    argv: Vec<String>,
    title: String,
    target: Option<&str>,
) -> anyhow::Result<()> {
    let request = CaptureRequest {
        script: PathBuf::from(script),
        function: function.to_string(),
        argv,
        title,
    };
    let mut stdout = std::io::stdout().lock();
    capture_into(&request, target.map(Path::new), &mut stdout)?;
    Ok(())
}
