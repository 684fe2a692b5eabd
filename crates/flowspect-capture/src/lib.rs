//! Notebook capture renderer for flowspect processes.
//!
//! Turns one run of a generated process script into a narrative document:
//! title, docstring, the imports and the concrete parameter values, then the
//! function body cut into its `### ` sections.
//!
//! # Architecture
//!
//! ```text
//! bin/<Process>.py + argv ─────► capture() ─────► NotebookDocument ─┬──► markdown
//!                                                                   └──► JupyterNotebook (.ipynb)
//! ```

mod document;
mod error;
mod ipynb;

pub use document::{
    CaptureRequest, NotebookDocument, Section, body_sections, capture, import_lines,
    locate_script,
};
pub use error::{CaptureError, CaptureResult};
pub use ipynb::{JupyterCell, JupyterNotebook};

use std::io::Write;
use std::path::Path;

/// Write a captured document.
///
/// `.ipynb` targets get a Jupyter notebook, other targets markdown. Without
/// a target the markdown goes to `out`.
pub fn write_document(
    document: &NotebookDocument,
    target: Option<&Path>,
    out: &mut impl Write,
) -> CaptureResult<()> {
    let Some(target) = target else {
        out.write_all(document.to_markdown().as_bytes())?;
        return Ok(());
    };

    let is_notebook = target
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ipynb"));
    if is_notebook {
        JupyterNotebook::from_document(document).write_to_file(target)
    } else {
        std::fs::write(target, document.to_markdown()).map_err(|e| CaptureError::WriteError {
            path: target.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Capture a run and write it.
pub fn capture_into(
    request: &CaptureRequest,
    target: Option<&Path>,
    out: &mut impl Write,
) -> CaptureResult<NotebookDocument> {
    let document = capture(request)?;
    write_document(&document, target, out)?;
    Ok(document)
}
