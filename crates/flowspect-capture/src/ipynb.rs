//! Jupyter notebook (.ipynb) output.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::document::NotebookDocument;
use crate::error::{CaptureError, CaptureResult};

/// A Jupyter notebook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JupyterNotebook {
    pub metadata: JupyterMetadata,

    /// Format version (always 4)
    pub nbformat: u32,

    pub nbformat_minor: u32,

    pub cells: Vec<JupyterCell>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JupyterMetadata {
    pub kernelspec: KernelSpec,
    pub language_info: LanguageInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelSpec {
    pub display_name: String,
    pub language: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageInfo {
    pub file_extension: String,
    pub mimetype: String,
    pub name: String,
}

/// A Jupyter cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JupyterCell {
    /// `markdown` or `code`
    pub cell_type: String,

    pub metadata: serde_json::Value,

    /// Cell source (lines, each but the last ending with a newline)
    pub source: Vec<String>,

    /// Outputs (code cells only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<serde_json::Value>>,

    /// Execution count (code cells only, never executed here)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_count: Option<Option<u32>>,
}

impl JupyterCell {
    pub fn markdown(text: &str) -> Self {
        Self {
            cell_type: "markdown".to_string(),
            metadata: serde_json::json!({}),
            source: source_lines(text),
            outputs: None,
            execution_count: None,
        }
    }

    pub fn code(text: &str) -> Self {
        Self {
            cell_type: "code".to_string(),
            metadata: serde_json::json!({}),
            source: source_lines(text),
            outputs: Some(Vec::new()),
            execution_count: Some(None),
        }
    }
}

/// Split text into notebook source lines.
fn source_lines(text: &str) -> Vec<String> {
    let text = text.trim_end_matches('\n');
    let mut lines: Vec<String> = text.split('\n').map(|l| format!("{l}\n")).collect();
    if let Some(last) = lines.last_mut() {
        last.pop();
    }
    lines
}

impl JupyterNotebook {
    pub fn new() -> Self {
        Self {
            metadata: JupyterMetadata::default(),
            nbformat: 4,
            nbformat_minor: 5,
            cells: Vec::new(),
        }
    }

    /// Cells of a captured run.
    pub fn from_document(document: &NotebookDocument) -> Self {
        let mut notebook = Self::new();
        notebook.cells.push(JupyterCell::markdown(&format!(
            "# {}\n\n{}\n\n## Imports and parameters",
            document.title, document.description
        )));
        notebook.cells.push(JupyterCell::code(&document.import_code()));
        notebook.cells.push(JupyterCell::code(&document.param_code()));
        notebook.cells.push(JupyterCell::markdown("## Body of the process"));
        for section in &document.sections {
            let mut code = format!("### {}\n", section.title);
            code.push_str(&section.code.join("\n"));
            notebook.cells.push(JupyterCell::code(&code));
        }
        notebook
    }

    pub fn to_json(&self) -> CaptureResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the notebook to a file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> CaptureResult<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?).map_err(|e| CaptureError::WriteError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

impl Default for JupyterNotebook {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for JupyterMetadata {
    fn default() -> Self {
        Self {
            kernelspec: KernelSpec {
                display_name: "Python 3".to_string(),
                language: "python".to_string(),
                name: "python3".to_string(),
            },
            language_info: LanguageInfo {
                file_extension: ".py".to_string(),
                mimetype: "text/x-python".to_string(),
                name: "python".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Section;

    fn document() -> NotebookDocument {
        NotebookDocument {
            title: "Counts".to_string(),
            description: "Count things.".to_string(),
            imports: vec!["import os".to_string()],
            params: vec!["n = 2".to_string()],
            sections: vec![Section {
                title: "Count".to_string(),
                code: vec!["total = n".to_string(), "total".to_string()],
            }],
        }
    }

    #[test]
    fn test_source_lines() {
        assert_eq!(source_lines("a\nb\n"), vec!["a\n", "b"]);
        assert_eq!(source_lines("single"), vec!["single"]);
    }

    #[test]
    fn test_from_document() {
        let notebook = JupyterNotebook::from_document(&document());
        assert_eq!(notebook.cells.len(), 5);
        assert_eq!(notebook.cells[0].cell_type, "markdown");
        assert_eq!(notebook.cells[0].source[0], "# Counts\n");
        assert_eq!(notebook.cells[2].source, vec!["n = 2"]);
        assert_eq!(notebook.cells[4].source, vec!["### Count\n", "total = n\n", "total"]);
    }

    #[test]
    fn test_serialization() {
        let json = JupyterNotebook::from_document(&document()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["nbformat"], 4);
        assert_eq!(value["metadata"]["kernelspec"]["name"], "python3");
        assert_eq!(value["cells"][1]["execution_count"], serde_json::Value::Null);
        assert!(value["cells"][0].get("outputs").is_none());
    }
}
