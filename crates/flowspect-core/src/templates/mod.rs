//! Text templates for every generated artifact.
//!
//! Each artifact (process script, process block, `main.nf`,
//! `nextflow.config`) has its own template type; the channel compiler and
//! the assembler only fill in their fields.

mod config;
mod nextflow;
mod python;

pub use config::ConfigTemplate;
pub use nextflow::{MainTemplate, ProcessTemplate};
pub use python::ScriptTemplate;

/// A generated text artifact.
pub trait Template {
    /// Render the artifact.
    fn render(&self) -> String;
}
