//! Build command implementation.
//!
//! Generates a pipeline directory from a TOML manifest.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use flowspect_core::{PipelineAssembler, PipelineManifest};

use crate::colors;

/// Result type for CLI operations.
pub type CliResult = anyhow::Result<()>;

/// Build the pipeline a manifest describes.
pub fn execute(manifest_path: &str, output: Option<&str>) -> CliResult {
    let path = Path::new(manifest_path);
    if !path.exists() {
        anyhow::bail!(
            "Manifest not found: {} (current directory: {})",
            manifest_path,
            std::env::current_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "<unknown>".to_string())
        );
    }

    let start = Instant::now();
    let manifest = PipelineManifest::load(path)?;
    let location = output.map_or_else(|| manifest.location(), PathBuf::from);

    println!(
        "\n{}flowspect{} - Building {}{}{}\n",
        colors::BOLD,
        colors::RESET,
        colors::CYAN,
        manifest.pipeline.name,
        colors::RESET
    );

    let report = PipelineAssembler::new(&location, manifest.settings.clone())
        .with_params(manifest.params())
        .assemble(&manifest.nodes())
        .with_context(|| format!("Failed to build pipeline in {}", location.display()))?;

    for name in &report.processes {
        println!("  {}✓{} {}", colors::GREEN, colors::RESET, name);
    }
    for script in &report.scripts {
        println!("  {}script{} {}", colors::DIM, colors::RESET, script.display());
    }
    for (reference, image) in &report.containers {
        println!(
            "  {}container{} {} → {}",
            colors::DIM,
            colors::RESET,
            reference,
            image.display()
        );
    }
    for warning in &report.warnings {
        println!("  {}warning{} {}", colors::YELLOW, colors::RESET, warning);
    }

    println!(
        "\n{}Built{} {} ({} processes, {} params) in {:.2}s",
        colors::GREEN,
        colors::RESET,
        report.dirs.main_nf().display(),
        report.processes.len(),
        report.params.len(),
        start.elapsed().as_secs_f64()
    );

    Ok(())
}
