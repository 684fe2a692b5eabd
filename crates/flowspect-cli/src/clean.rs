//! Clean command implementation.

use std::path::Path;

use flowspect_core::{CleanupOptions, cleanup};

use crate::colors;

pub fn execute(location: &str, pipeline: bool) -> anyhow::Result<()> {
    let path = Path::new(location);
    if !path.is_dir() {
        anyhow::bail!("Not a directory: {}", location);
    }

    let removed = cleanup(path, CleanupOptions { pipeline })?;
    for entry in &removed {
        println!("  {}removed{} {}", colors::DIM, colors::RESET, entry.display());
    }
    println!("{}Cleaned{} {} entries", colors::GREEN, colors::RESET, removed.len());
    Ok(())
}
