//! Save command implementation.
//!
//! Generated scripts pipe their encoded results here.

use std::io::Read;

use anyhow::Context;
use flowspect_core::{Peek, decode_payload, save_results};
use tracing::debug;

pub fn execute(peek: Option<Peek>) -> anyhow::Result<()> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read results from stdin")?;

    let entries = decode_payload(&input)?;
    let mut stdout = std::io::stdout().lock();
    let report = save_results(&entries, peek, &mut stdout)?;
    debug!(
        "Saved {} results ({} files, {} skipped)",
        entries.len(),
        report.written.len(),
        report.skipped.len()
    );
    Ok(())
}
