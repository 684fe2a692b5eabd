//! Run command implementation.

use std::path::{Path, PathBuf};

use flowspect_core::PipelineRunner;

use crate::colors;

/// Options forwarded to the runner.
#[derive(Debug, Default)]
pub struct RunOptions {
    pub profile: Option<String>,
    pub resume: bool,
    pub env_file: Option<String>,
    pub ansi_log: bool,
}

/// Run a generated pipeline, echoing its output.
pub fn execute(location: &str, options: RunOptions) -> anyhow::Result<()> {
    let path = Path::new(location);
    if !path.join("main.nf").is_file() {
        anyhow::bail!("No main.nf in {}; run `flowspect build` first", location);
    }

    println!(
        "\n{}flowspect{} - Running {}{}{}\n",
        colors::BOLD,
        colors::RESET,
        colors::CYAN,
        path.display(),
        colors::RESET
    );

    let mut runner = PipelineRunner::new(path)
        .with_profile(options.profile)
        .with_resume(options.resume)
        .with_ansi_log(options.ansi_log);
    if let Some(env_file) = options.env_file {
        runner = runner.with_env_file(Some(PathBuf::from(env_file)));
    }

    runner.run(|line| println!("{line}"))?;
    println!("\n{}Done{}", colors::GREEN, colors::RESET);
    Ok(())
}
