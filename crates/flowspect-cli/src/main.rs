//! flowspect CLI - Python functions in, Nextflow pipelines out.

mod build;
mod capture;
mod clean;
mod colors;
mod inspect;
mod run;
mod save;

use clap::{Parser, Subcommand};
use flowspect_core::Peek;

#[derive(Parser)]
#[command(name = "flowspect")]
#[command(about = "Generate Nextflow pipelines from annotated Python functions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a pipeline directory from a manifest
    Build {
        /// Path to the pipeline manifest (.toml)
        manifest: String,

        /// Pipeline directory (default: from the manifest)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Run a generated pipeline with nextflow
    Run {
        /// Pipeline directory
        location: String,

        /// Nextflow profile
        #[arg(long)]
        profile: Option<String>,

        /// Resume a previous run
        #[arg(long)]
        resume: bool,

        /// File of KEY=VALUE lines exported to the run (default: ~/.sge_env)
        #[arg(long)]
        env_file: Option<String>,

        /// Keep nextflow's interactive log
        #[arg(long)]
        ansi_log: bool,
    },

    /// Render a process run as a notebook
    Capture {
        /// Notebook title
        #[arg(long, default_value = "")]
        notebooktitle: String,

        /// Output file (.md or .ipynb); stdout when omitted
        #[arg(long)]
        capturednotebook: Option<String>,

        /// Function the script exposes
        #[arg(long, default_value = "process")]
        function: String,

        /// Process script, as a path or a name on PATH
        script: String,

        /// Command line the script ran with
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Save encoded results read from stdin
    Save {
        /// Truncate output: N rows or lines, optionally C characters
        #[arg(long, value_name = "N[,C]")]
        peek: Option<Peek>,
    },

    /// Show the command line a Python function is exposed with
    Inspect {
        /// Python source file
        script: String,

        /// Function to expose
        #[arg(long, default_value = "process")]
        function: String,

        /// Also print the docs of the function and its helpers
        #[arg(long)]
        doc: bool,
    },

    /// Remove run leftovers
    Clean {
        /// Directory to clean
        #[arg(default_value = ".")]
        location: String,

        /// Leave the pipeline subdirectory alone
        #[arg(long)]
        no_pipeline: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Helper to format library errors with recovery hints
    let format_error = |err: anyhow::Error| -> anyhow::Error {
        if let Some(core_err) = err.downcast_ref::<flowspect_core::Error>() {
            anyhow::anyhow!("{}", core_err.with_hint())
        } else if let Some(flowspect_capture::CaptureError::Core(core_err)) =
            err.downcast_ref::<flowspect_capture::CaptureError>()
        {
            anyhow::anyhow!("{}", core_err.with_hint())
        } else {
            err
        }
    };

    match cli.command {
        Commands::Build { manifest, output } => {
            build::execute(&manifest, output.as_deref()).map_err(format_error)?;
        }

        Commands::Run {
            location,
            profile,
            resume,
            env_file,
            ansi_log,
        } => {
            let options = run::RunOptions {
                profile,
                resume,
                env_file,
                ansi_log,
            };
            run::execute(&location, options).map_err(format_error)?;
        }

        Commands::Capture {
            notebooktitle,
            capturednotebook,
            function,
            script,
            args,
        } => {
            capture::execute(
                &script,
                &function,
                args,
                notebooktitle,
                capturednotebook.as_deref(),
            )
            .map_err(format_error)?;
        }

        Commands::Save { peek } => save::execute(peek).map_err(format_error)?,

        Commands::Inspect {
            script,
            function,
            doc,
        } => inspect::execute(&script, &function, doc).map_err(format_error)?,

        Commands::Clean {
            location,
            no_pipeline,
        } => clean::execute(&location, !no_pipeline).map_err(format_error)?,
    }

    Ok(())
}
