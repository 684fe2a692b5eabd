//! Process channel compiler.
//!
//! This module provides:
//! - Channel specifications mapping Nextflow variables to Python parameters
//! - Resolution of `input:`/`output:` declarations for a process
//! - The shell command connecting channel variables to script flags
//! - Fallback of unclaimed parameters to pipeline parameters

mod compiler;
mod spec;

pub use compiler::{CaptureCommand, CompiledChannels, CompilerInput, compile_channels};
pub use spec::{ChannelName, ChannelSpec, Names, ResolvedChannel, shell_reference};
