//! Core of flowspect: Python functions in, Nextflow pipelines out.
//!
//! This crate provides:
//! - Python source introspection and docstring parsing
//! - The CLI binder shared by generated scripts and the capture renderer
//! - The channel compiler turning channel specifications into process blocks
//! - Pipeline assembly with container resolution
//! - The result serializer used by generated scripts
//! - Pipeline execution and cleanup

pub mod binder;
pub mod channel;
pub mod cleanup;
pub mod container;
pub mod docstring;
pub mod error;
pub mod manifest;
pub mod output;
pub mod paths;
pub mod pipeline;
pub mod process;
pub mod python;
pub mod runner;
pub mod templates;

pub use binder::{ArgumentOverrides, BoundArguments, CommandBinding, FlagTable, OVERRIDES_VARIABLE};
pub use channel::{ChannelSpec, CompiledChannels, compile_channels};
pub use cleanup::{CleanupOptions, cleanup};
pub use container::{ContainerCache, ImageBuilder, SingularityBuilder, resolve_container};
pub use docstring::ParsedDocstring;
pub use error::{Error, Result};
pub use manifest::PipelineManifest;
pub use output::{Peek, ResultValue, decode_payload, save_results};
pub use paths::PipelineDirs;
pub use pipeline::{AssemblyReport, PipelineAssembler, PipelineSettings};
pub use process::{CompiledProcess, ProcessNode};
pub use python::{PyValue, PythonModule};
pub use runner::PipelineRunner;
