//! Command line binding of Python functions.
//!
//! A [`CommandBinding`] describes how every parameter of a function is
//! exposed on the command line of its generated script: as a positional
//! argument or a `--flag`, with which type and help text, and which extra
//! arguments name the files results are written to. The same binding is
//! rendered as `argparse` calls in the script and as a `clap` command for
//! parsing script command lines on the Rust side.

mod binding;
mod command;
mod overrides;

pub use binding::{ArgRole, ArgumentSpec, CommandBinding, FlagTable};
pub use command::BoundArguments;
pub use overrides::{ArgOverride, ArgumentOverrides, OVERRIDES_VARIABLE, ValueKind};
