//! Python source introspection over a tree-sitter syntax tree.
//!
//! This module provides:
//! - Function discovery in Python modules (top-level and nested `def` blocks)
//! - Signature parsing into typed parameters with literal defaults
//! - Module-level imports, helper functions and `__version__`
//! - Python and Nextflow literal rendering for parameter values

mod literal;
mod parser;
mod types;

pub use literal::PyValue;
pub(crate) use literal::py_str_list;
pub use parser::{PythonModule, dedent};
pub use types::{FunctionSignature, ParamKind, Parameter};
