//! Result serializer.
//!
//! Generated scripts encode the values returned by their function as JSON
//! and pipe them to `flowspect save`. Each value is decoded once into a
//! [`ResultValue`] and rendered by the rule of its variant: text for
//! scalars, sequences and mappings, tab separated text for tables, image
//! bytes for figures.

mod render;
mod save;
mod value;

pub use render::{Peek, Unsupported, render_text};
pub use save::{SaveReport, plot_path, save_results};
pub use value::{Plot, ResultEntry, ResultValue, Scalar, Table, decode_payload};
