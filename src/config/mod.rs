//! Environment snapshot and descriptor override resolution.

mod env;
mod source;

pub use env::Environment;
pub use source::{Field, OverrideChain, OverrideSource, Resolved};
