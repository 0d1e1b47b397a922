//! Contrast table assembly.

pub mod builder;

pub use builder::{build_contrasts, ContrastSet, ContrastTable};
