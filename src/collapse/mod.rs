//! Probe-set merging and probe-to-gene collapsing.

pub mod gene;
pub mod merge;

pub use gene::collapse_genes;
pub use merge::merge_retained_probes;
