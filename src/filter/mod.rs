//! Noise-floor estimation, signal masking, and group retention filtering.

pub mod noise_floor;
pub mod retention;
pub mod signal;

pub use noise_floor::noise_floor_thresholds;
pub use retention::{filter_group_retention, GroupRetention, RetentionResult};
pub use signal::{signal_filter, MaskedExpression};
