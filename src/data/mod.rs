//! Data structures for expression-contrast analysis.

mod annotation;
mod cohort;
mod controls;
mod expression;

pub use annotation::ProbeAnnotation;
pub use cohort::{BaseGroup, CohortRegistry, GroupTables};
pub use controls::{ControlMatrix, NEGATIVE_CONTROL};
pub use expression::ExpressionMatrix;
