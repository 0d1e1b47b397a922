//! Gene-level contrast tables from normalized microarray probe intensities.
//!
//! This library turns a normalized probe × sample intensity matrix, its
//! probe-to-gene annotation, a parallel control-probe matrix, and a
//! sample-to-cohort lookup table into five gene-level contrast tables ready
//! for downstream gene-set enrichment analysis.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (ExpressionMatrix, ControlMatrix,
//!   ProbeAnnotation, CohortRegistry)
//! - **filter**: Noise-floor estimation, signal masking, group retention
//! - **collapse**: Probe-set merging and probe-to-gene collapse
//! - **contrast**: Assembly of the five output tables
//! - **pipeline**: Fixed-stage orchestration, configuration, reporting
//!
//! # Example
//!
//! ```no_run
//! use gex_contrast::prelude::*;
//!
//! // Load inputs (expression values on the log2 scale)
//! let expression = ExpressionMatrix::from_tsv("expression.tsv").unwrap();
//! let controls = ControlMatrix::from_tsv("controls.tsv").unwrap();
//! let annotation = ProbeAnnotation::from_tsv("annotation.tsv").unwrap();
//! let registry = CohortRegistry::from_tsv("cohorts.tsv").unwrap();
//!
//! // Run the pipeline and write the five contrast tables
//! let (contrasts, report) = Pipeline::new()
//!     .run(&expression, &controls, &annotation, &registry)
//!     .unwrap();
//! contrasts.write_all("out").unwrap();
//! eprintln!("{}", report);
//! ```

pub mod collapse;
pub mod contrast;
pub mod data;
pub mod error;
pub mod filter;
pub mod pipeline;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::collapse::{collapse_genes, merge_retained_probes};
    pub use crate::contrast::{build_contrasts, ContrastSet, ContrastTable};
    pub use crate::data::{
        BaseGroup, CohortRegistry, ControlMatrix, ExpressionMatrix, GroupTables,
        ProbeAnnotation, NEGATIVE_CONTROL,
    };
    pub use crate::error::{GexError, Result};
    pub use crate::filter::{
        filter_group_retention, noise_floor_thresholds, signal_filter, GroupRetention,
        MaskedExpression, RetentionResult,
    };
    pub use crate::pipeline::{Pipeline, PipelineConfig, PipelineReport};
}
