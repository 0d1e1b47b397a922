//! Error types for the gex-contrast library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum GexError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid value '{value}' at row {row}, column {col}")]
    InvalidValue {
        value: String,
        row: usize,
        col: usize,
    },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Sample ID mismatch: {0}")]
    SampleMismatch(String),

    #[error("Probe ID mismatch: {0}")]
    ProbeMismatch(String),

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Unknown group label '{0}'")]
    UnknownGroup(String),

    #[error(
        "Pairing mismatch in group '{group}': {stimulated} stimulated vs {unstimulated} unstimulated samples"
    )]
    PairingMismatch {
        group: String,
        stimulated: usize,
        unstimulated: usize,
    },

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, GexError>;
