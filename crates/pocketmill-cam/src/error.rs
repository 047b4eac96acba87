//! Error types for pocket toolpath generation.

use thiserror::Error;

/// Errors related to pocketing parameter validation.
#[derive(Error, Debug)]
pub enum ParameterError {
    /// A parameter value is out of the valid range.
    #[error("Parameter '{name}' out of range: {value} (valid: {min}..{max})")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// A parameter value is invalid.
    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: String, reason: String },
}

/// Errors that can occur while generating a pocket toolpath.
#[derive(Error, Debug)]
pub enum PocketError {
    /// Invalid generator parameters.
    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),

    /// The Voronoi diagram of the boundary samples could not be built.
    #[error("Voronoi construction failed: {0}")]
    Voronoi(String),

    /// The medial-axis skeleton could not be turned into a branch tree.
    #[error("Skeleton construction failed: {0}")]
    SkeletonConstruction(String),
}

/// Result type alias for pocket generation.
pub type PocketResult<T> = Result<T, PocketError>;
