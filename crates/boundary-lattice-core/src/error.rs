//! Error types for boundary-lattice-core.
//!
//! This module defines the central error type [`CoreError`] used throughout
//! the crate, along with the [`CoreResult<T>`] type alias.
//!
//! Degenerate inputs (fewer vectors than clusters, fewer vectors than the
//! neighbour count) are not errors. They resolve to documented fallbacks in
//! [`crate::clustering`] and [`crate::retrieval`].
//!
//! # Examples
//!
//! ```rust
//! use boundary_lattice_core::lattice::quantize;
//! use boundary_lattice_core::CoreError;
//!
//! let err = quantize(&[0.3, 0.7], 0.0).unwrap_err();
//! assert!(matches!(err, CoreError::InvalidParameter(_)));
//! ```

use thiserror::Error;

/// Top-level error type for boundary-lattice-core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A numeric parameter is outside its valid domain.
    ///
    /// # When This Occurs
    ///
    /// - Non-positive lattice step or cluster count
    /// - Percentile outside `[0, 100]` or not finite
    /// - Empty sweep ranges
    ///
    /// Never retried: the caller passed a value the operation cannot honour.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Required input data is absent.
    ///
    /// # When This Occurs
    ///
    /// - Dataset or qrels file does not exist
    /// - A query set is requested but the dataset carries none
    #[error("Missing data: {0}")]
    MissingData(String),

    /// Vector dimensionality does not match the set it is joined with.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensionality fixed by the first vector of the set
        expected: usize,
        /// Dimensionality of the offending vector
        actual: usize,
    },

    /// Two records in one vector set share an identifier.
    #[error("Duplicate identifier: {0}")]
    DuplicateId(String),

    /// Configuration is invalid or could not be parsed.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// Encoding or decoding a persisted artefact failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CoreError {
    /// Whether the affected run lacks usable input data.
    ///
    /// True for absent data and for dimension mismatches between sets that
    /// must be joined (queries against a corpus). The orchestration layer
    /// answers these with a failure report.
    pub fn is_missing_data(&self) -> bool {
        matches!(
            self,
            CoreError::MissingData(_) | CoreError::DimensionMismatch { .. }
        )
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Io(err.to_string())
    }
}

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
