//! Boundary Lattice Core Library
//!
//! Numeric primitives for evaluating whether snapping embedding vectors onto a
//! coarser lattice degrades retrieval, and whether treating cluster-boundary
//! vectors on a finer lattice helps.
//!
//! # Architecture
//!
//! This crate defines:
//! - Domain types (`VectorSet`, `Qrels`, `MetricRecord`)
//! - The lattice quantizer, k-means cluster engine and boundary classifier
//! - The two compression strategies (baseline lattice-hybrid, boundary-aware)
//! - Quantization-error and retrieval-fidelity metrics
//! - Error types and result aliases
//!
//! Every function here takes its parameters explicitly. Configuration files,
//! dataset discovery and report writing live in `boundary-lattice-benchmark`.
//!
//! # Example
//!
//! ```
//! use boundary_lattice_core::compression::{compress, CompressionParams, Strategy};
//! use boundary_lattice_core::types::VectorSet;
//!
//! let set = VectorSet::from_vectors(vec![
//!     vec![0.0, 0.0],
//!     vec![0.1, 0.0],
//!     vec![5.0, 5.0],
//!     vec![5.1, 5.0],
//! ])
//! .unwrap();
//!
//! let params = CompressionParams::new(0.5, 2, 7);
//! let result = compress(Strategy::Baseline, &set, &params).unwrap();
//! assert_eq!(result.vectors.len(), 4);
//! ```

pub mod boundary;
pub mod clustering;
pub mod compression;
pub mod distortion;
pub mod error;
pub mod lattice;
pub mod retrieval;
pub mod stats;
pub mod types;
pub mod util;

// Re-exports for convenience
pub use compression::{compress, CentroidBackend, CompressionMetadata, CompressionParams, CompressionResult, Strategy};
pub use error::{CoreError, CoreResult};
pub use types::{MetricRecord, Qrels, Vector, VectorSet};
