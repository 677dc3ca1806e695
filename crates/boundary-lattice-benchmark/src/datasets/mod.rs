//! Data sources for the sweep harness.
//!
//! The harness only sees a [`Dataset`]. Whether its vectors were generated or
//! read from disk is decided here, behind the [`VectorProvider`] trait, and
//! recorded in [`Dataset::source`] for reporting.

pub mod loader;
pub mod oracle;
pub mod synthetic;

use serde::{Deserialize, Serialize};

use boundary_lattice_core::{CoreResult, Qrels, VectorSet};

use crate::config::DatasetSpec;

pub use loader::{load_qrels_tsv, load_vectors, load_vectors_json, load_vectors_jsonl, FileProvider};
pub use oracle::{embed_corpus, EmbeddingOracle};
pub use synthetic::{generate, SyntheticProvider};

/// Provenance of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Generated in memory from a seed.
    Synthetic,
    /// Loaded from files.
    Files,
}

/// Everything one evaluation needs, loaded once and shared read-only.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Name used in reports.
    pub name: String,
    /// Provenance.
    pub source: DataSource,
    /// Vectors to compress.
    pub corpus: VectorSet,
    /// Query vectors for ground-truth retrieval.
    pub queries: Option<VectorSet>,
    /// Relevance judgments for `queries`.
    pub qrels: Option<Qrels>,
    /// Generator cluster label per corpus vector, where one exists.
    pub labels: Option<Vec<usize>>,
}

impl Dataset {
    /// Whether ground-truth retrieval can run.
    pub fn has_ground_truth(&self) -> bool {
        matches!((&self.queries, &self.qrels), (Some(q), Some(r)) if !q.is_empty() && !r.is_empty())
    }
}

/// Source of a [`Dataset`].
pub trait VectorProvider: Send + Sync {
    /// Dataset name.
    fn name(&self) -> &str;

    /// Load the dataset.
    ///
    /// Fails with `MissingData` when the backing files do not exist; a
    /// provider never substitutes generated data for missing files.
    fn load(&self) -> CoreResult<Dataset>;
}

/// Provider for a configured dataset.
pub fn provider_for(spec: &DatasetSpec) -> Box<dyn VectorProvider> {
    match spec {
        DatasetSpec::Synthetic { name, n, dim, seed, shape } => {
            Box::new(SyntheticProvider::new(name.clone(), *shape, *n, *dim, *seed))
        }
        DatasetSpec::Files { name, vectors, queries, qrels } => Box::new(FileProvider {
            name: name.clone(),
            vectors: vectors.clone(),
            queries: queries.clone(),
            qrels: qrels.clone(),
        }),
    }
}
