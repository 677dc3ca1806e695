//! Domain types: vectors, vector sets, relevance judgments and metric records.
//!
//! All of these are immutable once built. A [`VectorSet`] is loaded once per run
//! and shared read-only between sweep workers; [`MetricRecord`]s are produced
//! per sweep point and never mutated after the point completes.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// A fixed-length embedding vector.
pub type Vector = Vec<f32>;

/// Well-known metric names used as [`MetricRecord`] keys.
pub mod metric_names {
    /// Recall at 10 retrieved items.
    pub const RECALL_10: &str = "recall@10";
    /// Recall at 100 retrieved items.
    pub const RECALL_100: &str = "recall@100";
    /// Mean reciprocal rank.
    pub const MRR: &str = "mrr";
    /// NDCG at 10 retrieved items.
    pub const NDCG_10: &str = "ndcg@10";
    /// Mean squared quantization error over every coordinate of every vector.
    pub const MSE_GLOBAL: &str = "mse_global";
    /// Mean squared error restricted to boundary vectors.
    pub const MSE_BOUNDARY: &str = "mse_boundary";
    /// Mean squared error restricted to bulk (non-boundary) vectors.
    pub const MSE_BULK: &str = "mse_bulk";
    /// `mse_boundary - mse_bulk`.
    pub const DELTA_BOUNDARY: &str = "delta_boundary";
    /// Mean Jaccard overlap of k-NN sets, original vs compressed.
    pub const NEIGHBORHOOD_OVERLAP: &str = "neighborhood_overlap";
    /// Lattice Stability Index.
    pub const LSI: &str = "lsi";
    /// Wall-clock compression time.
    pub const COMPRESSION_TIME: &str = "compression_time_seconds";
    /// Unique centroids after lattice deduplication.
    pub const UNIQUE_CENTROIDS: &str = "num_unique_centroids";
    /// Vectors labelled as boundary.
    pub const BOUNDARY_VECTORS: &str = "num_boundary_vectors";
    /// Codeword purity against generator labels.
    pub const LABEL_PURITY: &str = "label_purity";

    /// Key for recall at an arbitrary cutoff.
    pub fn recall_at(k: usize) -> String {
        format!("recall@{k}")
    }

    /// Key for NDCG at an arbitrary cutoff.
    pub fn ndcg_at(k: usize) -> String {
        format!("ndcg@{k}")
    }
}

/// An ordered sequence of `(identifier, vector)` pairs of a single dimensionality.
///
/// Identifiers are unique; they correlate retrieved results with ground truth.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorSet {
    ids: Vec<String>,
    vectors: Vec<Vector>,
    dimension: usize,
}

impl VectorSet {
    /// Build a set from `(id, vector)` records.
    ///
    /// # Errors
    /// * `DuplicateId` - two records share an identifier
    /// * `DimensionMismatch` - a vector differs in length from the first one
    /// * `InvalidParameter` - a vector is empty or holds a non-finite value
    pub fn new(records: Vec<(String, Vector)>) -> CoreResult<Self> {
        let mut ids = Vec::with_capacity(records.len());
        let mut vectors = Vec::with_capacity(records.len());
        let mut seen: HashMap<String, usize> = HashMap::with_capacity(records.len());
        let dimension = records.first().map(|(_, v)| v.len()).unwrap_or(0);

        for (idx, (id, vector)) in records.into_iter().enumerate() {
            if vector.is_empty() {
                return Err(CoreError::InvalidParameter(format!(
                    "vector '{id}' is empty"
                )));
            }
            if vector.len() != dimension {
                return Err(CoreError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            if vector.iter().any(|x| !x.is_finite()) {
                return Err(CoreError::InvalidParameter(format!(
                    "vector '{id}' contains a non-finite value"
                )));
            }
            if seen.insert(id.clone(), idx).is_some() {
                return Err(CoreError::DuplicateId(id));
            }
            ids.push(id);
            vectors.push(vector);
        }

        Ok(Self {
            ids,
            vectors,
            dimension,
        })
    }

    /// Build a set with positional identifiers `v0, v1, ...`.
    pub fn from_vectors(vectors: Vec<Vector>) -> CoreResult<Self> {
        Self::new(
            vectors
                .into_iter()
                .enumerate()
                .map(|(i, v)| (format!("v{i}"), v))
                .collect(),
        )
    }

    /// An empty set.
    pub fn empty() -> Self {
        Self {
            ids: Vec::new(),
            vectors: Vec::new(),
            dimension: 0,
        }
    }

    /// Number of vectors.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the set holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Dimensionality shared by every vector (0 for an empty set).
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Identifiers in input order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Vectors in input order.
    pub fn vectors(&self) -> &[Vector] {
        &self.vectors
    }

    /// Iterate `(id, vector)` pairs in input order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f32])> {
        self.ids
            .iter()
            .map(String::as_str)
            .zip(self.vectors.iter().map(Vec::as_slice))
    }

    /// Reuse this set's identifiers for a same-length list of replacement vectors.
    ///
    /// Used to rank compressed corpora by the original passage ids.
    pub fn with_vectors(&self, vectors: Vec<Vector>) -> CoreResult<Self> {
        if vectors.len() != self.len() {
            return Err(CoreError::InvalidParameter(format!(
                "replacement has {} vectors, set has {}",
                vectors.len(),
                self.len()
            )));
        }
        Self::new(self.ids.iter().cloned().zip(vectors).collect())
    }

    /// Fail with `DimensionMismatch` unless `other` has the same dimensionality.
    pub fn ensure_same_dimension(&self, other: &VectorSet) -> CoreResult<()> {
        if self.is_empty() || other.is_empty() || self.dimension == other.dimension {
            Ok(())
        } else {
            Err(CoreError::DimensionMismatch {
                expected: self.dimension,
                actual: other.dimension,
            })
        }
    }
}

/// Relevance judgments: query id to the set of relevant passage ids.
///
/// Only positive judgments are retained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qrels {
    judgments: BTreeMap<String, BTreeSet<String>>,
}

impl Qrels {
    /// Create empty judgments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(query_id, passage_id, relevance)` triples, dropping `relevance <= 0`.
    pub fn from_triples<I, Q, P>(triples: I) -> Self
    where
        I: IntoIterator<Item = (Q, P, i32)>,
        Q: Into<String>,
        P: Into<String>,
    {
        let mut qrels = Self::new();
        for (query_id, passage_id, relevance) in triples {
            qrels.insert(query_id, passage_id, relevance);
        }
        qrels
    }

    /// Record one judgment; non-positive relevance is ignored.
    pub fn insert(&mut self, query_id: impl Into<String>, passage_id: impl Into<String>, relevance: i32) {
        if relevance <= 0 {
            return;
        }
        self.judgments
            .entry(query_id.into())
            .or_default()
            .insert(passage_id.into());
    }

    /// Relevant passages for a query.
    pub fn relevant(&self, query_id: &str) -> Option<&BTreeSet<String>> {
        self.judgments.get(query_id)
    }

    /// Number of queries with at least one relevant passage.
    pub fn query_count(&self) -> usize {
        self.judgments.len()
    }

    /// Total number of positive judgments.
    pub fn total_judgments(&self) -> usize {
        self.judgments.values().map(BTreeSet::len).sum()
    }

    /// Whether no judgments were retained.
    pub fn is_empty(&self) -> bool {
        self.judgments.is_empty()
    }

    /// Iterate queries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.judgments.iter()
    }
}

/// Metric name to value.
///
/// `NaN` marks a metric that was not computable for a point; it is excluded
/// from every aggregate, never read as zero. Infinities are stored as `NaN`.
///
/// JSON encodes `NaN` as `null` and decodes `null` back to `NaN`, so records
/// round-trip through persistence.
#[derive(Debug, Clone, Default)]
pub struct MetricRecord {
    values: BTreeMap<String, f64>,
}

impl MetricRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a metric. Non-finite values are stored as `NaN`.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let value = if value.is_finite() { value } else { f64::NAN };
        self.values.insert(name.into(), value);
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    /// Raw value, `None` when the metric was never recorded.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Value when recorded and computable.
    pub fn finite(&self, name: &str) -> Option<f64> {
        self.get(name).filter(|v| v.is_finite())
    }

    /// Value, `NaN` when absent.
    pub fn value(&self, name: &str) -> f64 {
        self.get(name).unwrap_or(f64::NAN)
    }

    /// Copy every entry of `other` into this record, overwriting duplicates.
    pub fn extend(&mut self, other: &MetricRecord) {
        for (name, value) in &other.values {
            self.values.insert(name.clone(), *value);
        }
    }

    /// Iterate entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Metric names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the record is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PartialEq for MetricRecord {
    fn eq(&self, other: &Self) -> bool {
        self.values.len() == other.values.len()
            && self.values.iter().zip(other.values.iter()).all(|((ka, va), (kb, vb))| {
                ka == kb && (va == vb || (va.is_nan() && vb.is_nan()))
            })
    }
}

impl Serialize for MetricRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            let encoded: Option<f64> = value.is_finite().then_some(*value);
            map.serialize_entry(name, &encoded)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for MetricRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: BTreeMap<String, Option<f64>> = BTreeMap::deserialize(deserializer)?;
        Ok(Self {
            values: raw
                .into_iter()
                .map(|(k, v)| (k, v.unwrap_or(f64::NAN)))
                .collect(),
        })
    }
}

impl FromIterator<(String, f64)> for MetricRecord {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        let mut record = Self::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

/// Serde adapter writing non-finite `f64` as `null` and reading `null` as `NaN`.
///
/// Use with `#[serde(with = "boundary_lattice_core::types::nan_as_null")]`.
pub mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize `NaN` and infinities as `null`.
    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        value.is_finite().then_some(*value).serialize(serializer)
    }

    /// Deserialize `null` as `NaN`.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}
