//! File loaders for vectors and relevance judgments.
//!
//! Supported formats:
//! - `.json`: an array of `{"item": id, "embedding": [..]}` records
//! - `.jsonl`: one such record per line, read in a streaming fashion
//! - qrels `.tsv`: a header row, then `query_id \t passage_id \t relevance`

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use boundary_lattice_core::{CoreError, CoreResult, Qrels, Vector, VectorSet};

use super::{DataSource, Dataset, VectorProvider};

/// One `(identifier, embedding)` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Unique identifier.
    #[serde(alias = "id")]
    pub item: String,
    /// Embedding values.
    pub embedding: Vector,
}

fn open(path: &Path) -> CoreResult<File> {
    if !path.exists() {
        return Err(CoreError::MissingData(format!("{} does not exist", path.display())));
    }
    File::open(path).map_err(|e| CoreError::Io(format!("{}: {e}", path.display())))
}

fn into_set(records: Vec<EmbeddingRecord>) -> CoreResult<VectorSet> {
    VectorSet::new(records.into_iter().map(|r| (r.item, r.embedding)).collect())
}

/// Load a JSON array of embedding records.
pub fn load_vectors_json(path: impl AsRef<Path>) -> CoreResult<VectorSet> {
    let path = path.as_ref();
    let file = open(path)?;
    let records: Vec<EmbeddingRecord> = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| CoreError::Serialization(format!("{}: {e}", path.display())))?;
    into_set(records)
}

/// Load JSON-lines embedding records, one per line. Blank lines are skipped.
pub fn load_vectors_jsonl(path: impl AsRef<Path>) -> CoreResult<VectorSet> {
    let path = path.as_ref();
    let reader = BufReader::new(open(path)?);
    let mut records = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| CoreError::Io(format!("{}: {e}", path.display())))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: EmbeddingRecord = serde_json::from_str(&line).map_err(|e| {
            CoreError::Serialization(format!("{} line {}: {e}", path.display(), line_num + 1))
        })?;
        records.push(record);
    }
    into_set(records)
}

/// Load vectors, choosing the format by extension (`.jsonl` or anything else as JSON).
pub fn load_vectors(path: impl AsRef<Path>) -> CoreResult<VectorSet> {
    let path = path.as_ref();
    match path.extension().and_then(|e| e.to_str()) {
        Some("jsonl") => load_vectors_jsonl(path),
        _ => load_vectors_json(path),
    }
}

/// Load a qrels TSV. The first line is a header and is skipped; rows with
/// fewer than three fields are ignored; non-positive relevance is dropped.
pub fn load_qrels_tsv(path: impl AsRef<Path>) -> CoreResult<Qrels> {
    let path = path.as_ref();
    let reader = BufReader::new(open(path)?);
    let mut qrels = Qrels::new();

    for (line_num, line) in reader.lines().enumerate().skip(1) {
        let line = line.map_err(|e| CoreError::Io(format!("{}: {e}", path.display())))?;
        let fields: Vec<&str> = line.trim().split('\t').collect();
        if fields.len() < 3 {
            debug!(line = line_num + 1, "Skipping short qrels row");
            continue;
        }
        let relevance: i32 = fields[2].trim().parse().map_err(|e| {
            CoreError::Serialization(format!(
                "{} line {}: bad relevance '{}': {e}",
                path.display(),
                line_num + 1,
                fields[2]
            ))
        })?;
        qrels.insert(fields[0], fields[1], relevance);
    }

    Ok(qrels)
}

/// [`VectorProvider`] reading vectors, queries and qrels from disk.
#[derive(Debug, Clone)]
pub struct FileProvider {
    /// Dataset name.
    pub name: String,
    /// Corpus vectors.
    pub vectors: PathBuf,
    /// Optional query vectors.
    pub queries: Option<PathBuf>,
    /// Optional qrels.
    pub qrels: Option<PathBuf>,
}

impl VectorProvider for FileProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> CoreResult<Dataset> {
        let corpus = load_vectors(&self.vectors)?;
        let queries = self.queries.as_ref().map(load_vectors).transpose()?;
        let qrels = self.qrels.as_ref().map(load_qrels_tsv).transpose()?;

        if let Some(q) = &queries {
            corpus.ensure_same_dimension(q)?;
        }

        info!(
            dataset = %self.name,
            vectors = corpus.len(),
            dim = corpus.dimension(),
            queries = queries.as_ref().map(VectorSet::len).unwrap_or(0),
            judged_queries = qrels.as_ref().map(Qrels::query_count).unwrap_or(0),
            "Loaded dataset from files"
        );

        Ok(Dataset {
            name: self.name.clone(),
            source: DataSource::Files,
            corpus,
            queries,
            qrels,
            labels: None,
        })
    }
}
