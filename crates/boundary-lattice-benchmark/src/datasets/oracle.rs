//! Embedding oracle interface.
//!
//! An oracle maps text to a vector of fixed dimensionality. No model is bundled;
//! callers plug one in and build a [`VectorSet`] with [`embed_corpus`]. Outputs
//! are not assumed to be deterministic.

use tracing::info;

use boundary_lattice_core::{CoreError, CoreResult, Vector, VectorSet};

/// Text-to-vector function.
pub trait EmbeddingOracle: Send + Sync {
    /// Oracle name for report metadata.
    fn name(&self) -> &str;

    /// Output dimensionality.
    fn dimension(&self) -> usize;

    /// Embed one text.
    fn embed(&self, text: &str) -> CoreResult<Vector>;
}

/// Embed `(id, text)` records into a [`VectorSet`].
///
/// # Errors
/// * `DimensionMismatch` - the oracle returned a vector of the wrong length
/// * `DuplicateId` - two records share an id
/// * any error the oracle itself returns
pub fn embed_corpus<O, I, S>(oracle: &O, records: I) -> CoreResult<VectorSet>
where
    O: EmbeddingOracle + ?Sized,
    I: IntoIterator<Item = (String, S)>,
    S: AsRef<str>,
{
    let dim = oracle.dimension();
    let mut embedded = Vec::new();
    for (id, text) in records {
        let vector = oracle.embed(text.as_ref())?;
        if vector.len() != dim {
            return Err(CoreError::DimensionMismatch {
                expected: dim,
                actual: vector.len(),
            });
        }
        embedded.push((id, vector));
    }

    let set = VectorSet::new(embedded)?;
    info!(oracle = oracle.name(), vectors = set.len(), dim, "Embedded corpus");
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Byte-histogram oracle for tests.
    struct ByteHistogram {
        dim: usize,
    }

    impl EmbeddingOracle for ByteHistogram {
        fn name(&self) -> &str {
            "byte-histogram"
        }

        fn dimension(&self) -> usize {
            self.dim
        }

        fn embed(&self, text: &str) -> CoreResult<Vector> {
            let mut v = vec![0.0; self.dim];
            for b in text.bytes() {
                v[b as usize % self.dim] += 1.0;
            }
            Ok(v)
        }
    }

    struct Broken;

    impl EmbeddingOracle for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn dimension(&self) -> usize {
            4
        }

        fn embed(&self, _text: &str) -> CoreResult<Vector> {
            Ok(vec![0.0; 3])
        }
    }

    #[test]
    fn test_embed_corpus() {
        let oracle = ByteHistogram { dim: 8 };
        let set = embed_corpus(
            &oracle,
            vec![("a".to_string(), "hello"), ("b".to_string(), "world")],
        )
        .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.dimension(), 8);
        assert_eq!(set.vectors()[0].iter().sum::<f32>(), 5.0);
    }

    #[test]
    fn test_embed_corpus_checks_dimension() {
        let err = embed_corpus(&Broken, vec![("a".to_string(), "x")]).unwrap_err();
        assert!(matches!(err, CoreError::DimensionMismatch { expected: 4, actual: 3 }));
    }

    #[test]
    fn test_embed_corpus_rejects_duplicates() {
        let oracle = ByteHistogram { dim: 2 };
        let err = embed_corpus(&oracle, vec![("a".to_string(), "x"), ("a".to_string(), "y")]).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateId(_)));
    }
}
