//! Synthetic dataset generators.
//!
//! Deterministic in their seed. Used for controlled sweeps only; a missing
//! real dataset is never replaced by one of these.

use std::f64::consts::PI;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_distr::Normal;
use tracing::info;

use boundary_lattice_core::{CoreError, CoreResult, Vector, VectorSet};

use super::{DataSource, Dataset, VectorProvider};
use crate::config::SyntheticKind;

/// Generated vectors with optional ground-truth labels.
#[derive(Debug, Clone)]
pub struct GeneratedData {
    /// The vectors.
    pub set: VectorSet,
    /// Cluster label per vector, when the generator has clusters.
    pub labels: Option<Vec<usize>>,
}

fn normal(std: f64) -> CoreResult<Normal<f64>> {
    Normal::new(0.0, std).map_err(|e| CoreError::InvalidParameter(format!("noise std {std}: {e}")))
}

fn add_noise(v: &mut [f64], noise: &Normal<f64>, std: f64, rng: &mut ChaCha8Rng) {
    if std > 0.0 {
        for x in v.iter_mut() {
            *x += noise.sample(rng);
        }
    }
}

fn to_vector(v: Vec<f64>) -> Vector {
    v.into_iter().map(|x| x as f32).collect()
}

/// Generate `n` vectors of dimension `dim` with the given shape.
///
/// # Errors
/// `InvalidParameter` for zero sizes, a dimension too small for the shape,
/// or negative noise.
pub fn generate(shape: SyntheticKind, n: usize, dim: usize, seed: u64) -> CoreResult<GeneratedData> {
    if n == 0 || dim == 0 {
        return Err(CoreError::InvalidParameter(format!(
            "synthetic dataset needs n > 0 and dim > 0, got n={n} dim={dim}"
        )));
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    match shape {
        SyntheticKind::Clusters { clusters, spread } => {
            if clusters == 0 || clusters > n {
                return Err(CoreError::InvalidParameter(format!(
                    "cluster count must lie in 1..={n}, got {clusters}"
                )));
            }
            let noise = normal(spread)?;
            let centres: Vec<Vec<f64>> = (0..clusters)
                .map(|_| (0..dim).map(|_| rng.gen::<f64>() * 4.0 - 2.0).collect())
                .collect();

            let per_cluster = n / clusters;
            let mut records = Vec::with_capacity(per_cluster * clusters);
            let mut labels = Vec::with_capacity(per_cluster * clusters);
            for (c, centre) in centres.iter().enumerate() {
                for i in 0..per_cluster {
                    let mut v = centre.clone();
                    add_noise(&mut v, &noise, spread, &mut rng);
                    records.push((format!("cluster{c}_{i}"), to_vector(v)));
                    labels.push(c);
                }
            }
            Ok(GeneratedData {
                set: VectorSet::new(records)?,
                labels: Some(labels),
            })
        }
        SyntheticKind::Ring { radius, noise: std } => {
            if dim < 2 {
                return Err(CoreError::InvalidParameter("ring needs dim >= 2".to_string()));
            }
            let noise = normal(std)?;
            let records = (0..n)
                .map(|i| {
                    let angle = 2.0 * PI * i as f64 / n as f64;
                    let mut v = vec![0.0; dim];
                    v[0] = radius * angle.cos();
                    v[1] = radius * angle.sin();
                    add_noise(&mut v, &noise, std, &mut rng);
                    (format!("ring_{i}"), to_vector(v))
                })
                .collect();
            Ok(GeneratedData {
                set: VectorSet::new(records)?,
                labels: None,
            })
        }
        SyntheticKind::SwissRoll { turns, noise: std } => {
            if dim < 3 {
                return Err(CoreError::InvalidParameter("swiss roll needs dim >= 3".to_string()));
            }
            let noise = normal(std)?;
            let records = (0..n)
                .map(|i| {
                    let t = i as f64 / n as f64 * 2.0 * PI * turns;
                    let mut v = vec![0.0; dim];
                    v[0] = t * t.cos();
                    v[1] = rng.gen::<f64>();
                    v[2] = t * t.sin();
                    add_noise(&mut v, &noise, std, &mut rng);
                    (format!("swissroll_{i}"), to_vector(v))
                })
                .collect();
            Ok(GeneratedData {
                set: VectorSet::new(records)?,
                labels: None,
            })
        }
    }
}

/// [`VectorProvider`] over [`generate`].
#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    name: String,
    shape: SyntheticKind,
    n: usize,
    dim: usize,
    seed: u64,
}

impl SyntheticProvider {
    /// Create a provider.
    pub fn new(name: impl Into<String>, shape: SyntheticKind, n: usize, dim: usize, seed: u64) -> Self {
        Self {
            name: name.into(),
            shape,
            n,
            dim,
            seed,
        }
    }
}

impl VectorProvider for SyntheticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> CoreResult<Dataset> {
        let data = generate(self.shape, self.n, self.dim, self.seed)?;
        info!(
            dataset = %self.name,
            vectors = data.set.len(),
            dim = data.set.dimension(),
            "Generated synthetic dataset"
        );
        Ok(Dataset {
            name: self.name.clone(),
            source: DataSource::Synthetic,
            corpus: data.set,
            queries: None,
            qrels: None,
            labels: data.labels,
        })
    }
}
