//! Integration tests for the compression pipeline on seeded Gaussian clusters.
//!
//! Every test builds its data from a fixed seed so failures reproduce exactly.

use boundary_lattice_core::boundary::classify;
use boundary_lattice_core::clustering::{cluster, ClusterParams};
use boundary_lattice_core::distortion::{distortion_metrics, quantization_error};
use boundary_lattice_core::lattice::quantize;
use boundary_lattice_core::retrieval::{evaluate_neighbor_preservation, Cutoffs};
use boundary_lattice_core::types::metric_names;
use boundary_lattice_core::{compress, CompressionParams, Strategy, VectorSet};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

fn gaussian_clusters(n: usize, dim: usize, clusters: usize, spread: f64, seed: u64) -> VectorSet {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let noise = Normal::new(0.0, spread).expect("valid spread");
    let centres: Vec<Vec<f64>> = (0..clusters)
        .map(|_| (0..dim).map(|_| rng.gen_range(-5.0..5.0)).collect())
        .collect();

    let records = (0..n)
        .map(|i| {
            let centre = &centres[i % clusters];
            let v = centre.iter().map(|c| (c + noise.sample(&mut rng)) as f32).collect();
            (format!("pt{i}"), v)
        })
        .collect();
    VectorSet::new(records).expect("valid set")
}

// =========================================================================
// Lattice and clustering properties
// =========================================================================

#[test]
fn test_quantize_idempotent_on_cluster_data() {
    let set = gaussian_clusters(50, 8, 3, 0.5, 1);
    for step in [0.05, 0.1, 0.25, 1.0] {
        for v in set.vectors() {
            let once = quantize(v, step).expect("quantize");
            let twice = quantize(&once, step).expect("quantize");
            assert_eq!(once, twice, "step {step}");
        }
    }
}

#[test]
fn test_cluster_identity_fallback() {
    let set = gaussian_clusters(4, 8, 2, 0.5, 2);
    let centroids = cluster(&set, &ClusterParams::new(4, 9)).expect("cluster");
    assert_eq!(centroids.as_slice(), set.vectors());
}

#[test]
fn test_boundary_percentile_is_monotonic() {
    let set = gaussian_clusters(200, 8, 4, 0.8, 3);
    let centroids = cluster(&set, &ClusterParams::new(4, 3)).expect("cluster");
    let mut last = 0;
    for percentile in [0.0, 10.0, 30.0, 60.0, 100.0] {
        let count = classify(&set, &centroids, percentile)
            .expect("classify")
            .into_iter()
            .filter(|b| *b)
            .count();
        assert!(count >= last);
        last = count;
    }
    assert_eq!(last, set.len());
}

// =========================================================================
// End-to-end compression
// =========================================================================

#[test]
fn test_five_cluster_scenario() {
    let set = gaussian_clusters(500, 8, 5, 0.5, 42);
    let params = CompressionParams::new(0.1, 5, 42);

    let baseline = compress(Strategy::Baseline, &set, &params).expect("baseline");
    let aware = compress(Strategy::BoundaryAware, &set, &params).expect("boundary-aware");

    let base_err = quantization_error(set.vectors(), &baseline.vectors, &baseline.boundary_mask)
        .expect("baseline error");
    let aware_err = quantization_error(set.vectors(), &aware.vectors, &aware.boundary_mask)
        .expect("aware error");

    for mse in [base_err.mse_global, aware_err.mse_global] {
        assert!(mse.is_finite());
        assert!(mse >= 0.0);
    }
    assert!(aware.metadata.num_boundary_vectors > 0);
    assert!(aware_err.mse_boundary.is_finite());
    assert!(aware_err.mse_bulk.is_finite());
    assert_ne!(aware_err.mse_boundary, aware_err.mse_bulk);

    println!(
        "[PASS] baseline mse={:.5} aware mse={:.5} boundary={:.5} bulk={:.5}",
        base_err.mse_global, aware_err.mse_global, aware_err.mse_boundary, aware_err.mse_bulk
    );
}

#[test]
fn test_compressed_vectors_belong_to_codebook() {
    let set = gaussian_clusters(300, 8, 5, 0.5, 7);
    for strategy in Strategy::ALL {
        let result = compress(strategy, &set, &CompressionParams::new(0.3, 8, 7)).expect("compress");
        assert_eq!(result.len(), set.len());
        for v in &result.vectors {
            assert!(result.codebook.contains(v), "{strategy} produced a vector outside its codebook");
        }
        assert!(result.metadata.num_unique_centroids <= result.codebook.len());
    }
}

#[test]
fn test_compression_reproducible() {
    let set = gaussian_clusters(200, 8, 5, 0.5, 11);
    let params = CompressionParams::new(0.2, 5, 11);
    let a = compress(Strategy::BoundaryAware, &set, &params).expect("first");
    let b = compress(Strategy::BoundaryAware, &set, &params).expect("second");
    assert_eq!(a.vectors, b.vectors);
    assert_eq!(a.boundary_mask, b.boundary_mask);
    assert_eq!(a.metadata.num_unique_centroids, b.metadata.num_unique_centroids);
}

#[test]
fn test_distortion_record_is_complete() {
    let set = gaussian_clusters(120, 8, 4, 0.5, 5);
    let result = compress(Strategy::BoundaryAware, &set, &CompressionParams::new(0.1, 4, 5)).expect("compress");
    let record = distortion_metrics(&set, &result, 10).expect("metrics");

    for name in [
        metric_names::MSE_GLOBAL,
        metric_names::MSE_BOUNDARY,
        metric_names::MSE_BULK,
        metric_names::DELTA_BOUNDARY,
        metric_names::NEIGHBORHOOD_OVERLAP,
        metric_names::LSI,
        metric_names::UNIQUE_CENTROIDS,
        metric_names::BOUNDARY_VECTORS,
        metric_names::COMPRESSION_TIME,
    ] {
        assert!(record.get(name).is_some(), "missing {name}");
    }
    let lsi = record.value(metric_names::LSI);
    assert!(lsi > 0.0 && lsi <= 1.0);
}

#[test]
fn test_neighbor_preservation_on_compressed_clusters() {
    let set = gaussian_clusters(150, 8, 5, 0.5, 13);
    let result = compress(Strategy::Baseline, &set, &CompressionParams::new(0.5, 5, 13)).expect("compress");
    let metrics = evaluate_neighbor_preservation(set.vectors(), &result.vectors, &Cutoffs::default())
        .expect("evaluate");
    for value in [metrics.recall(10), metrics.recall(100), metrics.mrr, metrics.ndcg] {
        assert!((0.0..=1.0).contains(&value), "{value}");
    }
}
