#![allow(dead_code)]

use faer::{Mat, MatRef};
use umap_rs::prelude::*;

/// UMAP parameters with a fixed seed and a shorter schedule for the tests
pub fn seeded_params(seed: u64) -> UmapParams<f64> {
    UmapParams {
        random_state: Some(seed),
        n_epochs: Some(200),
        ..UmapParams::default()
    }
}

/// Five well separated Gaussian blobs, `n_per_cluster` points each
pub fn diagnostic_blobs(n_per_cluster: usize, n_dim: usize, seed: u64) -> (Mat<f64>, Vec<usize>) {
    make_blobs(n_per_cluster * 5, n_dim, 5, 1.0, (-20.0, 20.0), seed)
        .expect("blob generation should succeed")
}

/// Iris split into train and test parts
///
/// ### Returns
///
/// `(train_data, train_labels, test_data, test_labels)`
pub fn iris_split(seed: u64) -> (Mat<f64>, Vec<usize>, Mat<f64>, Vec<usize>) {
    let (data, labels) = load_iris();
    let (train, test) = random_split(data.nrows(), 0.75, seed).expect("valid split");
    (
        select_rows(data.as_ref(), &train),
        select_labels(&labels, &train),
        select_rows(data.as_ref(), &test),
        select_labels(&labels, &test),
    )
}

/// Mean intra- and inter-cluster Euclidean distance of an embedding
pub fn cluster_separation(embd: MatRef<f64>, labels: &[usize]) -> (f64, f64) {
    let n = embd.nrows();
    let (mut intra, mut n_intra) = (0.0, 0usize);
    let (mut inter, mut n_inter) = (0.0, 0usize);

    for i in 0..n {
        for j in (i + 1)..n {
            let d = (0..embd.ncols())
                .map(|c| (embd[(i, c)] - embd[(j, c)]).powi(2))
                .sum::<f64>()
                .sqrt();
            if labels[i] == labels[j] {
                intra += d;
                n_intra += 1;
            } else {
                inter += d;
                n_inter += 1;
            }
        }
    }

    (intra / n_intra.max(1) as f64, inter / n_inter.max(1) as f64)
}

/// Are all values of the matrix finite
pub fn all_finite(embd: MatRef<f64>) -> bool {
    (0..embd.nrows()).all(|i| (0..embd.ncols()).all(|j| embd[(i, j)].is_finite()))
}
