use faer::MatRef;
use num_traits::Float;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::error::{Result, UmapError};
use crate::utils::math::squared_euclidean;

/////////
// ARI //
/////////

#[inline]
fn comb2(n: usize) -> f64 {
    if n < 2 {
        0.0
    } else {
        (n * (n - 1) / 2) as f64
    }
}

/// Adjusted Rand index between two labelings
///
/// Chance-corrected pair-counting agreement computed from the contingency
/// table of the two labelings. The label values themselves do not matter,
/// only the induced partitions.
///
/// ### Params
///
/// * `labels_true` - Reference labels
/// * `labels_pred` - Labels to compare against the reference
///
/// ### Returns
///
/// The ARI; `1.0` for identical partitions, around `0.0` for random ones
/// and negative for worse-than-random agreement
pub fn adjusted_rand_score(labels_true: &[usize], labels_pred: &[usize]) -> Result<f64> {
    if labels_true.len() != labels_pred.len() {
        return Err(UmapError::LengthMismatch {
            expected: labels_true.len(),
            actual: labels_pred.len(),
        });
    }
    let n = labels_true.len();
    if n == 0 {
        return Err(UmapError::EmptyInput);
    }
    if n == 1 {
        return Ok(1.0);
    }

    let mut joint: FxHashMap<(usize, usize), usize> = FxHashMap::default();
    let mut row_sums: FxHashMap<usize, usize> = FxHashMap::default();
    let mut col_sums: FxHashMap<usize, usize> = FxHashMap::default();

    for (&t, &p) in labels_true.iter().zip(labels_pred) {
        *joint.entry((t, p)).or_insert(0) += 1;
        *row_sums.entry(t).or_insert(0) += 1;
        *col_sums.entry(p).or_insert(0) += 1;
    }

    let sum_comb_ij: f64 = joint.values().map(|&c| comb2(c)).sum();
    let sum_comb_a: f64 = row_sums.values().map(|&a| comb2(a)).sum();
    let sum_comb_b: f64 = col_sums.values().map(|&b| comb2(b)).sum();

    let expected = sum_comb_a * sum_comb_b / comb2(n);
    let max_index = (sum_comb_a + sum_comb_b) / 2.0;

    let denom = max_index - expected;
    if denom.abs() < 1e-12 {
        // both labelings are a single cluster or all singletons
        return Ok(1.0);
    }

    Ok((sum_comb_ij - expected) / denom)
}

/////////////////////
// Trustworthiness //
/////////////////////

/// Row `i` of a matrix as an owned vector
fn row_vec<T: Float>(data: MatRef<T>, i: usize) -> Vec<T> {
    (0..data.ncols()).map(|j| data[(i, j)]).collect()
}

/// Indices of all other rows sorted by ascending distance to row `i`
fn ranked_neighbours<T>(rows: &[Vec<T>], i: usize) -> Vec<usize>
where
    T: Float,
{
    let mut order: Vec<(T, usize)> = rows
        .iter()
        .enumerate()
        .filter(|&(j, _)| j != i)
        .map(|(j, r)| (squared_euclidean(&rows[i], r), j))
        .collect();
    order.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.1.cmp(&b.1))
    });
    order.into_iter().map(|(_, j)| j).collect()
}

/// Trustworthiness of an embedding
///
/// Measures to which extent the local structure is retained: points that are
/// among the `k` nearest neighbours in the embedding but not in the original
/// space are penalised by how far down the original ranking they are.
///
/// `T(k) = 1 - 2 / (n k (2n - 3k - 1)) * sum_i sum_{j in N_k^emb(i)} max(0, r(i, j) - k)`
///
/// with `r(i, j)` the (1-based) rank of `j` among the neighbours of `i` in the
/// original space. Euclidean distances in both spaces.
///
/// ### Params
///
/// * `original` - Data in the original space (samples x features)
/// * `embedded` - Embedding of the same samples (samples x components)
/// * `n_neighbors` - Neighbourhood size `k`, must satisfy `k < n / 2`
///
/// ### Returns
///
/// Score in `[0, 1]`; `1.0` means every embedded neighbourhood is also a
/// neighbourhood in the original space
pub fn trustworthiness<T>(original: MatRef<T>, embedded: MatRef<T>, n_neighbors: usize) -> Result<f64>
where
    T: Float + Send + Sync,
{
    let n = original.nrows();
    if n == 0 {
        return Err(UmapError::EmptyInput);
    }
    if embedded.nrows() != n {
        return Err(UmapError::LengthMismatch {
            expected: n,
            actual: embedded.nrows(),
        });
    }
    if n_neighbors == 0 || 2 * n_neighbors >= n {
        return Err(UmapError::invalid(
            "n_neighbors",
            format!("must be in [1, n_samples / 2), got {n_neighbors} for {n} samples"),
        ));
    }

    let orig_rows: Vec<Vec<T>> = (0..n).map(|i| row_vec(original, i)).collect();
    let emb_rows: Vec<Vec<T>> = (0..n).map(|i| row_vec(embedded, i)).collect();
    let k = n_neighbors;

    let penalty: f64 = (0..n)
        .into_par_iter()
        .map(|i| {
            let mut rank = vec![0usize; n];
            for (r, j) in ranked_neighbours(&orig_rows, i).into_iter().enumerate() {
                rank[j] = r + 1;
            }

            ranked_neighbours(&emb_rows, i)
                .into_iter()
                .take(k)
                .map(|j| rank[j].saturating_sub(k) as f64)
                .sum::<f64>()
        })
        .sum();

    let (n_f, k_f) = (n as f64, k as f64);
    Ok(1.0 - penalty * 2.0 / (n_f * k_f * (2.0 * n_f - 3.0 * k_f - 1.0)))
}

///////////
// Tests //
///////////
