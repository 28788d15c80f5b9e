use log::info;
use num_traits::{Float, FromPrimitive, ToPrimitive};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use thousands::*;

use crate::data::structures::*;

/// Floor for sigma relative to the mean neighbour distance
pub const MIN_K_DIST_SCALE: f64 = 1e-3;

//////////////////////////
// Smoothed kNN distance //
//////////////////////////

/// Local connectivity distance (rho) of one point
///
/// Interpolates between the non-zero neighbour distances: with
/// `local_connectivity = 1.5` rho is halfway between the first and second
/// non-zero distance.
///
/// ### Params
///
/// * `dists` - Sorted distances to the neighbours of the point
/// * `local_connectivity` - Number of neighbours assumed to be fully connected
///
/// ### Returns
///
/// The rho value of the point
fn local_rho<T>(dists: &[T], local_connectivity: T) -> T
where
    T: Float,
{
    let non_zero: Vec<T> = dists.iter().copied().filter(|&d| d > T::zero()).collect();
    if non_zero.is_empty() {
        return T::zero();
    }

    let index = local_connectivity.floor().to_usize().unwrap_or(0);
    let interpolation = local_connectivity - local_connectivity.floor();

    if non_zero.len() >= index {
        if index > 0 {
            let base = non_zero[index - 1];
            if interpolation > T::zero() && index < non_zero.len() {
                base + interpolation * (non_zero[index] - base)
            } else {
                base
            }
        } else {
            interpolation * non_zero[0]
        }
    } else {
        // fewer non-zero distances than requested connectivity
        non_zero[non_zero.len() - 1]
    }
}

/// Smooth kNN distances via binary search to find sigma for each point
///
/// For each point, finds the bandwidth (sigma) such that
/// `sum_j exp(-max(0, d_j - rho) / sigma) = log2(k)`. Afterwards sigma is
/// floored at `MIN_K_DIST_SCALE` times the mean neighbour distance so that
/// points in very dense regions do not end up with a degenerate kernel.
///
/// ### Params
///
/// * `dist` - kNN distance matrix where each row contains the sorted distances
///   to the nearest neighbours (self excluded)
/// * `k` - Neighbourhood size used for the target, `log2(k)`. For the
///   training graph this is `n_neighbors` (self included).
/// * `local_connectivity` - Number of nearest neighbours to assume are at
///   distance zero (typically 1.0).
/// * `tolerance` - Convergence tolerance of the binary search (typically 1e-5)
/// * `n_iter` - Maximum number of binary search iterations (typically 64)
///
/// ### Returns
///
/// * `sigmas` - Smoothing bandwidth for each point
/// * `rhos` - Distance to the `local_connectivity`-th nearest neighbour for
///   each point
pub fn smooth_knn_dist<T>(
    dist: &[Vec<T>],
    k: usize,
    local_connectivity: T,
    tolerance: T,
    n_iter: usize,
) -> (Vec<T>, Vec<T>)
where
    T: Float + FromPrimitive + Send + Sync,
{
    let target = T::from_f64((k.max(1) as f64).log2()).unwrap();
    let min_scale = T::from_f64(MIN_K_DIST_SCALE).unwrap();
    let two = T::from_f64(2.0).unwrap();

    let (total, count) = dist
        .iter()
        .flatten()
        .fold((T::zero(), 0usize), |(s, c), &d| (s + d, c + 1));
    let mean_all = if count > 0 {
        total / T::from_usize(count).unwrap()
    } else {
        T::zero()
    };

    dist.par_iter()
        .map(|dists| {
            let rho = local_rho(dists, local_connectivity);

            let mut lo = T::zero();
            let mut hi = T::infinity();
            let mut mid = T::one();

            for _ in 0..n_iter {
                let mut val = T::zero();
                for &d in dists.iter() {
                    let adjusted = d - rho;
                    val = val
                        + if adjusted > T::zero() {
                            (-(adjusted / mid)).exp()
                        } else {
                            T::one()
                        };
                }

                if (val - target).abs() < tolerance {
                    break;
                }

                if val > target {
                    hi = mid;
                    mid = (lo + hi) / two;
                } else {
                    lo = mid;
                    if hi.is_infinite() {
                        mid = mid * two;
                    } else {
                        mid = (lo + hi) / two;
                    }
                }
            }

            let sigma = if rho > T::zero() {
                let n = T::from_usize(dists.len().max(1)).unwrap();
                let mean_i = dists.iter().fold(T::zero(), |acc, &d| acc + d) / n;
                mid.max(min_scale * mean_i)
            } else {
                mid.max(min_scale * mean_all)
            };

            (sigma, rho)
        })
        .unzip()
}

//////////////////////////
// Membership strengths //
//////////////////////////

/// Membership strength of one directed edge
#[inline]
fn membership<T: Float>(dist: T, sigma: T, rho: T) -> T {
    let adjusted = dist - rho;
    if adjusted <= T::zero() || sigma <= T::zero() {
        T::one()
    } else {
        (-(adjusted / sigma)).exp()
    }
}

/// Shared COO builder for the directed membership graphs
fn memberships_to_coo<T>(
    knn_indices: &[Vec<usize>],
    knn_dists: &[Vec<T>],
    sigmas: &[T],
    rhos: &[T],
    skip_self: bool,
) -> SparseGraph<T>
where
    T: Float,
{
    let n = knn_indices.len();
    let capacity: usize = knn_indices.iter().map(|v| v.len()).sum();

    let mut row_indices = Vec::with_capacity(capacity);
    let mut col_indices = Vec::with_capacity(capacity);
    let mut values = Vec::with_capacity(capacity);

    for (i, (neighbours, dists)) in knn_indices.iter().zip(knn_dists.iter()).enumerate() {
        for (&j, &dist) in neighbours.iter().zip(dists.iter()) {
            if skip_self && i == j {
                continue;
            }

            let weight = membership(dist, sigmas[i], rhos[i]);
            if weight > T::zero() {
                row_indices.push(i);
                col_indices.push(j);
                values.push(weight);
            }
        }
    }

    SparseGraph {
        row_indices,
        col_indices,
        values,
        n_vertices: n,
    }
}

/// Convert kNN graph to sparse COO format with membership strengths
///
/// Computes the directed fuzzy simplicial set: the weight of `i -> j` is
/// `exp(-max(0, d_ij - rho_i) / sigma_i)`, and `1` when `d_ij <= rho_i`.
///
/// ### Params
///
/// * `knn_indices` - Indices of k nearest neighbours for each point
/// * `knn_dists` - Distances to k nearest neighbours for each point
/// * `sigmas` - Smoothing bandwidth for each point (from `smooth_knn_dist`)
/// * `rhos` - Local connectivity distance for each point (from
///   `smooth_knn_dist`)
///
/// ### Returns
///
/// Directed sparse graph in COO format without self loops
pub fn knn_to_coo<T>(
    knn_indices: &[Vec<usize>],
    knn_dists: &[Vec<T>],
    sigmas: &[T],
    rhos: &[T],
) -> SparseGraph<T>
where
    T: Float + Send + Sync,
{
    memberships_to_coo(knn_indices, knn_dists, sigmas, rhos, true)
}

/// Membership graph between new points and the training points
///
/// Same kernel as [`knn_to_coo`], but rows index the new points and columns
/// the training points, so `i == j` is a legitimate edge.
///
/// ### Params
///
/// * `knn_indices` - For each new point, indices of its nearest training
///   points
/// * `knn_dists` - The corresponding distances
/// * `sigmas` - Bandwidths of the new points
/// * `rhos` - Local connectivity distances of the new points
///
/// ### Returns
///
/// Bipartite graph with `n_vertices` equal to the number of new points
pub fn knn_to_bipartite_coo<T>(
    knn_indices: &[Vec<usize>],
    knn_dists: &[Vec<T>],
    sigmas: &[T],
    rhos: &[T],
) -> SparseGraph<T>
where
    T: Float + Send + Sync,
{
    memberships_to_coo(knn_indices, knn_dists, sigmas, rhos, false)
}

////////////////////
// Symmetrisation //
////////////////////

/// Symmetrise graph using a mix of fuzzy set union and intersection
///
/// For each pair with directed weights `a = w_ij` and `b = w_ji`:
///
/// `w = mix * (a + b - a * b) + (1 - mix) * (a * b)`
///
/// ### Params
///
/// * `graph` - Input directed graph in COO format
/// * `set_op_mix_ratio` - `1.0` is the pure fuzzy union (standard UMAP),
///   `0.0` the pure fuzzy intersection.
///
/// ### Returns
///
/// Symmetric graph in COO format; zero weights are dropped
pub fn symmetrise_graph<T>(graph: SparseGraph<T>, set_op_mix_ratio: T) -> SparseGraph<T>
where
    T: Float + Send + Sync,
{
    let n = graph.n_vertices;

    let mut forward: Vec<FxHashMap<usize, T>> = vec![FxHashMap::default(); n];
    let mut backward: Vec<FxHashMap<usize, T>> = vec![FxHashMap::default(); n];

    for ((&i, &j), &w) in graph
        .row_indices
        .iter()
        .zip(&graph.col_indices)
        .zip(&graph.values)
    {
        forward[i].insert(j, w);
        backward[j].insert(i, w);
    }

    let edges: Vec<Vec<(usize, T)>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let mut combined = FxHashMap::default();

            for &j in forward[i].keys().chain(backward[i].keys()) {
                if combined.contains_key(&j) {
                    continue;
                }
                let a = forward[i].get(&j).copied().unwrap_or(T::zero());
                let b = backward[i].get(&j).copied().unwrap_or(T::zero());

                let prod = a * b;
                let union = a + b - prod;
                let w_sym = set_op_mix_ratio * union + (T::one() - set_op_mix_ratio) * prod;

                combined.insert(j, w_sym);
            }

            let mut result: Vec<(usize, T)> = combined
                .into_iter()
                .filter(|&(_, w)| w > T::zero())
                .collect();
            result.sort_unstable_by_key(|&(idx, _)| idx);
            result
        })
        .collect();

    let capacity: usize = edges.iter().map(|v| v.len()).sum();
    let mut row_indices = Vec::with_capacity(capacity);
    let mut col_indices = Vec::with_capacity(capacity);
    let mut values = Vec::with_capacity(capacity);

    for (i, neighbours) in edges.into_iter().enumerate() {
        for (j, w) in neighbours {
            row_indices.push(i);
            col_indices.push(j);
            values.push(w);
        }
    }

    SparseGraph {
        row_indices,
        col_indices,
        values,
        n_vertices: n,
    }
}

/////////////
// Helpers //
/////////////

/// Convert COO sparse graph to adjacency list representation
///
/// ### Params
///
/// * `graph` - Sparse graph in COO format
///
/// ### Returns
///
/// Adjacency list where `result[i]` contains `(neighbour_index, edge_weight)`
/// pairs for vertex `i`
pub fn coo_to_adjacency_list<T>(graph: &SparseGraph<T>) -> Vec<Vec<(usize, T)>>
where
    T: Float,
{
    let mut adj = vec![Vec::new(); graph.n_vertices];

    for ((&i, &j), &w) in graph
        .row_indices
        .iter()
        .zip(&graph.col_indices)
        .zip(&graph.values)
    {
        adj[i].push((j, w));
    }

    adj
}

/// Filter out edges that are too weak to be sampled during optimisation
///
/// Removes edges where `weight < max_weight / n_epochs`: such edges would be
/// sampled less than once over the whole run.
///
/// ### Params
///
/// * `graph` - Input graph in COO format
/// * `n_epochs` - Number of optimisation epochs; `0` disables the filter
/// * `verbose` - Controls verbosity
///
/// ### Returns
///
/// Filtered graph with weak edges removed
pub fn filter_weak_edges<T>(graph: SparseGraph<T>, n_epochs: usize, verbose: bool) -> SparseGraph<T>
where
    T: Float + ToPrimitive,
{
    if n_epochs == 0 || graph.get_size() == 0 {
        return graph;
    }

    let threshold = graph.max_weight() / T::from(n_epochs).unwrap();
    let original_edge_no = graph.get_size();

    let mut filtered_rows = Vec::with_capacity(original_edge_no);
    let mut filtered_cols = Vec::with_capacity(original_edge_no);
    let mut filtered_vals = Vec::with_capacity(original_edge_no);

    for ((&i, &j), &w) in graph
        .row_indices
        .iter()
        .zip(&graph.col_indices)
        .zip(&graph.values)
    {
        if w >= threshold {
            filtered_rows.push(i);
            filtered_cols.push(j);
            filtered_vals.push(w);
        }
    }

    if verbose {
        info!(
            " Filtered out {} weak edges.",
            (original_edge_no - filtered_vals.len()).separate_with_underscores(),
        );
    }

    SparseGraph {
        row_indices: filtered_rows,
        col_indices: filtered_cols,
        values: filtered_vals,
        n_vertices: graph.n_vertices,
    }
}

///////////
// Tests //
///////////
