use ann_search_rs::hnsw::{HnswIndex, HnswState};
use ann_search_rs::nndescent::{ApplySortedUpdates, NNDescent, NNDescentQuery};
use ann_search_rs::utils::dist::SimdDistance;

use ann_search_rs::*;
use faer::MatRef;
use log::info;
use num_traits::{Float, FromPrimitive, ToPrimitive};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::time::Instant;
use thousands::*;

use crate::utils::math::squared_euclidean;

/////////////
// Helpers //
/////////////

/// Which nearest neighbour search to run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnnSearch {
    /// Brute-force search over all pairs
    #[default]
    Exact,
    /// HNSW
    Hnsw,
    /// NNDescent
    NNDescent,
}

/// Distance metric for the neighbour search
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DistMetric {
    #[default]
    Euclidean,
    /// `1 - cos(x, y)`
    Cosine,
}

/// Parse the AnnSearch to use
///
/// ### Params
///
/// * `s` - One of `"exact"`, `"hnsw"` or `"nndescent"` (case-insensitive)
///
/// ### Returns
///
/// Option of AnnSearch
pub fn parse_ann_search(s: &str) -> Option<AnnSearch> {
    match s.to_lowercase().as_str() {
        "exact" | "brute_force" => Some(AnnSearch::Exact),
        "hnsw" => Some(AnnSearch::Hnsw),
        "nndescent" => Some(AnnSearch::NNDescent),
        _ => None,
    }
}

/// Parse the distance metric
///
/// ### Params
///
/// * `s` - One of `"euclidean"` or `"cosine"` (case-insensitive)
///
/// ### Returns
///
/// Option of DistMetric
pub fn parse_dist_metric(s: &str) -> Option<DistMetric> {
    match s.to_lowercase().as_str() {
        "euclidean" => Some(DistMetric::Euclidean),
        "cosine" => Some(DistMetric::Cosine),
        _ => None,
    }
}

/// Parameters for the nearest neighbour search
///
/// ### Fields
///
/// * `dist_metric` - One of `"euclidean"` or `"cosine"`
///
/// **HNSW**-specific parameter:
///
/// * `m` - Number of bidirectional connections per layer. Defaults to 16 based
///   on uwot R package.
/// * `ef_construction` - Size of candidate list during construction.
/// * `ef_search` - Minimum size of the candidate list during search. Queries
///   of new points raise it to `transform_queue_size * k` if that is larger.
///
/// **NNDescent**-specific parameter
///
/// * `diversify_prob` - Diversifying probability at the end of the index
///   generation.
/// * `delta` - Early termination criterium
/// * `ef_budget` - Optional query budget. Queries of new points use at least
///   `transform_queue_size * k`.
#[derive(Debug, Clone)]
pub struct NearestNeighbourParams<T> {
    pub dist_metric: String,
    // hnsw
    pub m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
    // nndescent
    pub diversify_prob: T,
    pub delta: T,
    pub ef_budget: Option<usize>,
}

impl<T> Default for NearestNeighbourParams<T>
where
    T: Float,
{
    /// Returns sensible defaults for the nearest neighbour search
    fn default() -> Self {
        Self {
            dist_metric: "euclidean".to_string(),
            m: 16,
            ef_construction: 200,
            ef_search: 100,
            diversify_prob: T::zero(),
            delta: T::from(0.001).unwrap(),
            ef_budget: None,
        }
    }
}

/// Distance between two points under the given metric
///
/// Cosine distance against a zero vector is defined as `1`.
#[inline]
pub fn distance<T>(a: &[T], b: &[T], metric: DistMetric) -> T
where
    T: Float,
{
    match metric {
        DistMetric::Euclidean => squared_euclidean(a, b).sqrt(),
        DistMetric::Cosine => {
            let mut ab = T::zero();
            let mut aa = T::zero();
            let mut bb = T::zero();
            for (&x, &y) in a.iter().zip(b) {
                ab = ab + x * y;
                aa = aa + x * x;
                bb = bb + y * y;
            }
            if aa <= T::zero() || bb <= T::zero() {
                T::one()
            } else {
                (T::one() - ab / (aa.sqrt() * bb.sqrt())).max(T::zero())
            }
        }
    }
}

/// Ordering of `(distance, index)` pairs with the index as tie break
#[inline]
fn cmp_dist_idx<T: Float>(a: &(T, usize), b: &(T, usize)) -> Ordering {
    a.0.partial_cmp(&b.0)
        .unwrap_or(Ordering::Equal)
        .then(a.1.cmp(&b.1))
}

/// Split sorted `(distance, index)` lists into indices and distances
fn unzip_neighbours<T: Copy>(lists: Vec<Vec<(T, usize)>>) -> (Vec<Vec<usize>>, Vec<Vec<T>>) {
    lists
        .into_iter()
        .map(|list| {
            let (dists, idx): (Vec<T>, Vec<usize>) = list.into_iter().unzip();
            (idx, dists)
        })
        .unzip()
}

/// Rows of a matrix as vectors
fn mat_to_rows<T: Float>(data: MatRef<T>) -> Vec<Vec<T>> {
    (0..data.nrows())
        .map(|i| (0..data.ncols()).map(|j| data[(i, j)]).collect())
        .collect()
}

///////////
// Exact //
///////////

/// Brute-force k nearest neighbours of `queries` among `data`
///
/// ### Params
///
/// * `data` - Reference points
/// * `queries` - Query points
/// * `k` - Number of neighbours (capped by the number of candidates)
/// * `metric` - Distance metric
/// * `exclude_self` - If true, query `i` never returns reference point `i`
///   (used when data and queries are the same set).
///
/// ### Returns
///
/// `(knn_indices, knn_dist)`, sorted by increasing distance.
pub fn exact_knn<T>(
    data: &[Vec<T>],
    queries: &[Vec<T>],
    k: usize,
    metric: DistMetric,
    exclude_self: bool,
) -> (Vec<Vec<usize>>, Vec<Vec<T>>)
where
    T: Float + Send + Sync,
{
    let lists: Vec<Vec<(T, usize)>> = queries
        .par_iter()
        .enumerate()
        .map(|(qi, q)| {
            let mut cand: Vec<(T, usize)> = data
                .iter()
                .enumerate()
                .filter(|&(j, _)| !(exclude_self && j == qi))
                .map(|(j, x)| (distance(q, x, metric), j))
                .collect();

            let k_eff = k.min(cand.len());
            if k_eff < cand.len() {
                cand.select_nth_unstable_by(k_eff, cmp_dist_idx);
                cand.truncate(k_eff);
            }
            cand.sort_unstable_by(cmp_dist_idx);
            cand
        })
        .collect();

    unzip_neighbours(lists)
}

/////////////////////
// Neighbour index //
/////////////////////

/// Search structure behind a [`NeighbourIndex`]
enum Backend<T>
where
    T: Float + FromPrimitive + Send + Sync + Sum + SimdDistance,
{
    Exact,
    Hnsw(HnswIndex<T>),
    NNDescent(NNDescent<T>),
}

/// Searchable set of training points
///
/// Wraps the `ann-search-rs` HNSW or NN-Descent index, or nothing for the
/// brute-force search. The training rows are kept in every case: the
/// distances of the returned neighbours are always recomputed exactly, so all
/// backends report the same metric.
///
/// ### Fields
///
/// * `data` - Training points (samples x features)
/// * `metric` - Distance metric
/// * `backend` - Approximate index, if any
/// * `ef_search` - HNSW query candidate list size
/// * `ef_budget` - NN-Descent query budget
pub struct NeighbourIndex<T>
where
    T: Float + FromPrimitive + Send + Sync + Sum + SimdDistance,
{
    data: Vec<Vec<T>>,
    metric: DistMetric,
    backend: Backend<T>,
    ef_search: usize,
    ef_budget: Option<usize>,
}

impl<T> fmt::Debug for NeighbourIndex<T>
where
    T: Float + FromPrimitive + Send + Sync + Sum + SimdDistance,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backend = match self.backend {
            Backend::Exact => "exact",
            Backend::Hnsw(_) => "hnsw",
            Backend::NNDescent(_) => "nndescent",
        };
        f.debug_struct("NeighbourIndex")
            .field("backend", &backend)
            .field("metric", &self.metric)
            .field("n_samples", &self.data.len())
            .finish()
    }
}

impl<T> NeighbourIndex<T>
where
    T: Float + FromPrimitive + ToPrimitive + Send + Sync + Default + Sum + SimdDistance,
    HnswIndex<T>: HnswState<T>,
    NNDescent<T>: ApplySortedUpdates<T> + NNDescentQuery<T>,
{
    /// Build the index and the training kNN graph
    ///
    /// Approximate backends need at least `k + 2` samples; smaller data sets
    /// are searched by brute force.
    ///
    /// ### Params
    ///
    /// * `data` - Training points (samples x features)
    /// * `k` - Number of neighbours per point, self excluded
    /// * `ann` - Search strategy
    /// * `metric` - Distance metric
    /// * `params` - Nearest neighbour parameters
    /// * `seed` - Random seed
    /// * `verbose` - Controls verbosity
    ///
    /// ### Returns
    ///
    /// `(index, knn_indices, knn_dist)`
    pub fn build(
        data: MatRef<T>,
        k: usize,
        ann: AnnSearch,
        metric: DistMetric,
        params: &NearestNeighbourParams<T>,
        seed: u64,
        verbose: bool,
    ) -> (Self, Vec<Vec<usize>>, Vec<Vec<T>>) {
        let start = Instant::now();
        let n = data.nrows();
        let rows = mat_to_rows(data);

        let ann = if ann != AnnSearch::Exact && k + 2 > n {
            if verbose {
                info!(
                    "Only {} samples for k = {}; using exact search instead of {:?}.",
                    n, k, ann
                );
            }
            AnnSearch::Exact
        } else {
            ann
        };

        let (backend, candidates) = match ann {
            AnnSearch::Exact => (Backend::Exact, None),
            AnnSearch::Hnsw => {
                let index = build_hnsw_index(
                    data,
                    params.m,
                    params.ef_construction,
                    &params.dist_metric,
                    seed as usize,
                    verbose,
                );
                let (idx, _) = query_hnsw_index(
                    data,
                    &index,
                    k + 1,
                    params.ef_search.max(k + 1),
                    false,
                    verbose,
                );
                (Backend::Hnsw(index), Some(idx))
            }
            AnnSearch::NNDescent => {
                let index = build_nndescent_index(
                    data,
                    &params.dist_metric,
                    params.delta,
                    params.diversify_prob,
                    None, // defaults to the usual 30 candidates
                    None,
                    None,
                    None,
                    seed as usize,
                    verbose,
                );
                let (idx, _) =
                    query_nndescent_index(data, &index, k + 1, params.ef_budget, false, verbose);
                (Backend::NNDescent(index), Some(idx))
            }
        };

        let index = Self {
            data: rows,
            metric,
            backend,
            ef_search: params.ef_search,
            ef_budget: params.ef_budget,
        };

        let (knn_indices, knn_dist) = match candidates {
            None => exact_knn(&index.data, &index.data, k, metric, true),
            Some(idx) => {
                let idx = idx
                    .into_iter()
                    .enumerate()
                    .map(|(i, mut v)| {
                        v.retain(|&j| j != i);
                        v
                    })
                    .collect();
                index.rank_candidates(&index.data, idx, k)
            }
        };

        if verbose {
            info!(
                "kNN search ({:?}, k = {}) on {} samples done in {:.2?}.",
                ann,
                k,
                n.separate_with_underscores(),
                start.elapsed()
            );
        }

        (index, knn_indices, knn_dist)
    }

    /// Number of indexed points
    pub fn n_samples(&self) -> usize {
        self.data.len()
    }

    /// Number of features of the indexed points
    pub fn n_features(&self) -> usize {
        self.data.first().map_or(0, |r| r.len())
    }

    /// Exact distances of candidate neighbours, sorted and cut to `k`
    fn rank_candidates(
        &self,
        queries: &[Vec<T>],
        candidates: Vec<Vec<usize>>,
        k: usize,
    ) -> (Vec<Vec<usize>>, Vec<Vec<T>>) {
        let lists: Vec<Vec<(T, usize)>> = candidates
            .into_par_iter()
            .zip(queries.par_iter())
            .map(|(mut cand, q)| {
                cand.sort_unstable();
                cand.dedup();
                let mut list: Vec<(T, usize)> = cand
                    .into_iter()
                    .filter(|&j| j < self.data.len())
                    .map(|j| (distance(q, &self.data[j], self.metric), j))
                    .collect();
                list.sort_unstable_by(cmp_dist_idx);
                list.truncate(k);
                list
            })
            .collect();

        unzip_neighbours(lists)
    }

    /// Find the `k` nearest indexed points for each query
    ///
    /// ### Params
    ///
    /// * `queries` - New points (samples x features)
    /// * `k` - Number of neighbours, capped by the number of indexed points
    /// * `queue_size` - Multiplier for the search budget of the approximate
    ///   backends: HNSW searches with `max(ef_search, ceil(queue_size * k))`
    ///   candidates, NN-Descent with a budget of at least that size.
    ///
    /// ### Returns
    ///
    /// `(knn_indices, knn_dist)` sorted by increasing distance
    pub fn query(
        &self,
        queries: MatRef<T>,
        k: usize,
        queue_size: T,
    ) -> (Vec<Vec<usize>>, Vec<Vec<T>>) {
        let k = k.min(self.data.len());
        let rows = mat_to_rows(queries);
        let budget = ((queue_size.to_f64().unwrap_or(4.0) * k as f64).ceil() as usize).max(k);

        match &self.backend {
            Backend::Exact => exact_knn(&self.data, &rows, k, self.metric, false),
            Backend::Hnsw(index) => {
                let (idx, _) = query_hnsw_index(
                    queries,
                    index,
                    k,
                    self.ef_search.max(budget),
                    false,
                    false,
                );
                self.rank_candidates(&rows, idx, k)
            }
            Backend::NNDescent(index) => {
                let budget = Some(self.ef_budget.map_or(budget, |b| b.max(budget)));
                let (idx, _) = query_nndescent_index(queries, index, k, budget, false, false);
                self.rank_candidates(&rows, idx, k)
            }
        }
    }
}

///////////
// Tests //
///////////
