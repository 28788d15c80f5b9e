#![allow(clippy::needless_range_loop)] // I like loops ... !

pub mod data;
pub mod error;
pub mod evaluation;
pub mod prelude;
pub mod training;
pub mod utils;

use ann_search_rs::{
    hnsw::{HnswIndex, HnswState},
    nndescent::{ApplySortedUpdates, NNDescent, NNDescentQuery},
    utils::dist::SimdDistance,
};
use faer::{Mat, MatRef};
use log::{info, warn};
use num_traits::{Float, FromPrimitive, ToPrimitive};
use std::{
    default::Default,
    fmt::Debug,
    iter::Sum,
    marker::{Send, Sync},
    ops::{AddAssign, SubAssign},
    time::Instant,
};
use thousands::*;

use crate::data::graph::*;
use crate::data::init::*;
use crate::data::nearest_neighbours::*;
use crate::data::structures::*;
use crate::error::{Result, UmapError};
use crate::training::umap_optimisers::*;
use crate::training::*;

/// Sample count up to which the larger default epoch counts are used
const SMALL_DATA_LIMIT: usize = 10_000;

/////////////
// Helpers //
/////////////

/// Reject matrices with NaN or infinite values
///
/// ### Params
///
/// * `data` - Input data matrix (samples × features)
///
/// ### Returns
///
/// Error with the position of the first non-finite value
fn check_finite<T>(data: MatRef<T>) -> Result<()>
where
    T: Float,
{
    for i in 0..data.nrows() {
        for j in 0..data.ncols() {
            if !data[(i, j)].is_finite() {
                return Err(UmapError::NonFiniteInput { row: i, col: j });
            }
        }
    }
    Ok(())
}

/// Row vectors into a `samples × components` matrix
fn rows_to_matrix<T>(rows: &[Vec<T>], n_cols: usize) -> Mat<T>
where
    T: Float,
{
    Mat::from_fn(rows.len(), n_cols, |i, j| rows[i][j])
}

/// Helper function to generate the UMAP graph
///
/// Runs the nearest neighbour search, computes the smoothed kNN distances and
/// membership strengths, symmetrises the graph and drops edges too weak to be
/// sampled in `n_epochs` epochs.
///
/// ### Params
///
/// * `data` - Input data (samples × features)
/// * `n_neighbors` - Neighbourhood size, the point itself included. Each
///   point gets `n_neighbors - 1` directed edges.
/// * `params` - UMAP parameters (search type, metric, `local_connectivity`,
///   `set_op_mix_ratio` and the graph parameters are used)
/// * `n_epochs` - Number of optimisation epochs the graph is filtered for
/// * `seed` - Random seed
///
/// ### Returns
///
/// Tuple of (graph, neighbour index over `data`)
pub fn construct_umap_graph<T>(
    data: MatRef<T>,
    n_neighbors: usize,
    params: &UmapParams<T>,
    n_epochs: usize,
    seed: u64,
) -> Result<(SparseGraph<T>, NeighbourIndex<T>)>
where
    T: Float + FromPrimitive + ToPrimitive + Send + Sync + Default + Sum + SimdDistance,
    HnswIndex<T>: HnswState<T>,
    NNDescent<T>: ApplySortedUpdates<T> + NNDescentQuery<T>,
{
    let ann = parse_ann_search(&params.ann_type)
        .ok_or_else(|| UmapError::invalid("ann_type", format!("unknown `{}`", params.ann_type)))?;
    let metric = parse_dist_metric(&params.nn_params.dist_metric).ok_or_else(|| {
        UmapError::invalid(
            "dist_metric",
            format!("unknown `{}`", params.nn_params.dist_metric),
        )
    })?;

    if params.verbose {
        info!("Running nearest neighbour search ({:?})...", ann);
    }

    let (index, knn_indices, knn_dist) = NeighbourIndex::build(
        data,
        n_neighbors.saturating_sub(1),
        ann,
        metric,
        &params.nn_params,
        seed,
        params.verbose,
    );

    let start_graph = Instant::now();

    let (sigma, rho) = smooth_knn_dist(
        &knn_dist,
        n_neighbors,
        params.local_connectivity,
        params.graph_params.tolerance,
        params.graph_params.n_iter,
    );

    let graph = knn_to_coo(&knn_indices, &knn_dist, &sigma, &rho);
    let graph = symmetrise_graph(graph, params.set_op_mix_ratio);
    let graph = filter_weak_edges(graph, n_epochs, params.verbose);

    if params.verbose {
        info!(
            "Finalised graph with {} edges in {:.2?}.",
            graph.get_size().separate_with_underscores(),
            start_graph.elapsed()
        );
    }

    Ok((graph, index))
}

////////////
// Params //
////////////

/// Main config structure of the UMAP
///
/// ### Fields
///
/// * `n_neighbors` - Size of the local neighbourhood (the point included).
///   Larger values favour global structure. Default `15`.
/// * `n_components` - Dimensionality of the embedding. Default `2`.
/// * `n_epochs` - Optimisation epochs. `None` picks 500 for up to 10,000
///   samples and 200 above (fit), 100 or 30 for transform.
/// * `learning_rate` - Initial SGD learning rate. Default `1.0`.
/// * `init` - `"spectral"` or `"random"`. Default `"spectral"`.
/// * `min_dist` - Minimum distance between embedded points. Default `0.1`.
/// * `spread` - Effective scale of embedded points. Default `1.0`.
/// * `set_op_mix_ratio` - `1.0` fuzzy union, `0.0` fuzzy intersection.
/// * `local_connectivity` - Nearest neighbours assumed fully connected.
///   Default `1.0`.
/// * `repulsion_strength` - Weight of the negative samples. Default `1.0`.
/// * `negative_sample_rate` - Negative samples per positive edge. Default `5`.
/// * `transform_queue_size` - Search budget multiplier for `transform` with
///   an approximate index: HNSW `ef_search` and the NN-Descent `ef_budget`
///   are raised to at least `transform_queue_size * k`. Default `4.0`.
/// * `a` - Curve parameter; fitted from `min_dist`/`spread` unless both `a`
///   and `b` are given.
/// * `b` - Curve parameter, see `a`.
/// * `random_state` - Seed. `None` draws one from the OS.
/// * `ann_type` - `"exact"` (default), `"hnsw"` or `"nndescent"`.
/// * `nn_params` - Nearest neighbour parameters.
/// * `graph_params` - Parameters of the smoothed kNN distance search.
/// * `verbose` - Log progress via `info!`.
#[derive(Debug, Clone)]
pub struct UmapParams<T> {
    pub n_neighbors: usize,
    pub n_components: usize,
    pub n_epochs: Option<usize>,
    pub learning_rate: T,
    pub init: String,
    pub min_dist: T,
    pub spread: T,
    pub set_op_mix_ratio: T,
    pub local_connectivity: T,
    pub repulsion_strength: T,
    pub negative_sample_rate: usize,
    pub transform_queue_size: T,
    pub a: Option<T>,
    pub b: Option<T>,
    pub random_state: Option<u64>,
    pub ann_type: String,
    pub nn_params: NearestNeighbourParams<T>,
    pub graph_params: UmapGraphParams<T>,
    pub verbose: bool,
}

impl<T> Default for UmapParams<T>
where
    T: Float + FromPrimitive,
{
    fn default() -> Self {
        Self {
            n_neighbors: 15,
            n_components: 2,
            n_epochs: None,
            learning_rate: T::one(),
            init: "spectral".to_string(),
            min_dist: T::from_f64(0.1).unwrap(),
            spread: T::one(),
            set_op_mix_ratio: T::one(),
            local_connectivity: T::one(),
            repulsion_strength: T::one(),
            negative_sample_rate: 5,
            transform_queue_size: T::from_f64(4.0).unwrap(),
            a: None,
            b: None,
            random_state: None,
            ann_type: "exact".to_string(),
            nn_params: NearestNeighbourParams::default(),
            graph_params: UmapGraphParams::default(),
            verbose: false,
        }
    }
}

impl<T> UmapParams<T>
where
    T: Float + FromPrimitive + Debug,
{
    /// Default 2D parameters
    ///
    /// ### Params
    ///
    /// * `n_components` - How many dimensions to return. Default `2`.
    /// * `n_neighbors` - How many neighbours to consider. Default `15`.
    /// * `min_dist` - Minimum distance between the data points. Defaults to
    ///   `0.1`.
    /// * `spread` - Spread parameter. Defaults to `1.0`.
    ///
    /// ### Returns
    ///
    /// Hopefully sensible standard parameters for standard 2D visualisation.
    pub fn default_2d(
        n_components: Option<usize>,
        n_neighbors: Option<usize>,
        min_dist: Option<T>,
        spread: Option<T>,
    ) -> Self {
        let default = Self::default();
        Self {
            n_components: n_components.unwrap_or(default.n_components),
            n_neighbors: n_neighbors.unwrap_or(default.n_neighbors),
            min_dist: min_dist.unwrap_or(default.min_dist),
            spread: spread.unwrap_or(default.spread),
            ..default
        }
    }

    /// Check all parameters
    ///
    /// ### Returns
    ///
    /// `Ok(())` or the first offending parameter as
    /// [`UmapError::InvalidParameter`]
    pub fn validate(&self) -> Result<()> {
        let zero = T::zero();

        if self.n_neighbors < 2 {
            return Err(UmapError::invalid(
                "n_neighbors",
                format!("must be at least 2, got {}", self.n_neighbors),
            ));
        }
        if self.n_components < 1 {
            return Err(UmapError::invalid("n_components", "must be at least 1"));
        }
        if !(self.min_dist >= zero) {
            return Err(UmapError::invalid(
                "min_dist",
                format!("must be non-negative, got {:?}", self.min_dist),
            ));
        }
        if !(self.spread > zero) {
            return Err(UmapError::invalid(
                "spread",
                format!("must be positive, got {:?}", self.spread),
            ));
        }
        if self.min_dist > self.spread {
            return Err(UmapError::invalid(
                "min_dist",
                format!(
                    "must not exceed spread ({:?}), got {:?}",
                    self.spread, self.min_dist
                ),
            ));
        }
        if !(self.set_op_mix_ratio >= zero && self.set_op_mix_ratio <= T::one()) {
            return Err(UmapError::invalid(
                "set_op_mix_ratio",
                format!("must be in [0, 1], got {:?}", self.set_op_mix_ratio),
            ));
        }
        if !(self.learning_rate > zero) {
            return Err(UmapError::invalid(
                "learning_rate",
                format!("must be positive, got {:?}", self.learning_rate),
            ));
        }
        if !(self.repulsion_strength >= zero) {
            return Err(UmapError::invalid(
                "repulsion_strength",
                format!("must be non-negative, got {:?}", self.repulsion_strength),
            ));
        }
        if !(self.local_connectivity >= zero) {
            return Err(UmapError::invalid(
                "local_connectivity",
                format!("must be non-negative, got {:?}", self.local_connectivity),
            ));
        }
        if !(self.transform_queue_size > zero) {
            return Err(UmapError::invalid(
                "transform_queue_size",
                format!("must be positive, got {:?}", self.transform_queue_size),
            ));
        }
        for (name, value) in [("a", self.a), ("b", self.b)] {
            if let Some(v) = value {
                if !(v > zero) || !v.is_finite() {
                    return Err(UmapError::invalid(
                        name,
                        format!("must be positive, got {v:?}"),
                    ));
                }
            }
        }
        if parse_initialisation::<T>(&self.init, None).is_none() {
            return Err(UmapError::invalid(
                "init",
                format!("expected `spectral` or `random`, got `{}`", self.init),
            ));
        }
        if parse_ann_search(&self.ann_type).is_none() {
            return Err(UmapError::invalid(
                "ann_type",
                format!(
                    "expected `exact`, `hnsw` or `nndescent`, got `{}`",
                    self.ann_type
                ),
            ));
        }
        if parse_dist_metric(&self.nn_params.dist_metric).is_none() {
            return Err(UmapError::invalid(
                "dist_metric",
                format!(
                    "expected `euclidean` or `cosine`, got `{}`",
                    self.nn_params.dist_metric
                ),
            ));
        }

        Ok(())
    }
}

///////////////
// Estimator //
///////////////

/// State produced by `fit`
///
/// ### Fields
///
/// * `index` - Training points, searchable for `transform`
/// * `graph` - Fuzzy simplicial set of the training points
/// * `embedding` - Training embedding, `[n_samples][n_components]`
/// * `a` - Curve parameter in use
/// * `b` - Curve parameter in use
/// * `n_neighbors` - Effective neighbourhood size (after truncation)
/// * `seed` - Seed in use
#[derive(Debug)]
struct FittedUmap<T>
where
    T: Float + FromPrimitive + Send + Sync + Sum + SimdDistance,
{
    index: NeighbourIndex<T>,
    graph: SparseGraph<T>,
    embedding: Vec<Vec<T>>,
    a: T,
    b: T,
    n_neighbors: usize,
    seed: u64,
}

/// UMAP estimator
///
/// Learns an embedding of the training data via `fit` and places new points
/// into it via `transform`.
///
/// ### Example
///
/// ```ignore
/// use faer::Mat;
/// let data = Mat::from_fn(500, 10, |_, _| rand::random::<f64>());
/// let params = UmapParams {
///     random_state: Some(42),
///     ..UmapParams::default()
/// };
/// let mut model = Umap::new(params);
/// let embedding = model.fit_transform(data.as_ref())?;
/// ```
#[derive(Debug)]
pub struct Umap<T>
where
    T: Float + FromPrimitive + Send + Sync + Sum + SimdDistance,
{
    params: UmapParams<T>,
    fitted: Option<FittedUmap<T>>,
}

impl<T> Umap<T>
where
    T: Float
        + FromPrimitive
        + ToPrimitive
        + Send
        + Sync
        + Default
        + Sum
        + AddAssign
        + SubAssign
        + Debug
        + SimdDistance,
    HnswIndex<T>: HnswState<T>,
    NNDescent<T>: ApplySortedUpdates<T> + NNDescentQuery<T>,
{
    /// Generate a new, unfitted estimator
    pub fn new(params: UmapParams<T>) -> Self {
        Self {
            params,
            fitted: None,
        }
    }

    /// The parameters of the estimator
    pub fn params(&self) -> &UmapParams<T> {
        &self.params
    }

    /// Was `fit` run successfully
    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn state(&self) -> Result<&FittedUmap<T>> {
        self.fitted.as_ref().ok_or(UmapError::NotFitted)
    }

    /// Training embedding (samples × `n_components`)
    pub fn embedding(&self) -> Result<Mat<T>> {
        let state = self.state()?;
        Ok(rows_to_matrix(&state.embedding, self.params.n_components))
    }

    /// Fuzzy simplicial set of the training data
    pub fn graph(&self) -> Result<&SparseGraph<T>> {
        Ok(&self.state()?.graph)
    }

    /// Curve parameters `(a, b)` used by the layout
    pub fn ab_params(&self) -> Result<(T, T)> {
        let state = self.state()?;
        Ok((state.a, state.b))
    }

    /// Curve parameters from the settings
    fn resolve_ab(&self) -> (T, T) {
        match (self.params.a, self.params.b) {
            (Some(a), Some(b)) => (a, b),
            _ => find_ab_params(self.params.spread, self.params.min_dist),
        }
    }

    /// Fit the embedding
    ///
    /// Builds the fuzzy simplicial set of `data`, initialises the layout and
    /// optimises it. A previous fit is replaced.
    ///
    /// ### Params
    ///
    /// * `data` - Training data (samples × features)
    ///
    /// ### Returns
    ///
    /// The fitted estimator
    pub fn fit(&mut self, data: MatRef<T>) -> Result<&mut Self> {
        self.params.validate()?;

        let n = data.nrows();
        if n == 0 || data.ncols() == 0 {
            return Err(UmapError::EmptyInput);
        }
        check_finite(data)?;

        let params = &self.params;
        let seed = params.random_state.unwrap_or_else(rand::random);
        let (a, b) = self.resolve_ab();
        let n_comp = params.n_components;

        if params.verbose {
            info!(
                "Running UMAP on {} samples with a: {:.4?} and b: {:.4?}",
                n.separate_with_underscores(),
                a,
                b
            );
        }

        if n == 1 {
            warn!("A single sample was passed to fit; it is embedded at the origin.");
            let (graph, index) = construct_umap_graph(data, 1, params, 0, seed)?;
            self.fitted = Some(FittedUmap {
                index,
                graph,
                embedding: vec![vec![T::zero(); n_comp]],
                a,
                b,
                n_neighbors: 1,
                seed,
            });
            return Ok(self);
        }

        let n_neighbors = if n <= params.n_neighbors {
            warn!(
                "n_neighbors ({}) is not smaller than the number of samples ({}); using {} instead.",
                params.n_neighbors,
                n,
                n - 1
            );
            n - 1
        } else {
            params.n_neighbors
        };

        let n_epochs = params.n_epochs.unwrap_or(if n <= SMALL_DATA_LIMIT {
            500
        } else {
            200
        });

        let (graph, index) = construct_umap_graph(data, n_neighbors, params, n_epochs, seed)?;

        let init_type = parse_initialisation(&params.init, None)
            .ok_or_else(|| UmapError::invalid("init", format!("unknown `{}`", params.init)))?;

        if params.verbose {
            info!(
                "Initialising embedding via {} layout...",
                match init_type {
                    EmbdInit::SpectralInit { .. } => "spectral",
                    EmbdInit::RandomInit { .. } => "random",
                }
            );
        }

        let start_layout = Instant::now();

        let mut embd = initialise_embedding(&init_type, n_comp, seed, &graph);
        let graph_adj = coo_to_adjacency_list(&graph);

        let optim_params = UmapOptimParams {
            a,
            b,
            lr: params.learning_rate,
            gamma: params.repulsion_strength,
            n_epochs,
            neg_sample_rate: params.negative_sample_rate,
        };

        if params.verbose {
            info!(
                "Optimising embedding via SGD ({} epochs) on {} edges...",
                n_epochs,
                graph.get_size().separate_with_underscores()
            );
        }

        optimise_embedding_sgd(
            &mut embd,
            None,
            &graph_adj,
            &optim_params,
            seed,
            params.verbose,
        );

        if params.verbose {
            info!(
                "Initialised and optimised embedding in: {:.2?}.",
                start_layout.elapsed()
            );
        }

        self.fitted = Some(FittedUmap {
            index,
            graph,
            embedding: embd,
            a,
            b,
            n_neighbors,
            seed,
        });

        Ok(self)
    }

    /// Fit the embedding and return it
    ///
    /// ### Params
    ///
    /// * `data` - Training data (samples × features)
    ///
    /// ### Returns
    ///
    /// The embedding (samples × `n_components`)
    pub fn fit_transform(&mut self, data: MatRef<T>) -> Result<Mat<T>> {
        self.fit(data)?;
        self.embedding()
    }

    /// Place new points into the fitted embedding
    ///
    /// The new points are connected to their nearest training points with the
    /// same membership kernel as the training graph (one less locally
    /// connected neighbour), start at the weighted mean of their neighbours'
    /// positions and are then optimised against the fixed training embedding.
    ///
    /// ### Params
    ///
    /// * `data` - New data (samples × features), same features as in `fit`
    ///
    /// ### Returns
    ///
    /// Embedding of the new points (samples × `n_components`)
    pub fn transform(&self, data: MatRef<T>) -> Result<Mat<T>> {
        let state = self.state()?;
        let params = &self.params;
        let n_comp = params.n_components;

        let expected = state.index.n_features();
        if data.ncols() != expected {
            return Err(UmapError::DimensionMismatch {
                expected,
                actual: data.ncols(),
            });
        }
        let n_new = data.nrows();
        if n_new == 0 {
            return Err(UmapError::EmptyInput);
        }
        check_finite(data)?;

        let start = Instant::now();

        let k = state.n_neighbors.min(state.index.n_samples()).max(1);
        let (knn_indices, knn_dist) = state.index.query(data, k, params.transform_queue_size);

        let local_connectivity = (params.local_connectivity - T::one()).max(T::zero());
        let (sigma, rho) = smooth_knn_dist(
            &knn_dist,
            k,
            local_connectivity,
            params.graph_params.tolerance,
            params.graph_params.n_iter,
        );

        let graph = knn_to_bipartite_coo(&knn_indices, &knn_dist, &sigma, &rho);
        let mut embd = transform_init(&coo_to_adjacency_list(&graph), &state.embedding, n_comp);

        let n_epochs = match params.n_epochs {
            Some(e) => e / 3,
            None if n_new <= SMALL_DATA_LIMIT => 100,
            None => 30,
        };

        let graph = filter_weak_edges(graph, n_epochs, params.verbose);
        let graph_adj = coo_to_adjacency_list(&graph);

        let optim_params = UmapOptimParams {
            a: state.a,
            b: state.b,
            lr: params.learning_rate / T::from_f64(4.0).unwrap(),
            gamma: params.repulsion_strength,
            n_epochs,
            neg_sample_rate: params.negative_sample_rate,
        };

        optimise_embedding_sgd(
            &mut embd,
            Some(&state.embedding),
            &graph_adj,
            &optim_params,
            state.seed,
            params.verbose,
        );

        if params.verbose {
            info!(
                "Transformed {} samples in {:.2?}.",
                n_new.separate_with_underscores(),
                start.elapsed()
            );
        }

        Ok(rows_to_matrix(&embd, n_comp))
    }
}

/// Run UMAP dimensionality reduction
///
/// Shorthand for `Umap::new(params.clone()).fit_transform(data)`.
///
/// ### Params
///
/// * `data` - Input data matrix (samples × features)
/// * `params` - The UMAP parameters
///
/// ### Returns
///
/// Embedding coordinates (samples × `n_components`)
pub fn umap<T>(data: MatRef<T>, params: &UmapParams<T>) -> Result<Mat<T>>
where
    T: Float
        + FromPrimitive
        + ToPrimitive
        + Send
        + Sync
        + Default
        + Sum
        + AddAssign
        + SubAssign
        + Debug
        + SimdDistance,
    HnswIndex<T>: HnswState<T>,
    NNDescent<T>: ApplySortedUpdates<T> + NNDescentQuery<T>,
{
    Umap::new(params.clone()).fit_transform(data)
}

///////////
// Tests //
///////////
