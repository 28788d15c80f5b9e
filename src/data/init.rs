use num_traits::{Float, FromPrimitive, ToPrimitive};
use rand::{
    rngs::StdRng,
    {Rng, SeedableRng},
};
use rand_distr::StandardNormal;
use std::iter::Sum;

use crate::data::structures::*;
use crate::utils::math::*;

// Initial ranges for the embeddings
pub const SPECTRAL_RANGE: f64 = 10.0;
pub const RANDOM_RANGE: f64 = 10.0;

/////////////
// Helpers //
/////////////

/// Different initialisation methods for the UMAP
#[derive(Clone, Debug)]
pub enum EmbdInit<T> {
    /// Spectral initialisation
    SpectralInit { range: Option<T> },
    /// Random initialisation
    RandomInit { range: Option<T> },
}

/// Parse the respective initialisation
///
/// ### Params
///
/// * `s` - String that defines the initialisation method, `"spectral"` or
///   `"random"` (case-insensitive)
/// * `range` - Optional range the initial coordinates are scaled to
///
/// ### Returns
///
/// The Option of a EmbdInit
pub fn parse_initialisation<T>(s: &str, range: Option<T>) -> Option<EmbdInit<T>>
where
    T: Float,
{
    match s.to_lowercase().as_str() {
        "spectral" => Some(EmbdInit::SpectralInit { range }),
        "random" => Some(EmbdInit::RandomInit { range }),
        _ => None,
    }
}

//////////////
// Spectral //
//////////////

/// Convert COO graph to the symmetric normalised adjacency in CSR format
///
/// Computes `M = D^(-1/2) * A * D^(-1/2)`. The eigenvectors belonging to the
/// largest eigenvalues of `M` are the eigenvectors of the smallest eigenvalues
/// of the normalised Laplacian `I - M`.
///
/// ### Params
///
/// * `graph` - Symmetric weighted graph in COO format
///
/// ### Returns
///
/// Normalised adjacency as CSR matrix
fn graph_to_normalised_adjacency<T>(graph: &SparseGraph<T>) -> CompressedSparseData<f64>
where
    T: Float,
{
    let n = graph.n_vertices;

    let mut degrees = vec![0.0; n];
    for (&i, &w) in graph.row_indices.iter().zip(&graph.values) {
        degrees[i] += w.to_f64().unwrap_or(0.0);
    }

    // isolated vertices get a zero row
    let d_inv_sqrt: Vec<f64> = degrees
        .iter()
        .map(|&d| if d > 1e-8 { 1.0 / d.sqrt() } else { 0.0 })
        .collect();

    let mut scaled = SparseGraph::empty(n);
    for (i, j, w) in graph.to_edge_list() {
        if i != j {
            scaled.row_indices.push(i);
            scaled.col_indices.push(j);
            scaled
                .values
                .push(d_inv_sqrt[i] * w.to_f64().unwrap_or(0.0) * d_inv_sqrt[j]);
        }
    }

    coo_to_csr(&scaled)
}

/// Vertex sets of the connected components
///
/// Edge direction is ignored. Components come out ordered by their lowest
/// vertex, and each component lists its vertices in ascending order.
///
/// ### Params
///
/// * `graph` - Graph in COO format
///
/// ### Returns
///
/// One vector of vertex indices per component
fn connected_components<T>(graph: &SparseGraph<T>) -> Vec<Vec<usize>>
where
    T: Float,
{
    const UNLABELLED: usize = usize::MAX;

    let n = graph.n_vertices;
    let mut neighbours: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (&i, &j) in graph.row_indices.iter().zip(&graph.col_indices) {
        if i != j {
            neighbours[i].push(j);
            neighbours[j].push(i);
        }
    }

    let mut label = vec![UNLABELLED; n];
    let mut n_labels = 0;
    let mut stack = Vec::new();

    for root in 0..n {
        if label[root] != UNLABELLED {
            continue;
        }
        label[root] = n_labels;
        stack.push(root);

        while let Some(v) = stack.pop() {
            for &u in &neighbours[v] {
                if label[u] == UNLABELLED {
                    label[u] = n_labels;
                    stack.push(u);
                }
            }
        }
        n_labels += 1;
    }

    let mut components = vec![Vec::new(); n_labels];
    for (v, &l) in label.iter().enumerate() {
        components[l].push(v);
    }
    components
}

/// Anchor position of one component in a disconnected layout
///
/// With two or more dimensions the anchors sit evenly spaced on a circle in
/// the first two axes; further axes get a small random offset. In one
/// dimension they are spread over `[-radius, radius]`.
fn component_anchor<T>(
    idx: usize,
    n_components: usize,
    n_comp: usize,
    radius: T,
    rng: &mut StdRng,
) -> Vec<T>
where
    T: Float + FromPrimitive,
{
    let mut anchor = vec![T::zero(); n_comp];

    if n_comp == 1 {
        let pos = 2.0 * idx as f64 / n_components.max(2) as f64 - 1.0;
        anchor[0] = radius * T::from_f64(pos).unwrap();
        return anchor;
    }

    let angle = std::f64::consts::TAU * idx as f64 / n_components as f64;
    anchor[0] = radius * T::from_f64(angle.cos()).unwrap();
    anchor[1] = radius * T::from_f64(angle.sin()).unwrap();
    for a in anchor.iter_mut().skip(2) {
        *a = radius * T::from_f64(rng.random_range(-0.1..0.1)).unwrap();
    }
    anchor
}

/// Spectral layout of a graph made of several components
///
/// Every component is laid out on its own around its anchor (see
/// `component_anchor`), at 60% of `range` from the origin and with a spread
/// of 30% of `range`. Components too small for an eigendecomposition are a
/// tight Gaussian cloud around the anchor.
///
/// ### Params
///
/// * `graph` - Full graph in COO format
/// * `components` - Vertex sets as returned by `connected_components`
/// * `n_comp` - Dimensionality of the embedding
/// * `seed` - Random seed
/// * `range` - Scale of the whole layout
///
/// ### Returns
///
/// Embedding coordinates for all vertices of `graph`
fn layout_components<T>(
    graph: &SparseGraph<T>,
    components: &[Vec<usize>],
    n_comp: usize,
    seed: u64,
    range: T,
) -> Vec<Vec<T>>
where
    T: Float + FromPrimitive + Send + Sync + Sum,
{
    let mut rng = StdRng::seed_from_u64(seed);
    let radius = range * T::from_f64(0.6).unwrap();
    let spread = range * T::from_f64(0.3).unwrap();
    let cloud_sd = spread * T::from_f64(0.1).unwrap();

    let mut embedding = vec![vec![T::zero(); n_comp]; graph.n_vertices];

    for (idx, members) in components.iter().enumerate() {
        let anchor = component_anchor(idx, components.len(), n_comp, radius, &mut rng);

        if members.len() <= n_comp + 1 {
            for &v in members {
                for (x, &c) in embedding[v].iter_mut().zip(&anchor) {
                    let z: f64 = rng.sample(StandardNormal);
                    *x = c + T::from_f64(z).unwrap() * cloud_sd;
                }
            }
            continue;
        }

        let local = single_component_spectral(
            &component_subgraph(graph, members),
            n_comp,
            seed.wrapping_add(idx as u64),
            spread,
        );
        for (&v, offset) in members.iter().zip(&local) {
            for d in 0..n_comp {
                embedding[v][d] = anchor[d] + offset[d];
            }
        }
    }

    embedding
}

/// Restrict a graph to the given vertices
///
/// Vertices are renumbered by their position in `members`; edges leaving the
/// set are dropped.
///
/// ### Params
///
/// * `graph` - Full graph in COO format
/// * `members` - Vertices to keep
///
/// ### Returns
///
/// Graph over `members.len()` vertices
fn component_subgraph<T>(graph: &SparseGraph<T>, members: &[usize]) -> SparseGraph<T>
where
    T: Float,
{
    const OUTSIDE: usize = usize::MAX;

    let mut position = vec![OUTSIDE; graph.n_vertices];
    for (local, &v) in members.iter().enumerate() {
        position[v] = local;
    }

    let mut sub = SparseGraph::empty(members.len());
    for (i, j, w) in graph.to_edge_list() {
        let (li, lj) = (position[i], position[j]);
        if li != OUTSIDE && lj != OUTSIDE {
            sub.row_indices.push(li);
            sub.col_indices.push(lj);
            sub.values.push(w);
        }
    }
    sub
}

/// Uniform random coordinates in `[-1, 1]`
fn uniform_unit<T>(n: usize, n_comp: usize, seed: u64) -> Vec<Vec<T>>
where
    T: Float + FromPrimitive,
{
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            (0..n_comp)
                .map(|_| T::from_f64(rng.random_range(-1.0..1.0)).unwrap())
                .collect()
        })
        .collect()
}

/// Perform spectral embedding for a single connected component
///
/// Uses the eigenvectors 1 to `n_comp` of the normalised adjacency (sorted
/// by decreasing eigenvalue; eigenvector 0 is the trivial one). Falls back
/// to random coordinates for trivially small graphs or when the eigensolver
/// fails.
///
/// ### Params
///
/// * `graph` - Connected graph in COO format
/// * `n_comp` - Number of embedding dimensions
/// * `seed` - Random seed
/// * `range` - Scaling range for embedding
///
/// ### Returns
///
/// Initial embedding coordinates
fn single_component_spectral<T>(
    graph: &SparseGraph<T>,
    n_comp: usize,
    seed: u64,
    range: T,
) -> Vec<Vec<T>>
where
    T: Float + FromPrimitive + Send + Sync + Sum,
{
    let n = graph.n_vertices;

    if n <= n_comp + 1 {
        let embedding = uniform_unit(n, n_comp, seed);
        return centre_scale_jitter(embedding, n_comp, range, seed);
    }

    let adjacency = graph_to_normalised_adjacency(graph);
    let n_eigs = (n_comp + 1).min(n);

    let Some((_, evecs)) = compute_largest_eigenpairs_lanczos(&adjacency, n_eigs, seed) else {
        let embedding = uniform_unit(n, n_comp, seed);
        return centre_scale_jitter(embedding, n_comp, range, seed);
    };

    let mut embedding = vec![vec![T::zero(); n_comp]; n];

    for comp_idx in 0..n_comp {
        let evec_idx = comp_idx + 1;
        if evec_idx < evecs[0].len() {
            for i in 0..n {
                embedding[i][comp_idx] = T::from_f64(evecs[i][evec_idx]).unwrap();
            }
        } else {
            // Krylov space exhausted before enough eigenvectors were found
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(comp_idx as u64));
            for row in embedding.iter_mut() {
                row[comp_idx] = T::from_f64(rng.random_range(-1.0..1.0)).unwrap();
            }
        }
    }

    centre_scale_jitter(embedding, n_comp, range, seed)
}

/// Centre, rescale and jitter a raw layout
///
/// Every axis is shifted to mean zero, then all coordinates are scaled so
/// the largest absolute value equals `range` (left alone if the layout is
/// all zeros). Gaussian noise with sd `1e-4` keeps points from starting on
/// top of each other.
///
/// ### Params
///
/// * `embedding` - Raw coordinates
/// * `n_comp` - Dimensionality of the embedding
/// * `range` - Largest absolute coordinate after scaling
/// * `seed` - Random seed; the noise stream uses `seed + 9999`
///
/// ### Returns
///
/// The adjusted coordinates
fn centre_scale_jitter<T>(
    mut embedding: Vec<Vec<T>>,
    n_comp: usize,
    range: T,
    seed: u64,
) -> Vec<Vec<T>>
where
    T: Float + FromPrimitive + Sum,
{
    if embedding.is_empty() {
        return embedding;
    }
    let n = T::from_usize(embedding.len()).unwrap();

    let means: Vec<T> = (0..n_comp)
        .map(|d| embedding.iter().map(|row| row[d]).sum::<T>() / n)
        .collect();

    let mut max_abs = T::zero();
    for row in embedding.iter_mut() {
        for (x, &m) in row.iter_mut().zip(&means) {
            *x = *x - m;
            max_abs = max_abs.max(x.abs());
        }
    }

    let scale = if max_abs > T::from_f64(1e-8).unwrap() {
        range / max_abs
    } else {
        T::one()
    };

    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(9999));
    let noise_sd = T::from_f64(1e-4).unwrap();

    for x in embedding.iter_mut().flatten() {
        let z: f64 = rng.sample(StandardNormal);
        *x = *x * scale + T::from_f64(z).unwrap() * noise_sd;
    }

    embedding
}

/// Compute spectral layout initialisation for graph
///
/// Uses the spectral decomposition of the normalised graph to initialise the
/// embedding coordinates. Disconnected graphs are handled by placing the
/// components separately and performing spectral embedding within each.
///
/// ### Params
///
/// * `graph` - Symmetric weighted graph in COO format
/// * `n_comp` - Number of embedding dimensions
/// * `seed` - Random seed for reproducibility
/// * `range` - Optional scaling range (defaults to SPECTRAL_RANGE)
///
/// ### Returns
///
/// Initial embedding coordinates for each vertex
pub fn spectral_layout<T>(
    graph: &SparseGraph<T>,
    n_comp: usize,
    seed: u64,
    range: Option<T>,
) -> Vec<Vec<T>>
where
    T: Float + FromPrimitive + Send + Sync + Sum,
{
    let range = range.unwrap_or(T::from_f64(SPECTRAL_RANGE).unwrap());

    let components = connected_components(graph);

    if components.len() > 1 {
        return layout_components(graph, &components, n_comp, seed, range);
    }

    single_component_spectral(graph, n_comp, seed, range)
}

////////////
// Random //
////////////

/// Random initialisation
///
/// Uniform distribution in `[-range, range]`.
///
/// ### Params
///
/// * `n_samples` - Number of samples to initialise
/// * `n_comp` - Dimensionality of the embedding
/// * `seed` - Random seed
/// * `range` - Optional range (defaults to RANDOM_RANGE)
///
/// ### Returns
///
/// Random embedding coordinates
pub fn random_layout<T>(n_samples: usize, n_comp: usize, seed: u64, range: Option<T>) -> Vec<Vec<T>>
where
    T: Float + FromPrimitive + ToPrimitive,
{
    let range = range
        .and_then(|r| r.to_f64())
        .unwrap_or(RANDOM_RANGE);
    let mut rng = StdRng::seed_from_u64(seed);

    (0..n_samples)
        .map(|_| {
            (0..n_comp)
                .map(|_| T::from_f64(rng.random_range(-range..=range)).unwrap())
                .collect()
        })
        .collect()
}

///////////////
// Transform //
///////////////

/// Initial positions for new points from their training neighbours
///
/// Each new point starts at the weighted mean of the embeddings of the
/// training points it is connected to, with the weights normalised to sum to
/// one. All-zero weights fall back to the plain mean and a point without any
/// edge starts at the origin.
///
/// ### Params
///
/// * `graph` - Adjacency list of the new points into the training points
/// * `train_embedding` - Embedding of the training points
/// * `n_comp` - Dimensionality of the embedding
///
/// ### Returns
///
/// Initial embedding of the new points
pub fn transform_init<T>(
    graph: &[Vec<(usize, T)>],
    train_embedding: &[Vec<T>],
    n_comp: usize,
) -> Vec<Vec<T>>
where
    T: Float,
{
    graph
        .iter()
        .map(|edges| {
            let mut point = vec![T::zero(); n_comp];
            if edges.is_empty() {
                return point;
            }
            let total = edges.iter().fold(T::zero(), |acc, &(_, w)| acc + w);
            let uniform = total <= T::zero();
            let n_edges = T::from(edges.len()).unwrap();
            for &(j, w) in edges {
                let w_norm = if uniform { T::one() / n_edges } else { w / total };
                for (p, &e) in point.iter_mut().zip(&train_embedding[j]) {
                    *p = *p + w_norm * e;
                }
            }
            point
        })
        .collect()
}

//////////
// Main //
//////////

/// Wrapper function to initialise the embedding
///
/// ### Params
///
/// * `init_method` - Which method to use
/// * `n_comp` - Number of dimensions
/// * `seed` - Random seed
/// * `graph` - Fuzzy simplicial set graph (required for spectral init)
///
/// ### Returns
///
/// Initial embedding coordinates as `Vec<Vec<T>>` where the outer vector is
/// samples and the inner vector is components
pub fn initialise_embedding<T>(
    init_method: &EmbdInit<T>,
    n_comp: usize,
    seed: u64,
    graph: &SparseGraph<T>,
) -> Vec<Vec<T>>
where
    T: Float + FromPrimitive + Send + Sync + Sum + ToPrimitive,
{
    match init_method {
        EmbdInit::SpectralInit { range } => spectral_layout(graph, n_comp, seed, *range),
        EmbdInit::RandomInit { range } => random_layout(graph.n_vertices, n_comp, seed, *range),
    }
}

///////////
// Tests //
///////////
