use log::debug;
use num_traits::{Float, FromPrimitive};
use rand::{
    rngs::SmallRng,
    {Rng, SeedableRng},
};
use std::ops::{AddAssign, SubAssign};

/////////////
// Globals //
/////////////

/// Number of points sampled for the curve fit
const CURVE_FIT_POINTS: usize = 300;
/// Maximum number of Levenberg-Marquardt steps
const CURVE_FIT_MAX_ITER: usize = 500;

//////////////////////////
// Structures and Enums //
//////////////////////////

/// UMAP optimisation parameters
///
/// ### Fields
///
/// * `a` - Curve parameter of the low-dimensional similarity (about 1.58 for
///   `min_dist = 0.1`)
/// * `b` - Curve parameter of the low-dimensional similarity (about 0.90 for
///   `min_dist = 0.1`)
/// * `lr` - Initial learning rate (typically 1.0)
/// * `gamma` - Weight of the repulsive force
/// * `n_epochs` - Number of optimisation epochs (typically 500)
/// * `neg_sample_rate` - Number of negative samples per positive edge
///   (typically 5)
#[derive(Clone, Debug)]
pub struct UmapOptimParams<T> {
    pub a: T,
    pub b: T,
    pub lr: T,
    pub gamma: T,
    pub n_epochs: usize,
    pub neg_sample_rate: usize,
}

impl<T> UmapOptimParams<T>
where
    T: Float + FromPrimitive,
{
    /// Default parameters for 2D embedding
    ///
    /// ### Returns
    ///
    /// Self with the curve fitted to `min_dist = 0.1` and `spread = 1.0`
    pub fn default_2d() -> Self {
        Self {
            a: T::from_f64(1.577).unwrap(),
            b: T::from_f64(0.8951).unwrap(),
            lr: T::one(),
            gamma: T::one(),
            n_epochs: 500,
            neg_sample_rate: 5,
        }
    }

    /// Params from specified minimum distance and spread
    ///
    /// ### Params
    ///
    /// * `min_dist` - Minimum distance parameter
    /// * `spread` - Effective scale of embedded points
    /// * `lr` - Initial learning rate
    /// * `gamma` - Repulsion strength
    /// * `n_epochs` - Number of optimisation epochs (typically 500)
    /// * `neg_sample_rate` - Number of negative samples per positive edge
    ///   (typically 5)
    ///
    /// ### Return
    ///
    /// Self with `a` and `b` fitted via [`find_ab_params`]
    pub fn from_min_dist_spread(
        min_dist: T,
        spread: T,
        lr: Option<T>,
        gamma: Option<T>,
        n_epochs: Option<usize>,
        neg_sample_rate: Option<usize>,
    ) -> Self {
        let (a, b) = find_ab_params(spread, min_dist);
        Self {
            a,
            b,
            lr: lr.unwrap_or(T::one()),
            gamma: gamma.unwrap_or(T::one()),
            n_epochs: n_epochs.unwrap_or(500),
            neg_sample_rate: neg_sample_rate.unwrap_or(5),
        }
    }
}

impl<T> Default for UmapOptimParams<T>
where
    T: Float + FromPrimitive,
{
    /// Returns sensible defaults for the optimiser (assuming 2D)
    fn default() -> Self {
        UmapOptimParams::default_2d()
    }
}

/// Precomputed constants to avoid repeated calculations
///
/// ### Fields
///
/// * `a` - The a parameter.
/// * `b` - The b parameter.
/// * `two_a_b` - The product of `2 * a * b`.
/// * `two_gamma_b` - The product of `2 * gamma * b`.
/// * `clip_val` - The clipping value, i.e., `4.0`.
/// * `eps` - Offset of the squared distance in the repulsive force
struct OptimConstants<T> {
    a: T,
    b: T,
    two_a_b: T,
    two_gamma_b: T,
    clip_val: T,
    eps: T,
}

impl<T: Float + FromPrimitive> OptimConstants<T> {
    /// Generate all of the constants
    ///
    /// ### Params
    ///
    /// * `a` - The a parameter
    /// * `b` - The b parameter
    /// * `gamma` - The repulsion parameter. Usually defaults to `1.0`.
    ///
    /// ### Returns
    ///
    /// Self with all pre-calculated values.
    fn new(a: T, b: T, gamma: T) -> Self {
        let two = T::from_f64(2.0).unwrap();
        Self {
            a,
            b,
            two_a_b: two * a * b,
            two_gamma_b: two * gamma * b,
            clip_val: T::from_f64(4.0).unwrap(),
            eps: T::from_f64(0.001).unwrap(),
        }
    }

    #[inline(always)]
    fn clip(&self, x: T) -> T {
        x.max(-self.clip_val).min(self.clip_val)
    }
}

/////////////
// Helpers //
/////////////

#[inline(always)]
fn fast_pow<T: Float>(x: T, b: T, b_is_one: bool, b_is_half: bool) -> T {
    if b_is_one {
        x
    } else if b_is_half {
        x.sqrt()
    } else {
        x.powf(b)
    }
}

/// Sum of squared residuals of the curve `1 / (1 + a * x^(2b))`
fn curve_cost(xv: &[f64], yv: &[f64], a: f64, b: f64) -> f64 {
    xv.iter()
        .zip(yv)
        .map(|(&x, &y)| {
            let r = 1.0 / (1.0 + a * x.powf(2.0 * b)) - y;
            r * r
        })
        .sum()
}

/// Fit the curve parameters `a` and `b` from `spread` and `min_dist`
///
/// Least-squares fit (Levenberg-Marquardt, starting from `a = b = 1`) of
/// `f(x) = 1 / (1 + a * x^(2b))` to the target
///
/// * `1` for `x < min_dist`
/// * `exp(-(x - min_dist) / spread)` otherwise
///
/// over 300 evenly spaced points in `[0, 3 * spread]`.
///
/// ### Params
///
/// * `spread` - Effective scale of embedded points
/// * `min_dist` - Minimum distance between embedded points
///
/// ### Returns
///
/// Tuple of `(a, b)`; `(1.0, 0.1)` gives roughly `(1.577, 0.895)`
pub fn find_ab_params<T>(spread: T, min_dist: T) -> (T, T)
where
    T: Float + FromPrimitive,
{
    let spread = spread.to_f64().unwrap_or(1.0);
    let min_dist = min_dist.to_f64().unwrap_or(0.1);

    let max_x = 3.0 * spread;
    let step = max_x / (CURVE_FIT_POINTS - 1) as f64;

    let xv: Vec<f64> = (0..CURVE_FIT_POINTS).map(|i| step * i as f64).collect();
    let yv: Vec<f64> = xv
        .iter()
        .map(|&x| {
            if x < min_dist {
                1.0
            } else {
                (-(x - min_dist) / spread).exp()
            }
        })
        .collect();

    let (mut a, mut b) = (1.0f64, 1.0f64);
    let mut lambda = 1e-3;
    let mut cost = curve_cost(&xv, &yv, a, b);

    for _ in 0..CURVE_FIT_MAX_ITER {
        // normal equations J^T J and J^T r of the 2-parameter problem
        let (mut jaa, mut jab, mut jbb) = (0.0, 0.0, 0.0);
        let (mut ga, mut gb) = (0.0, 0.0);

        for (&x, &y) in xv.iter().zip(&yv) {
            if x <= 0.0 {
                // f(0) = 1 regardless of a and b
                continue;
            }
            let x_2b = x.powf(2.0 * b);
            let denom = 1.0 + a * x_2b;
            let r = 1.0 / denom - y;

            let d_a = -x_2b / (denom * denom);
            let d_b = -2.0 * a * x_2b * x.ln() / (denom * denom);

            jaa += d_a * d_a;
            jab += d_a * d_b;
            jbb += d_b * d_b;
            ga += d_a * r;
            gb += d_b * r;
        }

        let mut accepted = false;
        while lambda < 1e12 {
            let m_aa = jaa * (1.0 + lambda);
            let m_bb = jbb * (1.0 + lambda);
            let det = m_aa * m_bb - jab * jab;
            if det.abs() < f64::MIN_POSITIVE {
                lambda *= 10.0;
                continue;
            }

            let delta_a = -(m_bb * ga - jab * gb) / det;
            let delta_b = -(m_aa * gb - jab * ga) / det;
            let (new_a, new_b) = (a + delta_a, b + delta_b);

            if new_a > 0.0 && new_b > 0.0 {
                let new_cost = curve_cost(&xv, &yv, new_a, new_b);
                if new_cost <= cost {
                    let converged = (delta_a.abs() < 1e-10 * (1.0 + a.abs()))
                        && (delta_b.abs() < 1e-10 * (1.0 + b.abs()));
                    a = new_a;
                    b = new_b;
                    cost = new_cost;
                    lambda = (lambda / 10.0).max(1e-12);
                    accepted = !converged;
                    break;
                }
            }
            lambda *= 10.0;
        }

        if !accepted {
            break;
        }
    }

    (T::from_f64(a).unwrap(), T::from_f64(b).unwrap())
}

////////////////
// Optimisers //
////////////////

/// Optimise UMAP embedding using Stochastic Gradient Descent (SGD)
///
/// Implements the standard UMAP optimisation procedure using SGD with:
///
/// - Adaptive edge sampling based on edge weights (higher weights sampled more
///   frequently)
/// - Negative sampling for repulsive forces
/// - Linear learning rate decay schedule
/// - Per-vertex RNG state for reproducible negative sampling
///
/// ### Algorithm
///
/// For each epoch:
///
/// 1. Process edges whose `epoch_of_next_sample` has arrived
/// 2. Apply attractive force between connected vertices
/// 3. Perform negative sampling: randomly select tail vertices and apply
///    repulsive forces to the head vertex
/// 4. Update sampling schedules
///
/// ### Params
///
/// * `head` - Embedding coordinates of the vertices that own the edges
///   (modified in place), shape `[n_samples][n_dim]`
/// * `tail` - Fixed embedding the edges point into. `None` means the edges
///   point back into `head`, in which case both ends of an edge move (fit).
///   With `Some`, only the head vertices move (transform).
/// * `graph` - Adjacency list where `graph[i]` contains
///   `(tail_index, weight)` pairs
/// * `params` - Optimisation parameters (n_epochs, lr, a, b, gamma,
///   neg_sample_rate)
/// * `seed` - Random seed for negative sampling reproducibility
/// * `verbose` - Controls verbosity
pub fn optimise_embedding_sgd<T>(
    head: &mut [Vec<T>],
    tail: Option<&[Vec<T>]>,
    graph: &[Vec<(usize, T)>],
    params: &UmapOptimParams<T>,
    seed: u64,
    verbose: bool,
) where
    T: Float + FromPrimitive + AddAssign + SubAssign,
{
    let n = head.len();
    if n == 0 || params.n_epochs == 0 {
        return;
    }
    let n_dim = head[0].len();
    let move_other = tail.is_none();

    let mut head_flat: Vec<T> = head.iter().flatten().copied().collect();
    let tail_flat: Vec<T> = tail
        .map(|t| t.iter().flatten().copied().collect())
        .unwrap_or_default();
    let n_tail = tail.map_or(n, |t| t.len());
    if n_tail == 0 {
        return;
    }

    let consts = OptimConstants::new(params.a, params.b, params.gamma);

    let zero = T::zero();
    let one = T::one();
    let half = T::from(0.5).unwrap();
    let large_epoch = T::from(1e8).unwrap();

    // fast paths for common b values
    let b_is_one = (consts.b - one).abs() < T::from(1e-10).unwrap();
    let b_is_half = (consts.b - half).abs() < T::from(1e-10).unwrap();

    let mut edges: Vec<(usize, usize)> = Vec::new();
    let mut weights: Vec<T> = Vec::new();
    for (i, neighbours) in graph.iter().enumerate().take(n) {
        for &(j, w) in neighbours {
            edges.push((i, j));
            weights.push(w);
        }
    }

    if edges.is_empty() {
        return;
    }

    let max_weight = weights
        .iter()
        .fold(zero, |acc, &w| if w > acc { w } else { acc });

    let epochs_per_sample: Vec<T> = weights
        .iter()
        .map(|&w| {
            let norm = w / max_weight;
            if norm > zero {
                one / norm
            } else {
                large_epoch
            }
        })
        .collect();

    let mut epoch_of_next_sample: Vec<T> = epochs_per_sample.clone();

    let neg_sample_rate_t = T::from(params.neg_sample_rate.max(1)).unwrap();
    let epochs_per_neg_sample: Vec<T> = epochs_per_sample
        .iter()
        .map(|eps| *eps / neg_sample_rate_t)
        .collect();
    let mut epoch_of_next_neg_sample: Vec<T> = epochs_per_neg_sample.clone();

    let n_epochs_f = T::from(params.n_epochs).unwrap();
    let lr_schedule: Vec<T> = (0..params.n_epochs)
        .map(|e| params.lr * (one - T::from(e).unwrap() / n_epochs_f))
        .collect();

    let mut rng_states: Vec<SmallRng> = (0..n)
        .map(|i| SmallRng::seed_from_u64(seed.wrapping_add(i as u64)))
        .collect();

    let mut other = vec![zero; n_dim];

    for epoch in 0..params.n_epochs {
        let lr = lr_schedule[epoch];
        let epoch_t = T::from(epoch).unwrap();

        for (edge_idx, &(i, j)) in edges.iter().enumerate() {
            if epoch_of_next_sample[edge_idx] > epoch_t {
                continue;
            }

            let base_i = i * n_dim;
            let base_j = j * n_dim;

            for d in 0..n_dim {
                other[d] = if move_other {
                    head_flat[base_j + d]
                } else {
                    tail_flat[base_j + d]
                };
            }

            let mut dist_sq = zero;
            for d in 0..n_dim {
                let diff = head_flat[base_i + d] - other[d];
                dist_sq += diff * diff;
            }

            // attraction; coincident points exert none
            if dist_sq > zero {
                // d^(2b) once, divided by d^2 gives d^(2b - 2)
                let dist_sq_b = fast_pow(dist_sq, consts.b, b_is_one, b_is_half);
                let denom = one + consts.a * dist_sq_b;
                let grad_coeff = consts.two_a_b * dist_sq_b / (dist_sq * denom);

                for d in 0..n_dim {
                    let delta = other[d] - head_flat[base_i + d];
                    let grad_d = consts.clip(grad_coeff * delta);

                    head_flat[base_i + d] += grad_d * lr;
                    if move_other {
                        head_flat[base_j + d] -= grad_d * lr;
                    }
                }
            }

            epoch_of_next_sample[edge_idx] += epochs_per_sample[edge_idx];

            let n_neg_samples = ((epoch_t - epoch_of_next_neg_sample[edge_idx])
                / epochs_per_neg_sample[edge_idx])
                .floor()
                .to_usize()
                .unwrap_or(0);

            for _ in 0..n_neg_samples {
                let k = rng_states[i].random_range(0..n_tail);
                if move_other && k == i {
                    continue;
                }

                let base_k = k * n_dim;
                for d in 0..n_dim {
                    other[d] = if move_other {
                        head_flat[base_k + d]
                    } else {
                        tail_flat[base_k + d]
                    };
                }

                let mut dist_sq = zero;
                for d in 0..n_dim {
                    let diff = head_flat[base_i + d] - other[d];
                    dist_sq += diff * diff;
                }
                // coincident points get the largest step the clip allows
                if dist_sq <= zero {
                    for d in 0..n_dim {
                        head_flat[base_i + d] += consts.clip_val * lr;
                    }
                    continue;
                }

                let dist_sq_b = fast_pow(dist_sq, consts.b, b_is_one, b_is_half);
                let denom = (consts.eps + dist_sq) * (one + consts.a * dist_sq_b);
                let grad_coeff = consts.two_gamma_b / denom;

                for d in 0..n_dim {
                    let delta = head_flat[base_i + d] - other[d];
                    let grad_d = consts.clip(grad_coeff * delta);
                    head_flat[base_i + d] += grad_d * lr;
                }
            }

            epoch_of_next_neg_sample[edge_idx] +=
                T::from(n_neg_samples).unwrap() * epochs_per_neg_sample[edge_idx];
        }

        if verbose && ((epoch + 1) % 50 == 0 || epoch + 1 == params.n_epochs) {
            debug!(" Completed epoch {}/{}", epoch + 1, params.n_epochs);
        }
    }

    for (i, point) in head.iter_mut().enumerate() {
        let base = i * n_dim;
        point.copy_from_slice(&head_flat[base..base + n_dim]);
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod test_umap_optimiser {
    use super::*;
    use approx::assert_relative_eq;

    fn dist(a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    #[test]
    fn test_optim_params_default_2d() {
        let params = UmapOptimParams::<f64>::default_2d();

        assert_relative_eq!(params.a, 1.577, epsilon = 1e-6);
        assert_relative_eq!(params.b, 0.8951, epsilon = 1e-6);
        assert_eq!(params.lr, 1.0);
        assert_eq!(params.gamma, 1.0);
        assert_eq!(params.n_epochs, 500);
        assert_eq!(params.neg_sample_rate, 5);
    }

    #[test]
    fn test_optim_params_from_min_dist_spread() {
        let params =
            UmapOptimParams::<f64>::from_min_dist_spread(0.1, 1.0, Some(0.5), None, Some(200), None);

        assert_relative_eq!(params.a, 1.577, epsilon = 0.02);
        assert_relative_eq!(params.b, 0.895, epsilon = 0.02);
        assert_eq!(params.lr, 0.5);
        assert_eq!(params.gamma, 1.0);
        assert_eq!(params.n_epochs, 200);
        assert_eq!(params.neg_sample_rate, 5);
    }

    #[test]
    fn test_find_ab_params_reference_values() {
        let (a, b) = find_ab_params(1.0f64, 0.1);
        assert_relative_eq!(a, 1.577, epsilon = 0.02);
        assert_relative_eq!(b, 0.895, epsilon = 0.02);

        let (a, b) = find_ab_params(1.0f64, 0.0);
        assert_relative_eq!(a, 1.929, epsilon = 0.03);
        assert_relative_eq!(b, 0.7915, epsilon = 0.02);
    }

    #[test]
    fn test_find_ab_params_curve_properties() {
        let min_dist = 0.1;
        let spread = 1.0;
        let (a, b) = find_ab_params::<f32>(spread, min_dist);
        let (a, b) = (a as f64, b as f64);
        let (min_dist, spread) = (min_dist as f64, spread as f64);

        let pred_min = 1.0 / (1.0 + a * min_dist.powf(2.0 * b));
        assert!(
            pred_min > 0.9,
            "f(min_dist) = {:.3} should be > 0.9",
            pred_min
        );

        let pred_spread = 1.0 / (1.0 + a * (3.0 * spread).powf(2.0 * b));
        assert!(
            pred_spread < 0.1,
            "f(3*spread) = {:.3} should be < 0.1",
            pred_spread
        );

        let pred_mid = 1.0 / (1.0 + a * (1.5 * spread).powf(2.0 * b));
        assert!(pred_min > pred_mid && pred_mid > pred_spread);
    }

    #[test]
    fn test_larger_min_dist_flattens_curve() {
        let (a_small, _) = find_ab_params(1.0f64, 0.1);
        let (a_large, _) = find_ab_params(1.0f64, 0.8);
        // a shrinks as points are allowed to sit further apart
        assert!(a_large < a_small);
    }

    #[test]
    fn test_optimise_embedding_empty_graph() {
        let graph: Vec<Vec<(usize, f64)>> = vec![vec![], vec![]];
        let mut embd = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let original = embd.clone();

        optimise_embedding_sgd(&mut embd, None, &graph, &UmapOptimParams::default(), 42, false);

        assert_eq!(embd, original);
    }

    #[test]
    fn test_optimise_embedding_zero_epochs() {
        let graph = vec![vec![(1, 1.0)], vec![(0, 1.0)]];
        let mut embd = vec![vec![0.0, 0.0], vec![5.0, 0.0]];
        let original = embd.clone();

        let params = UmapOptimParams {
            n_epochs: 0,
            ..UmapOptimParams::default_2d()
        };
        optimise_embedding_sgd(&mut embd, None, &graph, &params, 42, false);

        assert_eq!(embd, original);
    }

    #[test]
    fn test_sgd_reproducibility() {
        let graph = vec![vec![(1, 1.0)], vec![(0, 1.0), (2, 0.5)], vec![(1, 0.5)]];
        let init = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![3.0, 1.0]];
        let mut embd1 = init.clone();
        let mut embd2 = init.clone();
        let mut embd3 = init;

        let params = UmapOptimParams {
            a: 1.0,
            b: 1.0,
            lr: 0.5,
            gamma: 1.0,
            n_epochs: 50,
            neg_sample_rate: 2,
        };

        optimise_embedding_sgd(&mut embd1, None, &graph, &params, 42, false);
        optimise_embedding_sgd(&mut embd2, None, &graph, &params, 42, false);
        optimise_embedding_sgd(&mut embd3, None, &graph, &params, 7, false);

        assert_eq!(embd1, embd2);
        assert_ne!(embd1, embd3);
    }

    #[test]
    fn test_attraction_pulls_connected_points_together() {
        let graph = vec![vec![(1, 1.0)], vec![(0, 1.0)]];
        let mut embd = vec![vec![0.0, 0.0], vec![10.0, 0.0]];

        let params = UmapOptimParams {
            n_epochs: 100,
            neg_sample_rate: 1,
            ..UmapOptimParams::default_2d()
        };
        optimise_embedding_sgd(&mut embd, None, &graph, &params, 1, false);

        assert!(dist(&embd[0], &embd[1]) < 10.0);
        for point in &embd {
            assert!(point.iter().all(|x| x.is_finite()));
        }
    }

    #[test]
    fn test_transform_mode_only_moves_head() {
        let tail = vec![vec![0.0, 0.0], vec![10.0, 10.0]];
        let graph = vec![vec![(0, 1.0)]];
        let mut head = vec![vec![4.0, 4.0]];
        let start = dist(&head[0], &tail[0]);

        let params = UmapOptimParams {
            n_epochs: 100,
            ..UmapOptimParams::default_2d()
        };
        optimise_embedding_sgd(&mut head, Some(&tail), &graph, &params, 3, false);

        let end = dist(&head[0], &tail[0]);
        assert!(end < start, "head did not move closer: {end:.3} vs {start:.3}");
        assert!(end < 3.0, "head ended too far from its neighbour: {end:.3}");
        assert_eq!(tail, vec![vec![0.0, 0.0], vec![10.0, 10.0]]);
    }

    #[test]
    fn test_coincident_negative_sample_pushes_apart() {
        // only neighbour and only negative sample sit on top of the point
        let tail = vec![vec![5.0, 5.0]];
        let graph = vec![vec![(0, 1.0)]];
        let mut head = vec![vec![5.0, 5.0]];

        let params = UmapOptimParams {
            n_epochs: 10,
            ..UmapOptimParams::default_2d()
        };
        optimise_embedding_sgd(&mut head, Some(&tail), &graph, &params, 11, false);

        assert!(head[0].iter().all(|x| x.is_finite()));
        let moved = dist(&head[0], &tail[0]);
        assert!(moved > 0.5, "coincident point stayed put: {moved:.3}");
        // both coordinates receive the same clipped step
        assert_relative_eq!(head[0][0], head[0][1], epsilon = 1e-12);
    }

    #[test]
    fn test_optimisation_preserves_graph_structure_sgd() {
        let graph = vec![
            vec![(1, 1.0), (2, 1.0)],
            vec![(0, 1.0), (2, 1.0)],
            vec![(0, 1.0), (1, 1.0), (3, 0.1)],
            vec![(2, 0.1), (4, 1.0), (5, 1.0)],
            vec![(3, 1.0), (5, 1.0)],
            vec![(3, 1.0), (4, 1.0)],
        ];

        let mut embd = vec![
            vec![0.0, 0.0],
            vec![10.0, 0.0],
            vec![0.0, 10.0],
            vec![10.0, 10.0],
            vec![-5.0, -5.0],
            vec![15.0, 15.0],
        ];

        let params = UmapOptimParams {
            n_epochs: 200,
            ..UmapOptimParams::default_2d()
        };

        optimise_embedding_sgd(&mut embd, None, &graph, &params, 42, false);

        let intra_clique1 =
            (dist(&embd[0], &embd[1]) + dist(&embd[0], &embd[2]) + dist(&embd[1], &embd[2])) / 3.0;
        let intra_clique2 =
            (dist(&embd[3], &embd[4]) + dist(&embd[3], &embd[5]) + dist(&embd[4], &embd[5])) / 3.0;
        let avg_intra = (intra_clique1 + intra_clique2) / 2.0;

        let inter_distances = [
            dist(&embd[0], &embd[3]),
            dist(&embd[0], &embd[4]),
            dist(&embd[0], &embd[5]),
            dist(&embd[1], &embd[3]),
            dist(&embd[1], &embd[4]),
            dist(&embd[1], &embd[5]),
        ];
        let avg_inter: f64 = inter_distances.iter().sum::<f64>() / inter_distances.len() as f64;

        assert!(
            avg_inter > avg_intra * 1.5,
            "Inter-clique dist ({:.2}) should be > 1.5x intra-clique dist ({:.2})",
            avg_inter,
            avg_intra
        );
    }
}
