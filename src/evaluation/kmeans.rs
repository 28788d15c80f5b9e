use faer::{Mat, MatRef};
use num_traits::{Float, FromPrimitive, ToPrimitive};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::error::{Result, UmapError};
use crate::utils::math::squared_euclidean;

/// K-means clustering with k-means++ seeding
///
/// Lloyd iterations from `n_init` independent k-means++ starts; the run with
/// the lowest inertia wins.
///
/// ### Fields
///
/// * `n_clusters` - Number of clusters
/// * `max_iter` - Maximum Lloyd iterations per run (default 300)
/// * `tol` - Convergence tolerance on the squared centroid shift, relative to
///   the mean per-feature variance of the data (default 1e-4)
/// * `n_init` - Number of restarts (default 10)
/// * `seed` - Random seed; `None` draws one from the OS
#[derive(Clone, Debug)]
pub struct KMeans {
    pub n_clusters: usize,
    pub max_iter: usize,
    pub tol: f64,
    pub n_init: usize,
    pub seed: Option<u64>,
}

/// Result of a k-means run
///
/// ### Fields
///
/// * `labels` - Cluster of every row
/// * `centroids` - `n_clusters x n_features` cluster centres
/// * `inertia` - Sum of squared distances of the rows to their centre
/// * `n_iter` - Lloyd iterations of the winning run
#[derive(Clone, Debug)]
pub struct KMeansResult<T> {
    pub labels: Vec<usize>,
    pub centroids: Mat<T>,
    pub inertia: f64,
    pub n_iter: usize,
}

impl KMeans {
    /// Create a new k-means clusterer with default settings
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            max_iter: 300,
            tol: 1e-4,
            n_init: 10,
            seed: None,
        }
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set convergence tolerance
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set number of restarts
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    /// Set random seed for reproducibility
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Cluster the rows of `data`
    ///
    /// ### Params
    ///
    /// * `data` - Samples x features
    ///
    /// ### Returns
    ///
    /// The best run over all restarts
    pub fn fit<T>(&self, data: MatRef<T>) -> Result<KMeansResult<T>>
    where
        T: Float + FromPrimitive + ToPrimitive + Send + Sync,
    {
        let n = data.nrows();
        let d = data.ncols();
        if n == 0 || d == 0 {
            return Err(UmapError::EmptyInput);
        }
        if self.n_clusters == 0 || self.n_clusters > n {
            return Err(UmapError::invalid(
                "n_clusters",
                format!("must be in [1, {n}], got {}", self.n_clusters),
            ));
        }
        if self.n_init == 0 {
            return Err(UmapError::invalid("n_init", "must be at least 1"));
        }

        let mut rows: Vec<Vec<f64>> = Vec::with_capacity(n);
        for i in 0..n {
            let mut row = Vec::with_capacity(d);
            for j in 0..d {
                match data[(i, j)].to_f64() {
                    Some(v) if v.is_finite() => row.push(v),
                    _ => return Err(UmapError::NonFiniteInput { row: i, col: j }),
                }
            }
            rows.push(row);
        }

        let tol = self.tol * mean_variance(&rows);
        let base_seed = self.seed.unwrap_or_else(rand::random);

        let best = (0..self.n_init)
            .map(|run| {
                let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(run as u64));
                self.single_run(&rows, tol, &mut rng)
            })
            .min_by(|a, b| a.inertia.total_cmp(&b.inertia))
            .ok_or(UmapError::EmptyInput)?;

        let centroids = Mat::from_fn(self.n_clusters, d, |c, j| {
            T::from_f64(best.centroids[c][j]).unwrap_or_else(T::zero)
        });

        Ok(KMeansResult {
            labels: best.labels,
            centroids,
            inertia: best.inertia,
            n_iter: best.n_iter,
        })
    }

    /// k-means++ seeding
    fn init_centroids(&self, rows: &[Vec<f64>], rng: &mut StdRng) -> Vec<Vec<f64>> {
        let n = rows.len();
        let mut centroids = Vec::with_capacity(self.n_clusters);
        centroids.push(rows[rng.random_range(0..n)].clone());

        let mut min_dist: Vec<f64> = rows
            .iter()
            .map(|r| squared_euclidean(r, &centroids[0]))
            .collect();

        for _ in 1..self.n_clusters {
            let total: f64 = min_dist.iter().sum();
            let selected = if total <= 0.0 {
                rng.random_range(0..n)
            } else {
                let threshold = rng.random::<f64>() * total;
                let mut cumsum = 0.0;
                let mut selected = n - 1;
                for (j, &dist) in min_dist.iter().enumerate() {
                    cumsum += dist;
                    if cumsum >= threshold {
                        selected = j;
                        break;
                    }
                }
                selected
            };

            let centre = rows[selected].clone();
            for (m, r) in min_dist.iter_mut().zip(rows) {
                *m = m.min(squared_euclidean(r, &centre));
            }
            centroids.push(centre);
        }

        centroids
    }

    /// One Lloyd run from a fresh k-means++ start
    fn single_run(&self, rows: &[Vec<f64>], tol: f64, rng: &mut StdRng) -> Run {
        let n = rows.len();
        let d = rows[0].len();
        let k = self.n_clusters;

        let mut centroids = self.init_centroids(rows, rng);
        let mut labels = vec![0usize; n];
        let mut n_iter = 0;

        for _ in 0..self.max_iter {
            n_iter += 1;
            assign(rows, &centroids, &mut labels);

            let mut new_centroids = vec![vec![0.0; d]; k];
            let mut counts = vec![0usize; k];
            for (row, &c) in rows.iter().zip(&labels) {
                for (acc, &x) in new_centroids[c].iter_mut().zip(row) {
                    *acc += x;
                }
                counts[c] += 1;
            }

            for c in 0..k {
                if counts[c] > 0 {
                    for v in new_centroids[c].iter_mut() {
                        *v /= counts[c] as f64;
                    }
                } else {
                    // empty cluster: restart it on a random point
                    new_centroids[c] = rows[rng.random_range(0..n)].clone();
                }
            }

            let shift: f64 = centroids
                .iter()
                .zip(&new_centroids)
                .map(|(a, b)| squared_euclidean(a, b))
                .sum();

            centroids = new_centroids;

            if shift <= tol {
                break;
            }
        }

        let inertia = assign(rows, &centroids, &mut labels);

        Run {
            labels,
            centroids,
            inertia,
            n_iter,
        }
    }
}

/// State of a single restart
struct Run {
    labels: Vec<usize>,
    centroids: Vec<Vec<f64>>,
    inertia: f64,
    n_iter: usize,
}

/// Assign every row to its closest centroid; returns the inertia
fn assign(rows: &[Vec<f64>], centroids: &[Vec<f64>], labels: &mut [usize]) -> f64 {
    labels
        .par_iter_mut()
        .zip(rows.par_iter())
        .map(|(label, row)| {
            let mut best_cluster = 0;
            let mut best_dist = f64::MAX;
            for (c, centre) in centroids.iter().enumerate() {
                let dist = squared_euclidean(row, centre);
                if dist < best_dist {
                    best_dist = dist;
                    best_cluster = c;
                }
            }
            *label = best_cluster;
            best_dist
        })
        .sum()
}

/// Mean of the per-feature variances
fn mean_variance(rows: &[Vec<f64>]) -> f64 {
    let n = rows.len() as f64;
    let d = rows[0].len();
    let mut total = 0.0;
    for j in 0..d {
        let mean = rows.iter().map(|r| r[j]).sum::<f64>() / n;
        total += rows.iter().map(|r| (r[j] - mean).powi(2)).sum::<f64>() / n;
    }
    total / d as f64
}

///////////
// Tests //
///////////

#[cfg(test)]
mod test_kmeans {
    use super::*;
    use crate::evaluation::metrics::adjusted_rand_score;

    fn three_groups() -> (Mat<f64>, Vec<usize>) {
        let centres = [[0.0, 0.0], [10.0, 10.0], [-10.0, 10.0]];
        let offsets = [[0.1, 0.0], [-0.1, 0.0], [0.0, 0.1], [0.0, -0.1], [0.05, 0.05]];
        let data = Mat::from_fn(15, 2, |i, j| centres[i / 5][j] + offsets[i % 5][j]);
        let labels = (0..15).map(|i| i / 5).collect();
        (data, labels)
    }

    #[test]
    fn test_kmeans_basic() {
        let (data, truth) = three_groups();

        let result = KMeans::new(3).with_seed(42).fit(data.as_ref()).unwrap();

        assert_eq!(result.labels.len(), 15);
        assert_eq!(result.centroids.nrows(), 3);
        assert_eq!(adjusted_rand_score(&truth, &result.labels).unwrap(), 1.0);
        assert!(result.inertia < 1.0);
        assert!(result.n_iter >= 1);
    }

    #[test]
    fn test_kmeans_deterministic_with_seed() {
        let (data, _) = three_groups();

        let a = KMeans::new(2).with_seed(7).fit(data.as_ref()).unwrap();
        let b = KMeans::new(2).with_seed(7).fit(data.as_ref()).unwrap();

        assert_eq!(a.labels, b.labels);
        assert_eq!(a.inertia, b.inertia);
    }

    #[test]
    fn test_kmeans_k_equals_n() {
        let data = faer::mat![[0.0f32, 0.0], [1.0, 1.0], [5.0, 5.0]];

        let result = KMeans::new(3).with_seed(1).fit(data.as_ref()).unwrap();

        let mut labels = result.labels.clone();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), 3);
        assert!(result.inertia.abs() < 1e-12);
    }

    #[test]
    fn test_kmeans_errors() {
        let data = faer::mat![[0.0, 0.0], [1.0, 1.0]];
        assert!(matches!(
            KMeans::new(3).fit(data.as_ref()),
            Err(UmapError::InvalidParameter { .. })
        ));
        assert!(matches!(
            KMeans::new(0).fit(data.as_ref()),
            Err(UmapError::InvalidParameter { .. })
        ));

        let empty = Mat::<f64>::zeros(0, 2);
        assert_eq!(
            KMeans::new(1).fit(empty.as_ref()).unwrap_err(),
            UmapError::EmptyInput
        );

        let bad = faer::mat![[0.0, f64::NAN], [1.0, 1.0]];
        assert_eq!(
            KMeans::new(1).fit(bad.as_ref()).unwrap_err(),
            UmapError::NonFiniteInput { row: 0, col: 1 }
        );
    }
}
