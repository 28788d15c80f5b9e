use faer::{Mat, MatRef};
use num_traits::Float;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Bernoulli, Distribution, Normal};

use crate::error::{Result, UmapError};

///////////
// Blobs //
///////////

/// Generate isotropic Gaussian blobs
///
/// Cluster centres are drawn uniformly from `center_box` in every feature.
/// Samples are spread as evenly as possible over the centres (the first
/// `n_samples % n_centers` centres get one extra sample) and the rows are
/// shuffled afterwards.
///
/// ### Params
///
/// * `n_samples` - Total number of points
/// * `n_features` - Dimensionality of the points
/// * `n_centers` - Number of blobs
/// * `cluster_std` - Standard deviation of every blob
/// * `center_box` - `(low, high)` bounds for the centres
/// * `seed` - Random seed for reproducibility
///
/// ### Returns
///
/// Tuple of the data matrix of shape `(n_samples, n_features)` and the blob
/// label of every row
pub fn make_blobs(
    n_samples: usize,
    n_features: usize,
    n_centers: usize,
    cluster_std: f64,
    center_box: (f64, f64),
    seed: u64,
) -> Result<(Mat<f64>, Vec<usize>)> {
    if n_samples == 0 || n_features == 0 {
        return Err(UmapError::EmptyInput);
    }
    if n_centers == 0 {
        return Err(UmapError::invalid("n_centers", "must be at least 1"));
    }
    if !(center_box.0 < center_box.1) {
        return Err(UmapError::invalid(
            "center_box",
            format!("lower bound {} must be below {}", center_box.0, center_box.1),
        ));
    }
    let noise = Normal::new(0.0, cluster_std)
        .map_err(|e| UmapError::invalid("cluster_std", e.to_string()))?;

    let mut rng = StdRng::seed_from_u64(seed);

    let centres: Vec<Vec<f64>> = (0..n_centers)
        .map(|_| {
            (0..n_features)
                .map(|_| rng.random_range(center_box.0..center_box.1))
                .collect()
        })
        .collect();

    let mut labels: Vec<usize> = (0..n_centers)
        .flat_map(|c| {
            let extra = usize::from(c < n_samples % n_centers);
            std::iter::repeat_n(c, n_samples / n_centers + extra)
        })
        .collect();
    labels.shuffle(&mut rng);

    let mut data = Mat::<f64>::zeros(n_samples, n_features);
    for (i, &label) in labels.iter().enumerate() {
        for (j, &c) in centres[label].iter().enumerate() {
            data[(i, j)] = c + noise.sample(&mut rng);
        }
    }

    Ok((data, labels))
}

//////////
// Iris //
//////////

/// Fisher's Iris measurements: sepal length, sepal width, petal length and
/// petal width in cm. Rows 0..50 setosa, 50..100 versicolor, 100..150
/// virginica.
#[rustfmt::skip]
const IRIS: [[f64; 4]; 150] = [
    [5.1, 3.5, 1.4, 0.2], [4.9, 3.0, 1.4, 0.2], [4.7, 3.2, 1.3, 0.2], [4.6, 3.1, 1.5, 0.2],
    [5.0, 3.6, 1.4, 0.2], [5.4, 3.9, 1.7, 0.4], [4.6, 3.4, 1.4, 0.3], [5.0, 3.4, 1.5, 0.2],
    [4.4, 2.9, 1.4, 0.2], [4.9, 3.1, 1.5, 0.1], [5.4, 3.7, 1.5, 0.2], [4.8, 3.4, 1.6, 0.2],
    [4.8, 3.0, 1.4, 0.1], [4.3, 3.0, 1.1, 0.1], [5.8, 4.0, 1.2, 0.2], [5.7, 4.4, 1.5, 0.4],
    [5.4, 3.9, 1.3, 0.4], [5.1, 3.5, 1.4, 0.3], [5.7, 3.8, 1.7, 0.3], [5.1, 3.8, 1.5, 0.3],
    [5.4, 3.4, 1.7, 0.2], [5.1, 3.7, 1.5, 0.4], [4.6, 3.6, 1.0, 0.2], [5.1, 3.3, 1.7, 0.5],
    [4.8, 3.4, 1.9, 0.2], [5.0, 3.0, 1.6, 0.2], [5.0, 3.4, 1.6, 0.4], [5.2, 3.5, 1.5, 0.2],
    [5.2, 3.4, 1.4, 0.2], [4.7, 3.2, 1.6, 0.2], [4.8, 3.1, 1.6, 0.2], [5.4, 3.4, 1.5, 0.4],
    [5.2, 4.1, 1.5, 0.1], [5.5, 4.2, 1.4, 0.2], [4.9, 3.1, 1.5, 0.2], [5.0, 3.2, 1.2, 0.2],
    [5.5, 3.5, 1.3, 0.2], [4.9, 3.6, 1.4, 0.1], [4.4, 3.0, 1.3, 0.2], [5.1, 3.4, 1.5, 0.2],
    [5.0, 3.5, 1.3, 0.3], [4.5, 2.3, 1.3, 0.3], [4.4, 3.2, 1.3, 0.2], [5.0, 3.5, 1.6, 0.6],
    [5.1, 3.8, 1.9, 0.4], [4.8, 3.0, 1.4, 0.3], [5.1, 3.8, 1.6, 0.2], [4.6, 3.2, 1.4, 0.2],
    [5.3, 3.7, 1.5, 0.2], [5.0, 3.3, 1.4, 0.2],
    [7.0, 3.2, 4.7, 1.4], [6.4, 3.2, 4.5, 1.5], [6.9, 3.1, 4.9, 1.5], [5.5, 2.3, 4.0, 1.3],
    [6.5, 2.8, 4.6, 1.5], [5.7, 2.8, 4.5, 1.3], [6.3, 3.3, 4.7, 1.6], [4.9, 2.4, 3.3, 1.0],
    [6.6, 2.9, 4.6, 1.3], [5.2, 2.7, 3.9, 1.4], [5.0, 2.0, 3.5, 1.0], [5.9, 3.0, 4.2, 1.5],
    [6.0, 2.2, 4.0, 1.0], [6.1, 2.9, 4.7, 1.4], [5.6, 2.9, 3.6, 1.3], [6.7, 3.1, 4.4, 1.4],
    [5.6, 3.0, 4.5, 1.5], [5.8, 2.7, 4.1, 1.0], [6.2, 2.2, 4.5, 1.5], [5.6, 2.5, 3.9, 1.1],
    [5.9, 3.2, 4.8, 1.8], [6.1, 2.8, 4.0, 1.3], [6.3, 2.5, 4.9, 1.5], [6.1, 2.8, 4.7, 1.2],
    [6.4, 2.9, 4.3, 1.3], [6.6, 3.0, 4.4, 1.4], [6.8, 2.8, 4.8, 1.4], [6.7, 3.0, 5.0, 1.7],
    [6.0, 2.9, 4.5, 1.5], [5.7, 2.6, 3.5, 1.0], [5.5, 2.4, 3.8, 1.1], [5.5, 2.4, 3.7, 1.0],
    [5.8, 2.7, 3.9, 1.2], [6.0, 2.7, 5.1, 1.6], [5.4, 3.0, 4.5, 1.5], [6.0, 3.4, 4.5, 1.6],
    [6.7, 3.1, 4.7, 1.5], [6.3, 2.3, 4.4, 1.3], [5.6, 3.0, 4.1, 1.3], [5.5, 2.5, 4.0, 1.3],
    [5.5, 2.6, 4.4, 1.2], [6.1, 3.0, 4.6, 1.4], [5.8, 2.6, 4.0, 1.2], [5.0, 2.3, 3.3, 1.0],
    [5.6, 2.7, 4.2, 1.3], [5.7, 3.0, 4.2, 1.2], [5.7, 2.9, 4.2, 1.3], [6.2, 2.9, 4.3, 1.3],
    [5.1, 2.5, 3.0, 1.1], [5.7, 2.8, 4.1, 1.3],
    [6.3, 3.3, 6.0, 2.5], [5.8, 2.7, 5.1, 1.9], [7.1, 3.0, 5.9, 2.1], [6.3, 2.9, 5.6, 1.8],
    [6.5, 3.0, 5.8, 2.2], [7.6, 3.0, 6.6, 2.1], [4.9, 2.5, 4.5, 1.7], [7.3, 2.9, 6.3, 1.8],
    [6.7, 2.5, 5.8, 1.8], [7.2, 3.6, 6.1, 2.5], [6.5, 3.2, 5.1, 2.0], [6.4, 2.7, 5.3, 1.9],
    [6.8, 3.0, 5.5, 2.1], [5.7, 2.5, 5.0, 2.0], [5.8, 2.8, 5.1, 2.4], [6.4, 3.2, 5.3, 2.3],
    [6.5, 3.0, 5.5, 1.8], [7.7, 3.8, 6.7, 2.2], [7.7, 2.6, 6.9, 2.3], [6.0, 2.2, 5.0, 1.5],
    [6.9, 3.2, 5.7, 2.3], [5.6, 2.8, 4.9, 2.0], [7.7, 2.8, 6.7, 2.0], [6.3, 2.7, 4.9, 1.8],
    [6.7, 3.3, 5.7, 2.1], [7.2, 3.2, 6.0, 1.8], [6.2, 2.8, 4.8, 1.8], [6.1, 3.0, 4.9, 1.8],
    [6.4, 2.8, 5.6, 2.1], [7.2, 3.0, 5.8, 1.6], [7.4, 2.8, 6.1, 1.9], [7.9, 3.8, 6.4, 2.0],
    [6.4, 2.8, 5.6, 2.2], [6.3, 2.8, 5.1, 1.5], [6.1, 2.6, 5.6, 1.4], [7.7, 3.0, 6.1, 2.3],
    [6.3, 3.4, 5.6, 2.4], [6.4, 3.1, 5.5, 1.8], [6.0, 3.0, 4.8, 1.8], [6.9, 3.1, 5.4, 2.1],
    [6.7, 3.1, 5.6, 2.4], [6.9, 3.1, 5.1, 2.3], [5.8, 2.7, 5.1, 1.9], [6.8, 3.2, 5.9, 2.3],
    [6.7, 3.3, 5.7, 2.5], [6.7, 3.0, 5.2, 2.3], [6.3, 2.5, 5.0, 1.9], [6.5, 3.0, 5.2, 2.0],
    [6.2, 3.4, 5.4, 2.3], [5.9, 3.0, 5.1, 1.8],
];

/// Load the Iris dataset
///
/// ### Returns
///
/// Tuple of the `150 x 4` measurement matrix and the species labels
/// (`0` setosa, `1` versicolor, `2` virginica)
pub fn load_iris() -> (Mat<f64>, Vec<usize>) {
    let data = Mat::from_fn(IRIS.len(), 4, |i, j| IRIS[i][j]);
    let labels = (0..IRIS.len()).map(|i| i / 50).collect();
    (data, labels)
}

/////////////
// Splits  //
/////////////

/// Randomly assign rows to a training and a held-out side
///
/// Every row independently goes to the training side with probability
/// `p_train`, so the split sizes are only approximately proportional.
///
/// ### Params
///
/// * `n` - Number of rows
/// * `p_train` - Probability of a row ending up in the training split
/// * `seed` - Random seed
///
/// ### Returns
///
/// `(train_indices, test_indices)`, both in ascending order
pub fn random_split(n: usize, p_train: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    let coin = Bernoulli::new(p_train).map_err(|_| {
        UmapError::invalid("p_train", format!("must be in [0, 1], got {p_train}"))
    })?;

    let mut rng = StdRng::seed_from_u64(seed);
    let (train, test): (Vec<usize>, Vec<usize>) = (0..n).partition(|_| coin.sample(&mut rng));

    Ok((train, test))
}

/// Copy the given rows of a matrix into a new matrix
///
/// ### Params
///
/// * `data` - Source matrix
/// * `indices` - Row indices to select, in output order
///
/// ### Returns
///
/// Matrix of shape `(indices.len(), data.ncols())`
pub fn select_rows<T>(data: MatRef<T>, indices: &[usize]) -> Mat<T>
where
    T: Float,
{
    Mat::from_fn(indices.len(), data.ncols(), |i, j| data[(indices[i], j)])
}

/// Select labels by index
pub fn select_labels(labels: &[usize], indices: &[usize]) -> Vec<usize> {
    indices.iter().map(|&i| labels[i]).collect()
}

///////////
// Tests //
///////////

#[cfg(test)]
mod test_synthetic {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_make_blobs_shape_and_balance() {
        let (data, labels) = make_blobs(103, 5, 4, 1.0, (-10.0, 10.0), 42).unwrap();

        assert_eq!(data.nrows(), 103);
        assert_eq!(data.ncols(), 5);
        assert_eq!(labels.len(), 103);

        let mut counts = [0usize; 4];
        for &l in &labels {
            counts[l] += 1;
        }
        assert_eq!(counts, [26, 26, 26, 25]);
    }

    #[test]
    fn test_make_blobs_reproducible() {
        let (a, la) = make_blobs(50, 3, 3, 0.5, (-5.0, 5.0), 7).unwrap();
        let (b, lb) = make_blobs(50, 3, 3, 0.5, (-5.0, 5.0), 7).unwrap();
        let (c, _) = make_blobs(50, 3, 3, 0.5, (-5.0, 5.0), 8).unwrap();

        assert_eq!(la, lb);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_make_blobs_tight_clusters() {
        let (data, labels) = make_blobs(200, 2, 2, 0.01, (-10.0, 10.0), 3).unwrap();

        // points of the same blob are close to each other
        let first: Vec<usize> = (0..200).filter(|&i| labels[i] == 0).collect();
        let (p, q) = (first[0], first[1]);
        let d = ((data[(p, 0)] - data[(q, 0)]).powi(2) + (data[(p, 1)] - data[(q, 1)]).powi(2))
            .sqrt();
        assert!(d < 0.2);
    }

    #[test]
    fn test_make_blobs_invalid() {
        assert_eq!(
            make_blobs(0, 2, 2, 1.0, (-1.0, 1.0), 1).unwrap_err(),
            UmapError::EmptyInput
        );
        assert!(make_blobs(10, 2, 0, 1.0, (-1.0, 1.0), 1).is_err());
        assert!(make_blobs(10, 2, 2, -1.0, (-1.0, 1.0), 1).is_err());
        assert!(make_blobs(10, 2, 2, 1.0, (1.0, -1.0), 1).is_err());
    }

    #[test]
    fn test_load_iris() {
        let (data, labels) = load_iris();

        assert_eq!(data.nrows(), 150);
        assert_eq!(data.ncols(), 4);
        assert_eq!(labels.iter().filter(|&&l| l == 0).count(), 50);
        assert_eq!(labels[149], 2);

        let expected_means = [5.843, 3.057, 3.758, 1.199];
        for (j, &m) in expected_means.iter().enumerate() {
            let mean = (0..150).map(|i| data[(i, j)]).sum::<f64>() / 150.0;
            assert_relative_eq!(mean, m, epsilon = 5e-3);
        }
    }

    #[test]
    fn test_random_split() {
        let (train, test) = random_split(1000, 0.75, 11).unwrap();

        assert_eq!(train.len() + test.len(), 1000);
        assert!(train.len() > 700 && train.len() < 800);
        assert!(train.iter().all(|i| !test.contains(i)));
        assert_eq!(random_split(1000, 0.75, 11).unwrap().0, train);

        assert!(random_split(10, 1.5, 1).is_err());
        assert!(random_split(10, f64::NAN, 1).is_err());
        assert_eq!(random_split(10, 1.0, 1).unwrap().0.len(), 10);
        assert_eq!(random_split(10, 0.0, 1).unwrap().1.len(), 10);
    }

    #[test]
    fn test_select_rows_and_labels() {
        let data = faer::mat![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let labels = vec![0, 1, 2];

        let sub = select_rows(data.as_ref(), &[2, 0]);
        assert_eq!(sub.nrows(), 2);
        assert_eq!(sub[(0, 1)], 6.0);
        assert_eq!(sub[(1, 0)], 1.0);
        assert_eq!(select_labels(&labels, &[2, 0]), vec![2, 0]);
    }
}
