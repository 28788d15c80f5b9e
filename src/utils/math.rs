use faer::Mat;
use num_traits::Float;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::iter::Sum;

use crate::assert_same_len;
use crate::data::structures::*;

////////////////////
// Vector helpers //
////////////////////

/// Dot product of two vectors
///
/// ### Params
///
/// * `a` - Vector a
/// * `b` - Vector b
///
/// ### Returns
///
/// Dot product of the two vectors
pub fn dot<T>(a: &[T], b: &[T]) -> T
where
    T: Float + Send + Sync + Sum,
{
    assert_same_len!(a, b);
    a.par_iter().zip(b).map(|(&x, &y)| x * y).sum()
}

/// Euclidean norm of a vector
pub fn norm<T>(v: &[T]) -> T
where
    T: Float + Send + Sync + Sum,
{
    dot(v, v).sqrt()
}

/// Normalise a vector to unit length in place
///
/// Vectors with a (numerically) zero norm are left untouched.
pub fn normalise<T>(v: &mut [T])
where
    T: Float + Send + Sync + Sum,
{
    let n = norm(v);
    if n > T::epsilon() {
        v.par_iter_mut().for_each(|x| *x = *x / n);
    }
}

/// Squared Euclidean distance between two points
#[inline(always)]
pub fn squared_euclidean<T>(a: &[T], b: &[T]) -> T
where
    T: Float,
{
    a.iter()
        .zip(b)
        .fold(T::zero(), |acc, (&x, &y)| acc + (x - y) * (x - y))
}

/////////////////////////////////////
// Lanczos eigenvalue calculations //
/////////////////////////////////////

/// Eigen-decomposition of the symmetric tridiagonal Lanczos matrix
///
/// ### Params
///
/// * `alpha` - Diagonal
/// * `beta` - Off-diagonal (length `alpha.len() - 1`)
///
/// ### Returns
///
/// `(eigenvalues, eigenvectors)` or `None` if the dense solver failed
fn tridiag_eig(alpha: &[f64], beta: &[f64]) -> Option<(Vec<f64>, Mat<f64>)> {
    let m = alpha.len();
    let mut t = Mat::<f64>::zeros(m, m);

    for i in 0..m {
        t[(i, i)] = alpha[i];
        if i + 1 < m {
            t[(i, i + 1)] = beta[i];
            t[(i + 1, i)] = beta[i];
        }
    }

    let eig = t.self_adjoint_eigen(faer::Side::Lower).ok()?;
    let evals = eig.S().column_vector().iter().copied().collect();
    let evecs = eig.U().to_owned();

    Some((evals, evecs))
}

/// Compute the largest (algebraic) eigenpairs of a symmetric sparse matrix
///
/// Lanczos iteration with full re-orthogonalisation against all previous
/// Lanczos vectors. The Krylov dimension grows with the number of requested
/// components and is capped at the matrix size, in which case the result is
/// exact up to floating point error.
///
/// ### Params
///
/// * `matrix` - Symmetric sparse matrix in CSR format
/// * `n_components` - Number of eigenpairs to compute
/// * `seed` - Seed for the random start vector
///
/// ### Returns
///
/// `Some((eigenvalues, eigenvectors))` sorted by decreasing eigenvalue, where
/// `eigenvectors[i][c]` is element `i` of eigenvector `c`. `None` if the
/// matrix is empty or the tridiagonal solver failed.
pub fn compute_largest_eigenpairs_lanczos(
    matrix: &CompressedSparseData<f64>,
    n_components: usize,
    seed: u64,
) -> Option<(Vec<f64>, Vec<Vec<f64>>)> {
    let n = matrix.shape().0;
    if n == 0 || n_components == 0 {
        return None;
    }
    let max_iter = (4 * n_components + 40).max(n_components).min(n);

    let mut basis: Vec<Vec<f64>> = Vec::with_capacity(max_iter);
    let mut alpha: Vec<f64> = Vec::with_capacity(max_iter);
    let mut beta: Vec<f64> = Vec::with_capacity(max_iter);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut v: Vec<f64> = (0..n).map(|_| rng.random::<f64>() - 0.5).collect();
    normalise(&mut v);

    let mut w = vec![0.0; n];

    for j in 0..max_iter {
        matrix.matvec(&v, &mut w);
        let a_j = dot(&w, &v);
        alpha.push(a_j);

        // w = w - alpha[j]*v - beta[j-1]*v_old
        for i in 0..n {
            w[i] -= a_j * v[i];
        }
        if j > 0 {
            let b_prev = beta[j - 1];
            let v_old = &basis[j - 1];
            for i in 0..n {
                w[i] -= b_prev * v_old[i];
            }
        }

        basis.push(v.clone());

        // full re-orthogonalisation (twice is enough)
        for _ in 0..2 {
            for q in &basis {
                let proj = dot(&w, q);
                for i in 0..n {
                    w[i] -= proj * q[i];
                }
            }
        }

        let b_j = norm(&w);
        if j + 1 == max_iter || b_j < 1e-10 {
            break;
        }

        beta.push(b_j);
        for i in 0..n {
            v[i] = w[i] / b_j;
        }
    }

    let m = alpha.len();
    let (evals, evecs) = tridiag_eig(&alpha, &beta[..m - 1])?;

    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&i, &j| evals[j].total_cmp(&evals[i]));

    let n_out = n_components.min(m);
    let mut largest_evals = Vec::with_capacity(n_out);
    let mut largest_evecs = vec![vec![0.0; n_out]; n];

    for (comp_idx, &idx) in order.iter().take(n_out).enumerate() {
        // back to the original space: v_original = V * v_tridiag
        let mut evec = vec![0.0; n];
        for (j, q) in basis.iter().enumerate() {
            let coeff = evecs[(j, idx)];
            for i in 0..n {
                evec[i] += q[i] * coeff;
            }
        }
        normalise(&mut evec);

        for i in 0..n {
            largest_evecs[i][comp_idx] = evec[i];
        }
        largest_evals.push(evals[idx]);
    }

    Some((largest_evals, largest_evecs))
}

///////////
// Tests //
///////////
