pub mod umap_optimisers;

use num_traits::Float;

////////////
// Params //
////////////

/// Parameters of the smoothed kNN distance search
///
/// Controls the binary search for the per-point bandwidth (sigma) during the
/// fuzzy simplicial set construction.
///
/// ### Fields
///
/// * `tolerance` - Convergence tolerance for the binary search (typically
///   1e-5). Controls how precisely sigma values are computed.
/// * `n_iter` - Maximum number of binary search steps (typically 64).
#[derive(Clone, Debug)]
pub struct UmapGraphParams<T> {
    pub tolerance: T,
    pub n_iter: usize,
}

impl<T> Default for UmapGraphParams<T>
where
    T: Float,
{
    /// Returns sensible defaults for UMAP
    ///
    /// ### Returns
    ///
    /// * `tolerance = 1e-5` - Tight convergence for sigma computation
    /// * `n_iter = 64` - Enough halvings to exhaust `f64` precision
    fn default() -> Self {
        Self {
            tolerance: T::from(1e-5).unwrap(),
            n_iter: 64,
        }
    }
}
