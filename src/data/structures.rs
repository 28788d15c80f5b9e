use num_traits::Float;

use crate::assert_same_len;

/////////////////////
// Data structures //
/////////////////////

/////////
// COO //
/////////

/// Sparse graph in COO (Coordinate) format
///
/// ### Fields
///
/// * `row_indices` - Row index (source vertex)
/// * `col_indices` - Column index (target vertex)
/// * `values` - The membership strength of the edge
/// * `n_vertices` - The number of vertices in the graph
#[derive(Clone, Debug)]
pub struct SparseGraph<T> {
    pub row_indices: Vec<usize>,
    pub col_indices: Vec<usize>,
    pub values: Vec<T>,
    pub n_vertices: usize,
}

impl<T> SparseGraph<T>
where
    T: Float,
{
    /// Generate an empty graph with `n_vertices` vertices
    pub fn empty(n_vertices: usize) -> Self {
        Self {
            row_indices: Vec::new(),
            col_indices: Vec::new(),
            values: Vec::new(),
            n_vertices,
        }
    }

    /// Generate an edge list from the COO
    ///
    /// ### Returns
    ///
    /// A vector of tuples representing the edges and their weights
    pub fn to_edge_list(&self) -> Vec<(usize, usize, T)> {
        self.row_indices
            .iter()
            .zip(&self.col_indices)
            .zip(&self.values)
            .map(|((&r, &c), &v)| (r, c, v))
            .collect()
    }

    /// Returns the number of stored edges
    pub fn get_size(&self) -> usize {
        self.row_indices.len()
    }

    /// Returns the largest edge weight (zero for an empty graph)
    pub fn max_weight(&self) -> T {
        self.values
            .iter()
            .copied()
            .fold(T::zero(), |acc, w| if w > acc { w } else { acc })
    }
}

/////////
// CSR //
/////////

/// Row-compressed sparse matrix
///
/// Only the CSR layout is needed here: the spectral initialisation multiplies
/// the normalised adjacency with dense vectors row by row.
///
/// ### Fields
///
/// * `data` - The values
/// * `indices` - The column indices of the values
/// * `indptr` - The row pointers
/// * `shape` - The shape of the underlying matrix
#[derive(Debug, Clone)]
pub struct CompressedSparseData<T> {
    pub data: Vec<T>,
    pub indices: Vec<usize>,
    pub indptr: Vec<usize>,
    pub shape: (usize, usize),
}

impl<T> CompressedSparseData<T>
where
    T: Float,
{
    /// Generate a new CSR matrix
    ///
    /// ### Params
    ///
    /// * `data` - The underlying data
    /// * `indices` - The column indices
    /// * `indptr` - The row pointers
    /// * `shape` - `(nrow, ncol)`
    pub fn new_csr(
        data: Vec<T>,
        indices: Vec<usize>,
        indptr: Vec<usize>,
        shape: (usize, usize),
    ) -> Self {
        assert_same_len!(data, indices);
        debug_assert_eq!(indptr.len(), shape.0 + 1);

        Self {
            data,
            indices,
            indptr,
            shape,
        }
    }

    /// Returns the shape of the matrix as `(nrow, ncol)`
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Returns the number of stored values
    pub fn get_nnz(&self) -> usize {
        self.data.len()
    }

    /// Sparse matrix times dense vector
    ///
    /// ### Params
    ///
    /// * `x` - Dense input of length `ncol`
    /// * `y` - Dense output of length `nrow`; overwritten
    pub fn matvec(&self, x: &[T], y: &mut [T]) {
        for (i, y_i) in y.iter_mut().enumerate().take(self.shape.0) {
            let mut acc = T::zero();
            for idx in self.indptr[i]..self.indptr[i + 1] {
                acc = acc + self.data[idx] * x[self.indices[idx]];
            }
            *y_i = acc;
        }
    }
}

/// Transforms a COO graph into CSR
///
/// Duplicated `(row, col)` entries are kept as separate values; they sum up
/// during a matrix-vector product.
///
/// ### Params
///
/// * `graph` - The graph in COO format
///
/// ### Returns
///
/// The `n_vertices x n_vertices` CSR matrix
pub fn coo_to_csr<T>(graph: &SparseGraph<T>) -> CompressedSparseData<T>
where
    T: Float,
{
    let n = graph.n_vertices;
    let nnz = graph.get_size();

    let mut indptr = vec![0usize; n + 1];
    for &r in &graph.row_indices {
        indptr[r + 1] += 1;
    }
    for i in 0..n {
        indptr[i + 1] += indptr[i];
    }

    let mut data = vec![T::zero(); nnz];
    let mut indices = vec![0usize; nnz];
    let mut next = indptr[..n].to_vec();

    for ((&r, &c), &v) in graph
        .row_indices
        .iter()
        .zip(&graph.col_indices)
        .zip(&graph.values)
    {
        let pos = next[r];
        data[pos] = v;
        indices[pos] = c;
        next[r] += 1;
    }

    CompressedSparseData::new_csr(data, indices, indptr, (n, n))
}

///////////
// Tests //
///////////
