//! Matrix conversion utilities.
//!
//! Vectors and matrices are `ndarray` types throughout the crate; the dense
//! Cholesky solves run on `faer`. These helpers copy between the two.
//! ndarray is row-major by default, faer is column-major, so the copies are
//! element-wise.

use faer::Mat;
use ndarray::{Array1, Array2};

/// Convert an ndarray `Array2` to a faer `Mat`.
pub fn ndarray_to_faer(arr: &Array2<f64>) -> Mat<f64> {
    Mat::from_fn(arr.nrows(), arr.ncols(), |i, j| arr[[i, j]])
}

/// Convert a faer `Mat` to an ndarray `Array2`.
pub fn faer_to_ndarray(mat: &Mat<f64>) -> Array2<f64> {
    Array2::from_shape_fn((mat.nrows(), mat.ncols()), |(i, j)| mat[(i, j)])
}

/// Convert an ndarray `Array1` to a single-column faer `Mat`.
///
/// A one-column matrix is what the faer solvers take as a right-hand side.
pub fn ndarray_vec_to_faer(arr: &Array1<f64>) -> Mat<f64> {
    Mat::from_fn(arr.len(), 1, |i, _| arr[i])
}

/// Convert the first column of a faer `Mat` to an ndarray `Array1`.
pub fn faer_col_to_ndarray(mat: &Mat<f64>) -> Array1<f64> {
    if mat.ncols() == 0 {
        return Array1::zeros(0);
    }
    Array1::from_shape_fn(mat.nrows(), |i| mat[(i, 0)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_matrix_roundtrip() {
        let arr = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let mat = ndarray_to_faer(&arr);

        assert_eq!(mat.nrows(), 2);
        assert_eq!(mat.ncols(), 3);
        assert_eq!(mat[(1, 0)], 4.0);
        assert_eq!(mat[(0, 2)], 3.0);

        assert_eq!(faer_to_ndarray(&mat), arr);
    }

    #[test]
    fn test_vector_roundtrip() {
        let v = array![1.5, -2.0, 0.25];
        let col = ndarray_vec_to_faer(&v);

        assert_eq!(col.nrows(), 3);
        assert_eq!(col.ncols(), 1);
        assert_eq!(faer_col_to_ndarray(&col), v);
    }
}
