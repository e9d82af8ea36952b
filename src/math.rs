use ndarray::{Array1, Array2, LinalgScalar};

use crate::{Error, Result};

/// Compute the outer product of two one-dimensional vectors of length (m x 1) and (n x 1)
///
/// The outer product is the (m x n) matrix whose elements are products of elements in the first
/// vector with those in the second.
///
/// # Examples
///
/// ```
/// use isoratio::math::outer_product;
/// use ndarray::{arr1, arr2, Array1};
///
/// let u: Array1<f64> = arr1(&[1., 2., 3.]);
/// let v = arr1(&[4., 5., 6.]);
/// let outer_product = outer_product(&u, &v);
///
/// let expected = arr2(&[[4., 5., 6.], [8., 10., 12.], [12., 15., 18.]]);
/// assert_eq!(outer_product, expected);
///```
pub fn outer_product<T: LinalgScalar>(u: &Array1<T>, v: &Array1<T>) -> Array2<T> {
    let u = u.view().insert_axis(ndarray::Axis(1));
    let v = v.view().insert_axis(ndarray::Axis(0));
    u.dot(&v)
}

/// Invert a symmetric positive definite 2 x 2 matrix
///
/// The covariance of the two fitted ratios is the inverse of a 2 x 2 information matrix, so the
/// closed form inverse is all that is needed.
///
/// # Errors
/// Returns a numerical error if the matrix is not finite, not symmetric to rounding, or not
/// positive definite.
///
/// # Examples
///
/// ```
/// use isoratio::math::invert_spd_2x2;
/// use ndarray::arr2;
///
/// let inverse = invert_spd_2x2(&arr2(&[[4., 1.], [1., 2.]])).unwrap();
/// let expected = arr2(&[[2., -1.], [-1., 4.]]) / 7.;
/// assert!((inverse - expected).iter().all(|e| e.abs() < 1e-15));
/// ```
pub fn invert_spd_2x2(matrix: &Array2<f64>) -> Result<Array2<f64>> {
    if matrix.dim() != (2, 2) {
        return Err(Error::input_shape(format!(
            "expected a 2 x 2 matrix, got {:?}",
            matrix.dim()
        )));
    }
    if matrix.iter().any(|e| !e.is_finite()) {
        return Err(Error::numerical(format!(
            "matrix has non-finite elements: {matrix}"
        )));
    }

    let (a, b, c, d) = (
        matrix[[0, 0]],
        matrix[[0, 1]],
        matrix[[1, 0]],
        matrix[[1, 1]],
    );
    let scale = a.abs().max(d.abs()).max(b.abs());
    if (b - c).abs() > 1e-8 * scale {
        return Err(Error::numerical(format!("matrix is not symmetric: {matrix}")));
    }

    let b = 0.5 * (b + c);
    let determinant = a.mul_add(d, -b * b);
    if a <= 0. || d <= 0. || determinant <= f64::EPSILON * a * d {
        return Err(Error::numerical(format!(
            "matrix is singular or not positive definite (determinant {determinant}): {matrix}"
        )));
    }

    let mut inverse = Array2::zeros((2, 2));
    inverse[[0, 0]] = d / determinant;
    inverse[[0, 1]] = -b / determinant;
    inverse[[1, 0]] = -b / determinant;
    inverse[[1, 1]] = a / determinant;
    Ok(inverse)
}
