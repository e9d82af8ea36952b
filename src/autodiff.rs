//! Exact derivatives of two-parameter objectives
//!
//! Objectives are written once, generic over [`DualNum`], and evaluated on plain `f64` for
//! the fit or on `num_dual`'s second order dual numbers for the curvature. Derivatives are
//! exact to rounding, with no step size to tune.

use nalgebra::SVector;
use ndarray::Array2;
use num_dual::DualNum;

/// A function of two variables generic over the scalar it is evaluated on
pub trait TwiceDifferentiable {
    fn evaluate<D: DualNum<f64>>(&self, x: D, y: D) -> D;
}

/// The Hessian of `f` at `(x, y)`
pub fn hessian<F: TwiceDifferentiable>(f: &F, x: f64, y: f64) -> Array2<f64> {
    let (_, _, h) = num_dual::hessian(|v| f.evaluate(v[0], v[1]), SVector::from([x, y]));
    Array2::from_shape_fn((2, 2), |(ii, jj)| h[(ii, jj)])
}

/// The gradient of `f` at `(x, y)`
pub fn gradient<F: TwiceDifferentiable>(f: &F, x: f64, y: f64) -> [f64; 2] {
    let (_, g) = num_dual::gradient(|v| f.evaluate(v[0], v[1]), SVector::from([x, y]));
    [g[0], g[1]]
}
