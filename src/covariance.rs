//! Covariance of the fitted ratios
//!
//! The objective is a negative log-likelihood, so the asymptotic covariance of `(x, y)` is the
//! inverse of its Hessian at the optimum. Two routes to the same matrix are provided:
//!
//! - [`AutoDiffHessian`] differentiates the profiled objective directly,
//! - [`AnalyticBlockElimination`] writes down the Hessian of the full problem over
//!   `(x, y, D_1, ..., D_n)` and eliminates the sweep-wise daughter intensities with a Schur
//!   complement.
//!
//! Because the fused daughter series is the exact minimiser over the nuisance parameters, the
//! two agree at any `(x, y)`, not only at the optimum.

use ndarray::{Array1, Array2, Axis};

use crate::autodiff::hessian;
use crate::math::invert_spd_2x2;
use crate::model::RatioProblem;
use crate::Result;

/// A way of computing the 2 x 2 covariance matrix of the fitted ratios
pub trait CovarianceStrategy: Send + Sync {
    /// # Errors
    /// Returns a numerical error if the information matrix is singular or not positive
    /// definite.
    fn covariance(&self, problem: &RatioProblem, x: f64, y: f64) -> Result<Array2<f64>>;
}

/// Inverse of the profiled objective's Hessian, obtained by automatic differentiation
#[derive(Clone, Copy, Debug, Default)]
pub struct AutoDiffHessian;

impl CovarianceStrategy for AutoDiffHessian {
    fn covariance(&self, problem: &RatioProblem, x: f64, y: f64) -> Result<Array2<f64>> {
        invert_spd_2x2(&hessian(problem, x, y))
    }
}

/// Schur complement of the joint Hessian over the ratios and the fused daughter series
///
/// The joint Hessian is partitioned as
///
/// $$
///     H = \begin{pmatrix} H_{11} & H_{12} \\\\ H_{21} & H_{22} \end{pmatrix}
/// $$
///
/// where $H_{11}$ is the 2 x 2 block of the ratios and $H_{22}$ the n x n block of the daughter
/// intensities. Each intensity only enters the residuals of its own sweep, so $H_{22}$ is
/// diagonal and the elimination costs O(n).
#[derive(Clone, Copy, Debug, Default)]
pub struct AnalyticBlockElimination;

impl AnalyticBlockElimination {
    /// The three blocks of the joint Hessian, with the diagonal of $H_{22}$ as a vector
    pub(crate) fn blocks(
        problem: &RatioProblem,
        x: f64,
        y: f64,
    ) -> (Array2<f64>, Array2<f64>, Array1<f64>) {
        let n = problem.series().len();
        let mut h11: Array2<f64> = Array2::zeros((2, 2));
        let mut h12 = Array2::zeros((2, n));
        let mut h22 = Array1::zeros(n);

        for (ii, sweep) in problem.sweeps().enumerate() {
            let fused = sweep.fused_daughter(x, y);
            h11[[0, 0]] += fused * fused / sweep.var_parent;
            h11[[1, 1]] += fused * fused / sweep.var_sister;
            h12[[0, ii]] = 2.0f64.mul_add(fused * x, -sweep.parent) / sweep.var_parent;
            h12[[1, ii]] = 2.0f64.mul_add(fused * y, -sweep.sister) / sweep.var_sister;
            h22[ii] = x * x / sweep.var_parent + y * y / sweep.var_sister + 1. / sweep.var_daughter;
        }

        (h11, h12, h22)
    }
}

impl CovarianceStrategy for AnalyticBlockElimination {
    fn covariance(&self, problem: &RatioProblem, x: f64, y: f64) -> Result<Array2<f64>> {
        let (h11, h12, h22) = Self::blocks(problem, x, y);
        let scaled = &h12 / &h22.view().insert_axis(Axis(0));
        let schur = h11 - scaled.dot(&h12.t());
        invert_spd_2x2(&schur)
    }
}

/// Pick the covariance strategy for the `numerical` flag
pub fn strategy(numerical: bool) -> &'static dyn CovarianceStrategy {
    if numerical {
        &AutoDiffHessian
    } else {
        &AnalyticBlockElimination
    }
}
