use itertools::izip;
use ndarray::{arr1, arr2, Array2};

use crate::math::outer_product;
use crate::sample::AtomicSeries;
use crate::{Error, Result};

/// Ratios of sums with delta method errors
///
/// Without the physical model the ratios are simply `x = sum(P) / sum(D)` and
/// `y = sum(d) / sum(D)`. The covariance of the three sums is `n` times the sample covariance
/// of the sweeps, and is propagated through the Jacobian of `(P, D, d) -> (P / D, d / D)`.
/// This assumes the sweeps are independent and identically distributed, so it understates the
/// error of signals with structure in time.
///
/// Returns the ratios and their 2 x 2 covariance matrix.
///
/// # Errors
/// - an input shape error for fewer than two sweeps
/// - a numerical error if the daughter signal sums to zero
pub fn ratio_of_sums(series: &AtomicSeries) -> Result<((f64, f64), Array2<f64>)> {
    let n = series.len();
    if n < 2 {
        return Err(Error::input_shape(format!(
            "the sample covariance needs at least two sweeps, got {n}"
        )));
    }

    let sums = arr1(&[
        series.parent().sum(),
        series.daughter().sum(),
        series.sister().sum(),
    ]);
    #[allow(clippy::cast_precision_loss)]
    let n = n as f64;
    let means = &sums / n;

    let scatter = izip!(series.parent(), series.daughter(), series.sister()).fold(
        Array2::zeros((3, 3)),
        |scatter, (&parent, &daughter, &sister)| {
            let deviation = arr1(&[parent, daughter, sister]) - &means;
            scatter + outer_product(&deviation, &deviation)
        },
    );
    // Covariance of the sums: n times the sample covariance of the sweeps
    let sum_covariance = scatter * (n / (n - 1.));

    let (parent, daughter, sister) = (sums[0], sums[1], sums[2]);
    let x = parent / daughter;
    let y = sister / daughter;

    let jacobian = arr2(&[
        [1. / daughter, -parent / (daughter * daughter), 0.],
        [0., -sister / (daughter * daughter), 1. / daughter],
    ]);
    let mut covariance = jacobian.dot(&sum_covariance).dot(&jacobian.t());

    if !(x.is_finite() && y.is_finite()) || covariance.iter().any(|e| !e.is_finite()) {
        return Err(Error::numerical(format!(
            "ratio of sums is not finite, the daughter signal sums to {daughter}"
        )));
    }

    // J S J^T is positive semi-definite, negative variances are rounding
    for ii in 0..2 {
        covariance[[ii, ii]] = covariance[[ii, ii]].max(0.);
    }

    Ok(((x, y), covariance))
}
