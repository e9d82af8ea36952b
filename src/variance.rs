//! Time-resolved variance of ablation signals
//!
//! The intensity of a laser ablation signal drifts over the course of a measurement, so the
//! scatter of the sweeps around their mean overstates the measurement noise. Instead the
//! variance at each sweep is estimated from successive differences within a local window,
//! which removes any slowly varying trend:
//!
//! $$
//!     \hat\sigma^2_i = \frac{1}{2 (w - 1)} \sum_{j} \left(x_{j + 1} - x_j\right)^2
//! $$
//!
//! where the sum runs over the `w - 1` consecutive pairs inside the window around sweep `i`.

use ndarray::{s, Array1};

use crate::{Error, Result};

/// The shortest series for which a variance can be estimated
pub const MIN_SWEEPS: usize = 3;

/// Estimate the variance of every sweep of `series`
///
/// The window spans `2 * half_window + 1` sweeps centred on the current sweep. Near the ends of
/// the series the window is shifted inwards rather than truncated, so every estimate uses the
/// same number of sweeps. When the series is shorter than the window, every sweep shares the
/// variance of the whole series. A window over a plateau of identical values, common for low
/// count isotopes, also takes the whole-series estimate rather than zero. Only a series with
/// no variation at all yields zero variances.
///
/// # Errors
/// - an input shape error if `series` holds fewer than [`MIN_SWEEPS`] values
/// - a configuration error if `half_window` is zero
pub fn var_timeseries(series: &Array1<f64>, half_window: usize) -> Result<Array1<f64>> {
    let n = series.len();
    if n < MIN_SWEEPS {
        return Err(Error::input_shape(format!(
            "variance estimation needs at least {MIN_SWEEPS} sweeps, got {n}"
        )));
    }
    if half_window == 0 {
        return Err(Error::configuration(
            "variance half window must be at least one sweep",
        ));
    }

    let width = (2 * half_window + 1).min(n);

    // Squared successive differences, element `j` pairs sweeps `j` and `j + 1`
    let squared_differences = (&series.slice(s![1..]) - &series.slice(s![..-1])).mapv(|d| d * d);

    #[allow(clippy::cast_precision_loss)]
    let normalisation = 2. * (width - 1) as f64;
    #[allow(clippy::cast_precision_loss)]
    let global = squared_differences.sum() / (2. * (n - 1) as f64);

    let variances = (0..n)
        .map(|ii| {
            let start = ii.saturating_sub(half_window).min(n - width);
            let local = squared_differences
                .slice(s![start..start + width - 1])
                .sum()
                / normalisation;
            if local > 0. {
                local
            } else {
                global
            }
        })
        .collect();

    Ok(variances)
}
