use ndarray::Array2;
use serde::Serialize;

use crate::{Error, Result};

/// The two fitted ratios of a sample with their standard errors and error correlation
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RatioEstimate {
    pub name: String,
    /// P / D
    pub x: f64,
    pub sx: f64,
    /// d / D
    pub y: f64,
    pub sy: f64,
    pub rho: f64,
}

impl RatioEstimate {
    /// Summarise a fit and its 2 x 2 covariance matrix
    ///
    /// When either standard error vanishes the correlation is undefined and reported as zero.
    ///
    /// # Errors
    /// Returns a numerical error if any value is non-finite or a variance is negative.
    pub fn from_covariance(
        name: impl Into<String>,
        (x, y): (f64, f64),
        covariance: &Array2<f64>,
    ) -> Result<Self> {
        let name = name.into();
        let (var_x, var_y, cov_xy) = (covariance[[0, 0]], covariance[[1, 1]], covariance[[0, 1]]);

        if [x, y, var_x, var_y, cov_xy].iter().any(|v| !v.is_finite()) {
            return Err(Error::numerical(format!(
                "non-finite estimate for `{name}`: x = {x}, y = {y}, covariance = {covariance}"
            )));
        }
        if var_x < 0. || var_y < 0. {
            return Err(Error::numerical(format!(
                "negative variance for `{name}`: var(x) = {var_x}, var(y) = {var_y}"
            )));
        }

        let sx = var_x.sqrt();
        let sy = var_y.sqrt();
        let rho = if sx * sy > 0. {
            (cov_xy / (sx * sy)).clamp(-1., 1.)
        } else {
            0.
        };

        Ok(Self {
            name,
            x,
            sx,
            y,
            sy,
            rho,
        })
    }

    /// The covariance matrix implied by the standard errors and correlation
    pub fn covariance(&self) -> Array2<f64> {
        let cov_xy = self.rho * self.sx * self.sy;
        ndarray::arr2(&[[self.sx * self.sx, cov_xy], [cov_xy, self.sy * self.sy]])
    }
}
