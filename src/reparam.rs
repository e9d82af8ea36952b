//! Method specific transforms applied to the fitted ratios
//!
//! Most decay systems report `x` and `y` as they are. Systems that need their own isotope
//! ratios register a [`RatioTransform`] against the method tag in a [`TransformRegistry`], which
//! also fixes the extra output columns for that method.

use std::collections::HashMap;

use serde::Serialize;

use crate::estimate::RatioEstimate;
use crate::{Error, Result};

/// Tag of the Rb-Sr method
pub const RB_SR: &str = "Rb-Sr";

/// Post-processing of a base estimate into method specific ratios
pub trait RatioTransform: Send + Sync {
    /// Names of the extra columns, in the order [`RatioTransform::apply`] returns them
    fn columns(&self) -> &'static [&'static str];

    /// # Errors
    /// Returns a numerical error if the transformed values are not finite.
    fn apply(&self, estimate: &RatioEstimate) -> Result<Vec<f64>>;
}

/// Rb87/Sr86 and Sr87/Sr86 with their standard errors
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RbSrRatios {
    pub rb87_sr86: f64,
    pub s_rb87_sr86: f64,
    pub sr87_sr86: f64,
    pub s_sr87_sr86: f64,
}

/// Converts `(x, y)` into Rb87/Sr86 and Sr87/Sr86
///
/// `y` is the reciprocal of Sr87/Sr86 and `x` times Sr87/Sr86 gives Rb87/Sr86. Relative errors
/// are combined with the fitted correlation:
///
/// $$
///     \left(\frac{\sigma_R}{R}\right)^2 = \left(\frac{\sigma_x}{x}\right)^2
///     + \left(\frac{\sigma_S}{S}\right)^2 + 2 \rho \frac{\sigma_x}{x} \frac{\sigma_S}{S}
/// $$
///
/// with $S$ = Sr87/Sr86 and $R$ = Rb87/Sr86. It is evaluated multiplied through by $R^2$ so a
/// zero `x` does not divide by zero.
#[derive(Clone, Copy, Debug, Default)]
pub struct RbSr;

impl RbSr {
    /// # Errors
    /// Returns a numerical error if `y` is zero or the results are not finite.
    pub fn transform(estimate: &RatioEstimate) -> Result<RbSrRatios> {
        let RatioEstimate {
            x, sx, y, sy, rho, ..
        } = *estimate;
        if y == 0. {
            return Err(Error::numerical(format!(
                "Sr87/Sr86 is undefined for `{}`, y = 0",
                estimate.name
            )));
        }

        let sr87_sr86 = y.recip();
        let s_sr87_sr86 = sy * sr87_sr86 * sr87_sr86;
        let rb87_sr86 = x * sr87_sr86;
        let variance = (sr87_sr86 * sx).powi(2)
            + (x * s_sr87_sr86).powi(2)
            + 2. * rho * x * sr87_sr86 * sx * s_sr87_sr86;
        let s_rb87_sr86 = variance.max(0.).sqrt();

        let ratios = RbSrRatios {
            rb87_sr86,
            s_rb87_sr86,
            sr87_sr86,
            s_sr87_sr86,
        };
        if [rb87_sr86, s_rb87_sr86, sr87_sr86, s_sr87_sr86]
            .iter()
            .any(|v| !v.is_finite())
        {
            return Err(Error::numerical(format!(
                "non-finite Rb-Sr ratios for `{}`: {ratios:?}",
                estimate.name
            )));
        }
        Ok(ratios)
    }
}

impl RatioTransform for RbSr {
    fn columns(&self) -> &'static [&'static str] {
        &["Rb87Sr86", "s[Rb87Sr86]", "Sr87Sr86", "s[Sr87Sr86]"]
    }

    fn apply(&self, estimate: &RatioEstimate) -> Result<Vec<f64>> {
        let ratios = Self::transform(estimate)?;
        Ok(vec![
            ratios.rb87_sr86,
            ratios.s_rb87_sr86,
            ratios.sr87_sr86,
            ratios.s_sr87_sr86,
        ])
    }
}

/// Method tag to transform lookup
pub struct TransformRegistry(HashMap<String, Box<dyn RatioTransform>>);

impl TransformRegistry {
    /// A registry with no transforms, every method reports the base columns
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    #[must_use]
    pub fn with(mut self, method: &str, transform: Box<dyn RatioTransform>) -> Self {
        self.0.insert(method.to_owned(), transform);
        self
    }

    pub fn get(&self, method: &str) -> Option<&dyn RatioTransform> {
        self.0.get(method).map(|transform| &**transform)
    }

    /// Extra columns emitted for `method`
    pub fn columns(&self, method: &str) -> &'static [&'static str] {
        self.get(method)
            .map_or(&[][..], |transform| transform.columns())
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::empty().with(RB_SR, Box::new(RbSr))
    }
}
