//! The errors-in-variables model for two isotope ratios sharing a denominator
//!
//! The three channels are treated as independent noisy observations of a single latent
//! trajectory $D_i$ of the daughter (denominator) isotope, scaled by the two ratios of interest
//!
//! $$
//!     \hat P_i \sim N(x D_i, v_{P,i}), \quad \hat D_i \sim N(D_i, v_{D,i}), \quad
//!     \hat d_i \sim N(y D_i, v_{d,i}).
//! $$
//!
//! For fixed $(x, y)$ the maximum likelihood estimate of each $D_i$ has a closed form, computed
//! by [`averat_d`], so the sweep-wise nuisance parameters can be profiled out and the fit only
//! has to search the two ratios.

use itertools::izip;
use ndarray::Array1;
use num_dual::DualNum;
use num_traits::{One, Zero};

use crate::autodiff::TwiceDifferentiable;
use crate::sample::{check_shape, AtomicSeries};
use crate::{Error, Result};

/// Per-sweep variances for each role, all strictly positive
#[derive(Clone, Debug, PartialEq)]
pub struct Variances {
    pub(crate) parent: Array1<f64>,
    pub(crate) daughter: Array1<f64>,
    pub(crate) sister: Array1<f64>,
}

impl Variances {
    /// # Errors
    /// - an input shape error if the vectors are empty, differ in length or are not finite
    /// - a numerical error if any variance is zero or negative
    pub fn new(parent: Array1<f64>, daughter: Array1<f64>, sister: Array1<f64>) -> Result<Self> {
        check_shape([&parent, &daughter, &sister], "variance")?;
        for (role, variances) in [("P", &parent), ("D", &daughter), ("d", &sister)] {
            if let Some(index) = variances.iter().position(|&v| v <= 0.) {
                return Err(Error::numerical(format!(
                    "variance of {role} is {} at sweep {index}, variances must be positive",
                    variances[index]
                )));
            }
        }
        Ok(Self {
            parent,
            daughter,
            sister,
        })
    }

    pub fn len(&self) -> usize {
        self.daughter.len()
    }

    pub fn is_empty(&self) -> bool {
        self.daughter.is_empty()
    }
}

/// Observations and variances of one sweep
#[derive(Clone, Copy, Debug)]
pub(crate) struct Sweep {
    pub(crate) parent: f64,
    pub(crate) daughter: f64,
    pub(crate) sister: f64,
    pub(crate) var_parent: f64,
    pub(crate) var_daughter: f64,
    pub(crate) var_sister: f64,
}

impl Sweep {
    /// Inverse-variance weighted estimate of the latent daughter intensity
    ///
    /// Combines the measured $\hat D$ with the values implied by the other two channels,
    /// $\hat P / x$ and $\hat d / y$. The weights stay finite as either ratio goes to zero.
    pub(crate) fn fused_daughter<D: DualNum<f64>>(&self, x: D, y: D) -> D {
        let numerator = y.clone() * (self.sister * self.var_daughter * self.var_parent)
            + x.clone() * (self.parent * self.var_daughter * self.var_sister)
            + D::one() * (self.daughter * self.var_parent * self.var_sister);
        let denominator = y.clone() * y * (self.var_daughter * self.var_parent)
            + x.clone() * x * (self.var_daughter * self.var_sister)
            + D::one() * (self.var_parent * self.var_sister);
        numerator / denominator
    }

    /// Half the sum of the three normalised squared residuals
    fn misfit<D: DualNum<f64>>(&self, x: D, y: D) -> D {
        let fused = self.fused_daughter(x.clone(), y.clone());
        let sister = fused.clone() * y - self.sister;
        let parent = fused.clone() * x - self.parent;
        let daughter = fused - self.daughter;
        (sister.clone() * sister / self.var_sister
            + parent.clone() * parent / self.var_parent
            + daughter.clone() * daughter / self.var_daughter)
            * 0.5
    }
}

/// The profiled least squares problem for the ratios `x = P / D` and `y = d / D`
#[derive(Clone, Debug)]
pub struct RatioProblem {
    series: AtomicSeries,
    variances: Variances,
}

impl RatioProblem {
    /// # Errors
    /// Returns an input shape error if `series` and `variances` differ in length.
    pub fn new(series: AtomicSeries, variances: Variances) -> Result<Self> {
        if series.len() != variances.len() {
            return Err(Error::input_shape(format!(
                "{} sweeps of signal but {} of variance",
                series.len(),
                variances.len()
            )));
        }
        Ok(Self { series, variances })
    }

    pub const fn series(&self) -> &AtomicSeries {
        &self.series
    }

    pub const fn variances(&self) -> &Variances {
        &self.variances
    }

    pub(crate) fn sweeps(&self) -> impl Iterator<Item = Sweep> + '_ {
        izip!(
            &self.series.parent,
            &self.series.daughter,
            &self.series.sister,
            &self.variances.parent,
            &self.variances.daughter,
            &self.variances.sister
        )
        .map(
            |(&parent, &daughter, &sister, &var_parent, &var_daughter, &var_sister)| Sweep {
                parent,
                daughter,
                sister,
                var_parent,
                var_daughter,
                var_sister,
            },
        )
    }

    /// The objective `S(x, y)`
    pub fn misfit(&self, x: f64, y: f64) -> f64 {
        self.evaluate(x, y)
    }
}

impl TwiceDifferentiable for RatioProblem {
    fn evaluate<D: DualNum<f64>>(&self, x: D, y: D) -> D {
        self.sweeps()
            .fold(D::zero(), |total, sweep| total + sweep.misfit(x.clone(), y.clone()))
    }
}

/// The fused estimate of the daughter series for ratios `x` and `y`
///
/// # Errors
/// Returns an input shape error if `series` and `variances` differ in length.
pub fn averat_d(x: f64, y: f64, series: &AtomicSeries, variances: &Variances) -> Result<Array1<f64>> {
    let problem = RatioProblem::new(series.clone(), variances.clone())?;
    Ok(problem
        .sweeps()
        .map(|sweep| sweep.fused_daughter(x, y))
        .collect())
}
