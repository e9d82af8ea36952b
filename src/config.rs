use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Run-wide settings for the ratio engine
///
/// Every field has a default, so a configuration file only needs to name the settings it
/// changes.
///
/// ```toml
/// physics = true
/// numerical = false
///
/// [variance]
/// half_window = 7
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Fit the nonlinear errors-in-variables model. When false the linear delta-method
    /// fallback is used instead.
    pub physics: bool,
    /// Obtain the covariance from the automatically differentiated Hessian. When false the
    /// analytic block elimination is used.
    pub numerical: bool,
    /// Process samples on the rayon thread pool. Ignored without the `parallel` feature.
    pub parallel: bool,
    pub variance: VarianceConfig,
    pub optimiser: OptimiserConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            physics: true,
            numerical: true,
            parallel: true,
            variance: VarianceConfig::default(),
            optimiser: OptimiserConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct VarianceConfig {
    /// Number of sweeps either side of the current one used for the local variance.
    pub half_window: usize,
}

impl Default for VarianceConfig {
    fn default() -> Self {
        Self { half_window: 5 }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimiserConfig {
    /// Hitting this many iterations is reported as a failed fit
    pub max_iters: u64,
    /// Convergence threshold on the spread of simplex costs, relative to the starting cost
    pub tolerance: f64,
    /// Log every optimiser iteration to the terminal
    pub observe: bool,
}

impl Default for OptimiserConfig {
    fn default() -> Self {
        Self {
            max_iters: 1000,
            tolerance: 1e-10,
            observe: false,
        }
    }
}

impl Config {
    /// Read a configuration from a TOML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid TOML or holds settings that
    /// fail validation.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        contents.parse()
    }

    /// Check the settings are usable before any sample is processed
    ///
    /// # Errors
    /// Returns a configuration error for a zero variance window, a zero iteration budget or a
    /// non-positive tolerance.
    pub fn validate(&self) -> Result<()> {
        if self.variance.half_window == 0 {
            return Err(Error::configuration(
                "variance half window must be at least one sweep",
            ));
        }
        if self.optimiser.max_iters == 0 {
            return Err(Error::configuration(
                "optimiser needs at least one iteration",
            ));
        }
        if !(self.optimiser.tolerance.is_finite() && self.optimiser.tolerance > 0.0) {
            return Err(Error::configuration(format!(
                "optimiser tolerance must be positive, got {}",
                self.optimiser.tolerance
            )));
        }
        Ok(())
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}
