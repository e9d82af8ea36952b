use log::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::Config;
use crate::covariance;
use crate::error::{AtStage, Stage};
use crate::estimate::RatioEstimate;
use crate::extraction::{BlankCorrection, Extract};
use crate::linear;
use crate::model::{RatioProblem, Variances};
use crate::reparam::TransformRegistry;
use crate::sample::{AtomicSeries, BlankTable, ChannelMap, Parameters, Sample};
use crate::table::{RatioRow, RatioTable};
use crate::variance::var_timeseries;
use crate::Result;

/// Average the ratios of every sample in a run with the default settings
///
/// `physics` selects the nonlinear model over the ratio of sums and `numerical` the
/// automatically differentiated covariance over the analytic one. The run stops at the first
/// sample that fails.
///
/// # Errors
/// Returns the first per-sample error, naming the sample and the failing stage.
pub fn averat(
    run: &[Sample],
    channels: &ChannelMap,
    blank: &BlankTable,
    parameters: &Parameters,
    method: &str,
    physics: bool,
    numerical: bool,
) -> Result<RatioTable> {
    let config = Config {
        physics,
        numerical,
        ..Config::default()
    };
    Averager::new(config).run(run, channels, blank, parameters, method)
}

/// The ratio averaging pipeline with its settings, extraction step and method transforms
pub struct Averager<X = BlankCorrection> {
    config: Config,
    extractor: X,
    transforms: TransformRegistry,
}

impl Averager<BlankCorrection> {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            extractor: BlankCorrection,
            transforms: TransformRegistry::default(),
        }
    }
}

impl<X: Extract> Averager<X> {
    /// Replace the extraction step
    pub fn with_extractor<Y: Extract>(self, extractor: Y) -> Averager<Y> {
        Averager {
            config: self.config,
            extractor,
            transforms: self.transforms,
        }
    }

    #[must_use]
    pub fn with_transforms(mut self, transforms: TransformRegistry) -> Self {
        self.transforms = transforms;
        self
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Process every sample of `run`, returning one row per sample in the same order
    ///
    /// # Errors
    /// Returns a configuration error for invalid settings, otherwise the error of the first
    /// failing sample in run order.
    pub fn run(
        &self,
        run: &[Sample],
        channels: &ChannelMap,
        blank: &BlankTable,
        parameters: &Parameters,
        method: &str,
    ) -> Result<RatioTable> {
        self.config.validate()?;
        info!(
            "averaging {} samples with method {method} (physics: {}, numerical: {})",
            run.len(),
            self.config.physics,
            self.config.numerical
        );

        let process = |sample: &Sample| self.sample(sample, channels, blank, parameters, method);

        #[cfg(feature = "parallel")]
        let rows: Vec<Result<RatioRow>> = if self.config.parallel {
            run.par_iter().map(process).collect()
        } else {
            run.iter().map(process).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let rows: Vec<Result<RatioRow>> = run.iter().map(process).collect();

        let mut table =
            RatioTable::with_capacity(method, self.transforms.columns(method), run.len());
        for row in rows {
            let row = row.map_err(|e| {
                warn!("{e}");
                e
            })?;
            table.push(row)?;
        }
        Ok(table)
    }

    /// Estimate the ratios of a single sample
    ///
    /// # Errors
    /// Returns an error naming the sample and the stage that failed.
    pub fn sample(
        &self,
        sample: &Sample,
        channels: &ChannelMap,
        blank: &BlankTable,
        parameters: &Parameters,
        method: &str,
    ) -> Result<RatioRow> {
        let name = sample.name();
        let series = self
            .extractor
            .extract(sample, channels, blank, parameters)
            .at_stage(name, Stage::Extraction)?;

        let estimate = self.estimate(name, series)?;

        let extra = match self.transforms.get(method) {
            Some(transform) => transform
                .apply(&estimate)
                .at_stage(name, Stage::Reparameterisation)?,
            None => vec![],
        };

        Ok(RatioRow { estimate, extra })
    }

    /// Fit the ratios of already extracted series
    ///
    /// # Errors
    /// Returns an error naming the sample and the stage that failed.
    pub fn estimate(&self, name: &str, series: AtomicSeries) -> Result<RatioEstimate> {
        if !self.config.physics {
            debug!("{name}: ratio of sums over {} sweeps", series.len());
            let (fit, covariance) =
                linear::ratio_of_sums(&series).at_stage(name, Stage::Covariance)?;
            return RatioEstimate::from_covariance(name, fit, &covariance)
                .at_stage(name, Stage::Covariance);
        }

        let variances = sweep_variances(&series, self.config.variance.half_window)
            .at_stage(name, Stage::VarianceEstimation)?;

        let problem =
            RatioProblem::new(series, variances).at_stage(name, Stage::VarianceEstimation)?;

        debug!("{name}: fitting {} sweeps", problem.series().len());
        let fit = problem
            .solve(&self.config.optimiser)
            .at_stage(name, Stage::Optimisation)?;

        let (x, y) = fit;
        covariance::strategy(self.config.numerical)
            .covariance(&problem, x, y)
            .and_then(|covariance| RatioEstimate::from_covariance(name, fit, &covariance))
            .at_stage(name, Stage::Covariance)
    }
}

fn sweep_variances(series: &AtomicSeries, half_window: usize) -> Result<Variances> {
    Variances::new(
        var_timeseries(series.parent(), half_window)?,
        var_timeseries(series.daughter(), half_window)?,
        var_timeseries(series.sister(), half_window)?,
    )
}

#[cfg(test)]
mod tests {
    use ndarray::{arr1, Array1};

    use super::{averat, Averager};
    use crate::config::Config;
    use crate::error::Stage;
    use crate::sample::{BlankTable, Channel, ChannelMap, Parameters, Sample};
    use crate::ErrorKind;

    fn channels() -> ChannelMap {
        ChannelMap::new(
            Channel::from("U238"),
            Channel::from("Pb206"),
            Channel::from("Pb207"),
        )
    }

    fn blank() -> BlankTable {
        BlankTable::default()
            .with(Channel::from("U238"), 0.)
            .with(Channel::from("Pb206"), 0.)
            .with(Channel::from("Pb207"), 0.)
    }

    fn sample(name: &str, parent: &[f64], daughter: &[f64], sister: &[f64]) -> Sample {
        Sample::new(name)
            .with_channel(Channel::from("U238"), arr1(parent))
            .with_channel(Channel::from("Pb206"), arr1(daughter))
            .with_channel(Channel::from("Pb207"), arr1(sister))
    }

    fn reference() -> Sample {
        sample(
            "reference",
            &[10., 11., 9., 10., 10.],
            &[100., 102., 98., 101., 99.],
            &[5., 5.2, 4.8, 5., 5.],
        )
    }

    #[test]
    fn rows_follow_the_sample_order() {
        let run = (0..8)
            .map(|ii| {
                let scale = f64::from(ii + 1);
                sample(
                    &format!("s{ii}"),
                    &[10. * scale, 11. * scale, 9. * scale, 10. * scale, 10. * scale],
                    &[100., 102., 98., 101., 99.],
                    &[5., 5.2, 4.8, 5., 5.],
                )
            })
            .collect::<Vec<_>>();

        let table = averat(&run, &channels(), &blank(), &Parameters::default(), "U-Pb", true, true)
            .unwrap();

        assert_eq!(table.len(), run.len());
        for (ii, row) in table.rows().iter().enumerate() {
            assert_eq!(row.estimate.name, format!("s{ii}"));
            approx::assert_relative_eq!(row.estimate.x, 0.1 * (ii + 1) as f64, max_relative = 0.05);
        }
    }

    #[test]
    fn sequential_and_parallel_runs_agree() {
        let run = vec![reference(), reference()];
        let parallel = Averager::new(Config::default())
            .run(&run, &channels(), &blank(), &Parameters::default(), "U-Pb")
            .unwrap();
        let sequential = Averager::new(Config {
            parallel: false,
            ..Config::default()
        })
        .run(&run, &channels(), &blank(), &Parameters::default(), "U-Pb")
        .unwrap();

        assert_eq!(parallel, sequential);
    }

    #[test]
    fn flags_reach_every_sample() {
        let run = vec![reference()];
        let parameters = Parameters::default();
        let physical = averat(&run, &channels(), &blank(), &parameters, "U-Pb", true, true).unwrap();
        let linear = averat(&run, &channels(), &blank(), &parameters, "U-Pb", false, true).unwrap();

        let (physical, linear) = (&physical.rows()[0].estimate, &linear.rows()[0].estimate);
        approx::assert_relative_eq!(linear.x, 0.1, max_relative = 1e-12);
        approx::assert_relative_eq!(linear.y, 0.05, max_relative = 1e-12);
        assert!(physical.sx > 0.);
        assert!((physical.sx - linear.sx).abs() > 1e-12);
    }

    #[test]
    fn first_failing_sample_aborts_the_run() {
        let constant = sample(
            "flat",
            &[10., 10., 10., 10.],
            &[100., 100., 100., 100.],
            &[5., 5., 5., 5.],
        );
        let run = vec![reference(), constant, reference()];

        let err = averat(&run, &channels(), &blank(), &Parameters::default(), "U-Pb", true, true)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Numerical);
        assert_eq!(err.stage(), Some(Stage::VarianceEstimation));
        assert!(err.to_string().contains("`flat`"));
    }

    #[test]
    fn extraction_failures_name_the_stage() {
        let run = vec![Sample::new("empty")
            .with_channel(Channel::from("U238"), Array1::zeros(3))
            .with_channel(Channel::from("Pb206"), Array1::zeros(3))];

        let err = averat(&run, &channels(), &blank(), &Parameters::default(), "U-Pb", true, true)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.stage(), Some(Stage::Extraction));
    }
}
