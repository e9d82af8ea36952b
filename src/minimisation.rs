use argmin::core::observers::{ObserverMode, SlogLogger};
use argmin::core::{CostFunction, Executor, State, TerminationReason, TerminationStatus};
use argmin::solver::neldermead::NelderMead;
use log::debug;

use crate::config::OptimiserConfig;
use crate::model::RatioProblem;
use crate::{Error, Result};

impl CostFunction for RatioProblem {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, p: &Self::Param) -> ::std::result::Result<Self::Output, argmin::core::Error> {
        let cost = self.misfit(p[0], p[1]);
        if cost.is_finite() {
            Ok(cost)
        } else {
            Err(argmin::core::Error::msg(format!(
                "objective is not finite at x = {}, y = {}",
                p[0], p[1]
            )))
        }
    }
}

/// Offset of the initial simplex vertices from the starting point
fn simplex_step(value: f64) -> f64 {
    if value == 0. {
        0.000_25
    } else {
        0.05 * value
    }
}

impl RatioProblem {
    /// Find the ratios `(x, y)` minimising the objective
    ///
    /// The search starts from the ratio of sums and uses a Nelder-Mead simplex, which needs no
    /// derivatives and is indifferent to the scale of the objective. The simplex has converged
    /// when the spread of its costs falls below `tolerance` relative to the starting cost.
    ///
    /// # Errors
    /// Returns a numerical error if the starting point or objective is not finite, or if the
    /// optimiser exhausts `max_iters` without converging.
    pub fn solve(&self, config: &OptimiserConfig) -> Result<(f64, f64)> {
        self.minimise(config).map(|(fit, _)| fit)
    }

    /// The fitted ratios and the number of iterations taken
    fn minimise(&self, config: &OptimiserConfig) -> Result<((f64, f64), u64)> {
        let (x0, y0) = self.series().ratio_of_sums();
        let initial_cost = self.misfit(x0, y0);
        if !(x0.is_finite() && y0.is_finite() && initial_cost.is_finite()) {
            return Err(Error::numerical(format!(
                "no finite starting point for the fit: x = {x0}, y = {y0}, cost = {initial_cost}"
            )));
        }

        let simplex = vec![
            vec![x0, y0],
            vec![x0 + simplex_step(x0), y0],
            vec![x0, y0 + simplex_step(y0)],
        ];
        let solver = NelderMead::new(simplex)
            .with_sd_tolerance(config.tolerance * initial_cost.max(1.))
            .map_err(|e| Error::numerical(format!("invalid optimiser settings: {e}")))?;

        let executor = Executor::new(self.clone(), solver)
            .configure(|state| state.max_iters(config.max_iters));
        let executor = if config.observe {
            executor.add_observer(SlogLogger::term(), ObserverMode::Always)
        } else {
            executor
        };

        let res = executor
            .run()
            .map_err(|e| Error::numerical(format!("optimiser failed: {e}")))?;
        let state = res.state();

        if *state.get_termination_status()
            == TerminationStatus::Terminated(TerminationReason::MaxItersReached)
        {
            return Err(Error::numerical(format!(
                "optimiser did not converge within {} iterations",
                config.max_iters
            )));
        }

        let param = state
            .get_best_param()
            .ok_or_else(|| Error::numerical("optimiser returned no parameters"))?;
        let (x, y) = (param[0], param[1]);
        let cost = state.get_best_cost();
        if !(x.is_finite() && y.is_finite() && cost.is_finite()) {
            return Err(Error::numerical(format!(
                "optimiser converged to a non-finite point: x = {x}, y = {y}, cost = {cost}"
            )));
        }

        let iterations = state.get_iter();
        debug!("fit converged after {iterations} iterations: x = {x}, y = {y}, cost = {cost}");
        Ok(((x, y), iterations))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{arr1, Array1};

    use crate::config::OptimiserConfig;
    use crate::model::{RatioProblem, Variances};
    use crate::sample::AtomicSeries;
    use crate::ErrorKind;

    use super::simplex_step;

    fn problem() -> RatioProblem {
        let series = AtomicSeries::new(
            arr1(&[10., 11., 9., 10., 10.]),
            arr1(&[100., 102., 98., 101., 99.]),
            arr1(&[5., 5.2, 4.8, 5., 5.]),
        )
        .unwrap();
        let variances = Variances::new(
            Array1::from_elem(5, 0.75),
            Array1::from_elem(5, 4.125),
            Array1::from_elem(5, 0.03),
        )
        .unwrap();
        RatioProblem::new(series, variances).unwrap()
    }

    #[test]
    fn solution_is_a_stationary_point() {
        let problem = problem();
        let (x, y) = problem.solve(&OptimiserConfig::default()).unwrap();

        approx::assert_relative_eq!(x, 0.1, max_relative = 0.05);
        approx::assert_relative_eq!(y, 0.05, max_relative = 0.05);

        let [gx, gy] = crate::autodiff::gradient(&problem, x, y);
        let h = crate::autodiff::hessian(&problem, x, y);
        // A Newton step from the solution is negligible against the standard errors
        assert!((gx / h[[0, 0]]).abs() < 1e-3 * (1. / h[[0, 0]]).sqrt());
        assert!((gy / h[[1, 1]]).abs() < 1e-3 * (1. / h[[1, 1]]).sqrt());
    }

    #[test]
    fn exhausted_iteration_budget_is_an_error() {
        let config = OptimiserConfig {
            max_iters: 2,
            tolerance: 1e-30,
            observe: false,
        };
        let err = problem().solve(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Numerical);
        assert!(err.to_string().contains("did not converge"));
    }

    #[test]
    fn converging_on_the_last_allowed_iteration_succeeds() {
        let problem = problem();
        let (fit, iterations) = problem.minimise(&OptimiserConfig::default()).unwrap();
        assert!(iterations > 2);

        let config = OptimiserConfig {
            max_iters: iterations,
            ..OptimiserConfig::default()
        };
        assert_eq!(problem.solve(&config).unwrap(), fit);

        let config = OptimiserConfig {
            max_iters: iterations - 1,
            ..OptimiserConfig::default()
        };
        assert!(problem.solve(&config).is_err());
    }

    #[test]
    fn zero_ratios_still_get_a_proper_simplex() {
        assert!(simplex_step(0.) > 0.);
        approx::assert_relative_eq!(simplex_step(2.), 0.1);
    }
}
