use tracing::{debug, trace, warn};

use crate::config::SolverConfig;
use crate::error::{ensure_finite, TvmError};
use crate::time_value::cash_flow::{decimal_cash_flows, value_and_slope, NpvDerivative};
use crate::types::{Money, Rate, RootSolution};
use crate::TvmResult;

fn non_convergence(iterations: u32, last_delta: f64) -> TvmError {
    TvmError::ConvergenceFailure {
        function: "IRR".into(),
        iterations,
        last_delta,
    }
}

/// Internal Rate of Return using Newton-Raphson on [`npv`](crate::time_value::npv).
///
/// Starts from `guess` and stops once two successive guesses are within
/// `1e-6` of each other, returning the newer one. Exhausting
/// `max_iterations` is reported as `ConvergenceFailure`, never as a rate.
pub fn irr(cash_flows: &[Money], guess: Rate, max_iterations: u32) -> TvmResult<Rate> {
    let config = SolverConfig::irr().with_max_iterations(max_iterations);
    irr_with_config(cash_flows, guess, &config, NpvDerivative::default())
}

/// [`irr`] with explicit solver settings and derivative formula.
pub fn irr_with_config(
    cash_flows: &[Money],
    guess: Rate,
    config: &SolverConfig,
    derivative: NpvDerivative,
) -> TvmResult<Rate> {
    solve_irr(cash_flows, guess, config, derivative).map(|solution| solution.root)
}

/// Run the IRR search and report the iteration count alongside the root.
pub fn solve_irr(
    cash_flows: &[Money],
    guess: Rate,
    config: &SolverConfig,
    derivative: NpvDerivative,
) -> TvmResult<RootSolution> {
    config.validate()?;
    ensure_finite("guess", guess)?;
    if cash_flows.len() < 2 {
        return Err(TvmError::InsufficientData("IRR requires at least 2 cash flows".into()));
    }
    let flows = decimal_cash_flows(cash_flows)?;

    let mut x0 = guess;
    let mut last_delta = f64::INFINITY;

    for iteration in 0..config.max_iterations {
        let (value, slope) = match value_and_slope(x0, &flows, derivative) {
            Ok(pair) => pair,
            // NPV at this guess is past the f64 range.
            Err(TvmError::Overflow { context }) => {
                warn!(iteration, rate = x0, %context, "IRR diverged");
                return Err(non_convergence(iteration, last_delta));
            }
            Err(e) => return Err(e),
        };

        if slope == 0.0 {
            return Err(TvmError::ZeroDerivative {
                function: "IRR".into(),
                iteration,
            });
        }

        let x1 = x0 - value / slope;
        if !x1.is_finite() {
            warn!(iteration, rate = x0, "IRR step left the finite range");
            return Err(non_convergence(iteration, last_delta));
        }

        let delta = (x1 - x0).abs();
        trace!(iteration, rate = x1, delta, "IRR Newton step");

        if delta <= config.tolerance {
            debug!(iterations = iteration + 1, rate = x1, "IRR converged");
            return Ok(RootSolution {
                root: x1,
                iterations: iteration + 1,
            });
        }

        last_delta = delta;
        x0 = x1;
    }

    warn!(
        iterations = config.max_iterations,
        last_delta, "IRR did not converge"
    );
    Err(non_convergence(config.max_iterations, last_delta))
}
