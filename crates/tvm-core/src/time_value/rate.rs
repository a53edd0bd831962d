use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, trace, warn};

use crate::config::SolverConfig;
use crate::error::{ensure_finite, TvmError};
use crate::types::{Money, PaymentTiming, Rate, RootSolution};
use crate::TvmResult;

/// Decimal places successive RATE guesses are rounded to before comparing.
const GUESS_DECIMAL_PLACES: u32 = 20;

/// Round half-even to `places` decimals. Values outside the decimal range
/// are returned unchanged.
fn round_to_places(value: f64, places: u32) -> f64 {
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp(places))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

/// Newton step `g(r) / g'(r)` for the annuity equation
/// `g(r) = fv + pv (1+r)^n + pmt ((1+r)^n - 1)(1 + r w) / r`,
/// with `g'` in closed form.
fn newton_step(
    r: Rate,
    n: f64,
    pmt: Money,
    pv: Money,
    fv: Money,
    timing: PaymentTiming,
    iteration: u32,
) -> TvmResult<f64> {
    if r == 0.0 {
        return Err(TvmError::division_by_zero(format!(
            "RATE Newton step at rate = 0 (iteration {iteration})"
        )));
    }

    let w = timing.factor();
    let t1 = (r + 1.0).powf(n);
    let t2 = (r + 1.0).powf(n - 1.0);
    let due = r * w + 1.0;

    let value = fv + t1 * pv + pmt * (t1 - 1.0) * due / r;
    let slope = n * t2 * pv - pmt * (t1 - 1.0) * due / (r * r)
        + n * pmt * t2 * due / r
        + pmt * (t1 - 1.0) * w / r;

    if slope == 0.0 {
        return Err(TvmError::ZeroDerivative {
            function: "RATE".into(),
            iteration,
        });
    }

    let step = value / slope;
    if !step.is_finite() {
        return Err(TvmError::domain(
            "rate",
            format!("Newton step is not finite at rate = {r} (iteration {iteration})"),
        ));
    }
    Ok(step)
}

/// Periodic interest rate solving the annuity equation (RATE).
///
/// Newton-Raphson from `rate_guess`, capped at the default iteration budget.
pub fn rate(
    nper: f64,
    pmt: Money,
    pv: Money,
    fv: Money,
    timing: PaymentTiming,
    rate_guess: Rate,
) -> TvmResult<Rate> {
    rate_with_config(nper, pmt, pv, fv, timing, rate_guess, &SolverConfig::rate())
}

/// [`rate`] with explicit tolerance and iteration cap.
pub fn rate_with_config(
    nper: f64,
    pmt: Money,
    pv: Money,
    fv: Money,
    timing: PaymentTiming,
    rate_guess: Rate,
    config: &SolverConfig,
) -> TvmResult<Rate> {
    solve_rate(nper, pmt, pv, fv, timing, rate_guess, config).map(|solution| solution.root)
}

/// Run the RATE search and report the iteration count alongside the root.
///
/// Each new guess is rounded to 20 decimal places; iteration stops once
/// two successive guesses differ by strictly less than the tolerance.
pub fn solve_rate(
    nper: f64,
    pmt: Money,
    pv: Money,
    fv: Money,
    timing: PaymentTiming,
    rate_guess: Rate,
    config: &SolverConfig,
) -> TvmResult<RootSolution> {
    config.validate()?;
    ensure_finite("nper", nper)?;
    ensure_finite("pmt", pmt)?;
    ensure_finite("pv", pv)?;
    ensure_finite("fv", fv)?;
    ensure_finite("rate_guess", rate_guess)?;

    let mut guess = rate_guess;
    let mut last_delta = f64::INFINITY;

    for iteration in 0..config.max_iterations {
        let step = newton_step(guess, nper, pmt, pv, fv, timing, iteration)?;
        let next_guess = round_to_places(guess - step, GUESS_DECIMAL_PLACES);
        let delta = (next_guess - guess).abs();
        trace!(iteration, rate = next_guess, delta, "RATE Newton step");

        if delta < config.tolerance {
            debug!(iterations = iteration + 1, rate = next_guess, "RATE converged");
            return Ok(RootSolution {
                root: next_guess,
                iterations: iteration + 1,
            });
        }

        last_delta = delta;
        guess = next_guess;
    }

    warn!(
        iterations = config.max_iterations,
        last_delta, "RATE exceeded its iteration cap"
    );
    Err(TvmError::ConvergenceFailure {
        function: "RATE".into(),
        iterations: config.max_iterations,
        last_delta,
    })
}
