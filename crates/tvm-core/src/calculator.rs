use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use crate::config::{SolverConfig, IRR_DEFAULT_GUESS, RATE_DEFAULT_GUESS};
use crate::error::{ensure_finite, TvmError};
use crate::time_value::{fv, npv, nper, pmt, pv, solve_irr, solve_rate, NpvDerivative};
use crate::types::{with_metadata, ComputationOutput, Money, PaymentTiming, Rate};
use crate::TvmResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The five financial registers of an HP-12C style calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TvmRegister {
    N,
    I,
    Pv,
    Pmt,
    Fv,
}

impl fmt::Display for TvmRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TvmRegister::N => "N",
            TvmRegister::I => "I",
            TvmRegister::Pv => "PV",
            TvmRegister::Pmt => "PMT",
            TvmRegister::Fv => "FV",
        };
        f.write_str(label)
    }
}

/// Register contents. Exactly one of `n`, `i`, `pv`, `pmt`, `fv` is left
/// empty and gets solved for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TvmInput {
    /// Number of periods
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<f64>,
    /// Periodic rate as a decimal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub i: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pv: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pmt: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fv: Option<Money>,
    #[serde(default)]
    pub timing: PaymentTiming,
    /// Starting point when solving for `i` (defaults to 10%)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_guess: Option<Rate>,
    /// Iteration settings when solving for `i`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solver: Option<SolverConfig>,
}

/// All five registers after the solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TvmOutput {
    pub solved_for: TvmRegister,
    pub value: f64,
    pub n: f64,
    pub i: Rate,
    pub pv: Money,
    pub pmt: Money,
    pub fv: Money,
    pub timing: PaymentTiming,
    /// Newton iterations, only when solving for `i`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
}

/// A periodic cash-flow register set (CF1..CFn) and a discount rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowInput {
    pub discount_rate: Rate,
    pub cash_flows: Vec<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irr_guess: Option<Rate>,
    #[serde(default)]
    pub derivative: NpvDerivative,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solver: Option<SolverConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowOutput {
    pub npv: Money,
    /// `None` when the IRR search did not converge
    pub irr: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irr_iterations: Option<u32>,
    /// Undiscounted sum of the sequence
    pub total: Money,
    pub sign_changes: usize,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn unknown_register(input: &TvmInput) -> TvmResult<TvmRegister> {
    let registers = [
        (TvmRegister::N, input.n),
        (TvmRegister::I, input.i),
        (TvmRegister::Pv, input.pv),
        (TvmRegister::Pmt, input.pmt),
        (TvmRegister::Fv, input.fv),
    ];

    let mut empty = registers.iter().filter(|(_, v)| v.is_none()).map(|(r, _)| *r);
    match (empty.next(), empty.next()) {
        (Some(register), None) => Ok(register),
        (None, _) => Err(TvmError::InvalidInput {
            field: "registers".into(),
            reason: "all five registers are set; leave exactly one empty to solve for it".into(),
        }),
        (Some(_), Some(_)) => Err(TvmError::InvalidInput {
            field: "registers".into(),
            reason: "more than one register is empty; leave exactly one empty".into(),
        }),
    }
}

fn register_value(register: TvmRegister, value: Option<f64>) -> TvmResult<f64> {
    match value {
        Some(v) => ensure_finite(&register.to_string(), v),
        None => Ok(0.0),
    }
}

fn count_sign_changes(cash_flows: &[Money]) -> usize {
    let signs: Vec<bool> = cash_flows
        .iter()
        .filter(|cf| **cf != 0.0)
        .map(|cf| *cf > 0.0)
        .collect();
    signs.windows(2).filter(|w| w[0] != w[1]).count()
}

// ---------------------------------------------------------------------------
// Core functions
// ---------------------------------------------------------------------------

/// Solve the one empty TVM register from the other four.
///
/// At `i == 0` PV, PMT and FV use the linear relations
/// `pv + pmt * n + fv = 0`; the closed-form functions reject a zero rate.
pub fn solve_tvm(input: &TvmInput) -> TvmResult<ComputationOutput<TvmOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let unknown = unknown_register(input)?;
    // The empty register reads as 0.0 and is overwritten below.
    let mut n = register_value(TvmRegister::N, input.n)?;
    let mut i = register_value(TvmRegister::I, input.i)?;
    let mut present = register_value(TvmRegister::Pv, input.pv)?;
    let mut payment = register_value(TvmRegister::Pmt, input.pmt)?;
    let mut future = register_value(TvmRegister::Fv, input.fv)?;
    let timing = input.timing;
    let mut iterations = None;

    let methodology = match unknown {
        TvmRegister::N => {
            n = nper(i, payment, present, future, timing)?;
            "N via logarithmic annuity inversion"
        }
        TvmRegister::I => {
            let config = input.solver.unwrap_or_else(SolverConfig::rate);
            let guess = input.rate_guess.unwrap_or(RATE_DEFAULT_GUESS);
            let solution = solve_rate(n, payment, present, future, timing, guess, &config)?;
            i = solution.root;
            iterations = Some(solution.iterations);
            "I via Newton-Raphson on the annuity equation"
        }
        TvmRegister::Pv if i == 0.0 => {
            present = -(future + payment * n);
            "PV at zero rate (linear)"
        }
        TvmRegister::Pv => {
            present = pv(i, n, payment, future, timing)?;
            "PV via annuity factor"
        }
        TvmRegister::Pmt if i == 0.0 => {
            if n == 0.0 {
                return Err(TvmError::division_by_zero("PMT at zero rate (n = 0)"));
            }
            payment = -(present + future) / n;
            "PMT at zero rate (linear)"
        }
        TvmRegister::Pmt => {
            payment = pmt(i, n, present, future, timing)?;
            "PMT via annuity factor"
        }
        TvmRegister::Fv if i == 0.0 => {
            future = -(present + payment * n);
            "FV at zero rate (linear)"
        }
        TvmRegister::Fv => {
            future = fv(i, n, payment, present, timing)?;
            "FV via annuity factor"
        }
    };

    if n.fract() != 0.0 {
        warnings.push(format!("n = {n} is not a whole number of periods"));
    }
    if i < 0.0 {
        warnings.push(format!("Periodic rate {i} is negative"));
    }
    let cash: Vec<f64> = [present, payment, future]
        .into_iter()
        .filter(|v| *v != 0.0)
        .collect();
    if cash.len() > 1 && (cash.iter().all(|v| *v > 0.0) || cash.iter().all(|v| *v < 0.0)) {
        warnings.push(
            "PV, PMT and FV share a sign; a consistent problem needs both an inflow and an outflow"
                .to_string(),
        );
    }

    let value = match unknown {
        TvmRegister::N => n,
        TvmRegister::I => i,
        TvmRegister::Pv => present,
        TvmRegister::Pmt => payment,
        TvmRegister::Fv => future,
    };

    let output = TvmOutput {
        solved_for: unknown,
        value,
        n,
        i,
        pv: present,
        pmt: payment,
        fv: future,
        timing,
        iterations,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(methodology, input, warnings, elapsed, output))
}

/// NPV at the input discount rate, plus IRR when the search converges.
pub fn evaluate_cash_flows(
    input: &CashFlowInput,
) -> TvmResult<ComputationOutput<CashFlowOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let npv_value = npv(input.discount_rate, &input.cash_flows)?;
    let total: Money = input.cash_flows.iter().sum();
    let sign_changes = count_sign_changes(&input.cash_flows);

    if sign_changes == 0 {
        warnings.push("Cash flows never change sign; no IRR exists".to_string());
    } else if sign_changes > 1 {
        warnings.push(format!(
            "Cash flows change sign {sign_changes} times; more than one IRR may exist"
        ));
    }

    let (irr_value, irr_iterations) = if input.cash_flows.len() < 2 {
        warnings.push("IRR requires at least 2 cash flows".to_string());
        (None, None)
    } else {
        let config = input.solver.unwrap_or_else(SolverConfig::irr);
        let guess = input.irr_guess.unwrap_or(IRR_DEFAULT_GUESS);
        match solve_irr(&input.cash_flows, guess, &config, input.derivative) {
            Ok(solution) => (Some(solution.root), Some(solution.iterations)),
            Err(e @ (TvmError::ConvergenceFailure { .. } | TvmError::ZeroDerivative { .. })) => {
                warnings.push(format!("IRR not found: {e}"));
                (None, None)
            }
            Err(e) => return Err(e),
        }
    };

    let output = CashFlowOutput {
        npv: npv_value,
        irr: irr_value,
        irr_iterations,
        total,
        sign_changes,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "NPV in decimal accumulation; IRR via Newton-Raphson on NPV",
        input,
        warnings,
        elapsed,
        output,
    ))
}
