use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, TvmError};
use crate::scaled_decimal::ScaledDecimal;
use crate::types::{Money, Rate};
use crate::TvmResult;

/// Which derivative of NPV drives the IRR Newton step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NpvDerivative {
    /// True derivative of [`npv`]: `-(i+1) * c_i / (1+x)^(i+2)`.
    #[default]
    Analytic,
    /// HP-12C port formula `-i * c_i / (1+x)^(i-1)`. It does not match the
    /// derivative of [`npv`] but reproduces the historical iteration path.
    Reference,
}

/// Convert one input to decimal, rejecting NaN and infinities.
fn to_decimal(field: &str, value: f64) -> TvmResult<ScaledDecimal> {
    ensure_finite(field, value)?;
    ScaledDecimal::from_f64(value).ok_or_else(|| TvmError::Overflow {
        context: format!("{field} = {value} has no decimal representation"),
    })
}

fn to_f64(context: &str, value: ScaledDecimal) -> TvmResult<f64> {
    value.to_f64().ok_or_else(|| TvmError::Overflow {
        context: format!("{context} = {value} is beyond the f64 range"),
    })
}

fn overflow(context: &str, index: usize) -> TvmError {
    TvmError::Overflow {
        context: format!("{context} at cash flow {index}"),
    }
}

/// Cash flows converted once, so a solver can revalue them at many rates.
pub(crate) fn decimal_cash_flows(cash_flows: &[Money]) -> TvmResult<Vec<ScaledDecimal>> {
    cash_flows
        .iter()
        .map(|cf| to_decimal("cash_flows", *cf))
        .collect()
}

pub(crate) fn one_plus(field: &str, rate: Rate) -> TvmResult<ScaledDecimal> {
    to_decimal(field, rate)?
        .checked_add(ScaledDecimal::ONE)
        .ok_or_else(|| TvmError::Overflow {
            context: format!("1 + {field}"),
        })
}

/// `numerator / (1 + rate)^exponent`.
fn discounted_term(
    context: &str,
    index: usize,
    numerator: ScaledDecimal,
    one_plus_r: ScaledDecimal,
    exponent: u32,
) -> TvmResult<ScaledDecimal> {
    let discount = one_plus_r
        .checked_powi(exponent)
        .ok_or_else(|| overflow(context, index))?;
    if discount.is_zero() {
        return Err(TvmError::division_by_zero(format!(
            "{context} discount factor at cash flow {index}"
        )));
    }
    numerator
        .checked_div(discount)
        .ok_or_else(|| overflow(context, index))
}

pub(crate) fn discounted_sum(
    one_plus_r: ScaledDecimal,
    cash_flows: &[ScaledDecimal],
) -> TvmResult<ScaledDecimal> {
    let mut total = ScaledDecimal::ZERO;
    for (index, cash_flow) in cash_flows.iter().enumerate() {
        let term = discounted_term("NPV", index, *cash_flow, one_plus_r, index as u32 + 1)?;
        total = total
            .checked_add(term)
            .ok_or_else(|| overflow("NPV sum", index))?;
    }
    Ok(total)
}

pub(crate) fn derivative_sum(
    one_plus_r: ScaledDecimal,
    cash_flows: &[ScaledDecimal],
    derivative: NpvDerivative,
) -> TvmResult<ScaledDecimal> {
    let mut total = ScaledDecimal::ZERO;
    for (index, cash_flow) in cash_flows.iter().enumerate() {
        let i = index as u32;
        let (coefficient, exponent) = match derivative {
            NpvDerivative::Analytic => (i + 1, i + 2),
            // The first flow carries a zero coefficient.
            NpvDerivative::Reference if i == 0 => continue,
            NpvDerivative::Reference => (i, i - 1),
        };
        let coefficient = -ScaledDecimal::from(Decimal::from(coefficient));
        let numerator = coefficient
            .checked_mul(*cash_flow)
            .ok_or_else(|| overflow("NPV derivative", index))?;
        let term = discounted_term("NPV derivative", index, numerator, one_plus_r, exponent)?;
        total = total
            .checked_add(term)
            .ok_or_else(|| overflow("NPV derivative sum", index))?;
    }
    Ok(total)
}

/// Net Present Value kept in decimal.
///
/// The first cash flow is discounted by one full period:
/// `sum_{k=1..N} c[k-1] / (1 + rate)^k`. Every term carries 28 significant
/// digits however far the discount factor grows or shrinks.
pub fn npv_decimal(discount_rate: Rate, cash_flows: &[Money]) -> TvmResult<ScaledDecimal> {
    let one_plus_r = one_plus("discount_rate", discount_rate)?;
    discounted_sum(one_plus_r, &decimal_cash_flows(cash_flows)?)
}

/// Net Present Value of a periodic cash-flow sequence.
///
/// Accumulates in decimal and converts to `f64` once, so long sequences do
/// not drift. An empty sequence is worth `0.0`. A value past the `f64`
/// range is reported as `Overflow`.
pub fn npv(discount_rate: Rate, cash_flows: &[Money]) -> TvmResult<Money> {
    let total = npv_decimal(discount_rate, cash_flows)?;
    to_f64("NPV", total)
}

/// Derivative of NPV with respect to the discount rate, as used by IRR.
pub fn npv_derivative(
    discount_rate: Rate,
    cash_flows: &[Money],
    derivative: NpvDerivative,
) -> TvmResult<f64> {
    let one_plus_r = one_plus("discount_rate", discount_rate)?;
    let total = derivative_sum(one_plus_r, &decimal_cash_flows(cash_flows)?, derivative)?;
    to_f64("NPV derivative", total)
}

/// NPV and its derivative at one rate, both as `f64`.
pub(crate) fn value_and_slope(
    rate: Rate,
    cash_flows: &[ScaledDecimal],
    derivative: NpvDerivative,
) -> TvmResult<(f64, f64)> {
    let one_plus_r = one_plus("rate", rate)?;
    let value = to_f64("NPV", discounted_sum(one_plus_r, cash_flows)?)?;
    let slope = to_f64(
        "NPV derivative",
        derivative_sum(one_plus_r, cash_flows, derivative)?,
    )?;
    Ok((value, slope))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rust_decimal_macros::dec;

    #[test]
    fn test_npv_basic() {
        // 100 / 1.1 + 100 / 1.21 = 173.5537
        let result = npv(0.10, &[100.0, 100.0]).unwrap();
        assert_abs_diff_eq!(result, 173.5537, epsilon = 1e-4);
    }

    #[test]
    fn test_npv_discounts_first_flow() {
        let result = npv(0.10, &[110.0]).unwrap();
        assert_abs_diff_eq!(result, 100.0, epsilon = 1e-12);
    }

    #[test]
    fn test_npv_zero_rate_is_plain_sum() {
        let result = npv(0.0, &[-100.0, 50.0, 50.0, 50.0]).unwrap();
        assert_eq!(result, 50.0);
    }

    #[test]
    fn test_npv_empty_is_zero() {
        assert_eq!(npv(0.10, &[]).unwrap(), 0.0);
        assert_eq!(npv(-1.0, &[]).unwrap(), 0.0);
    }

    #[test]
    fn test_npv_decimal_is_exact_for_decimal_friendly_inputs() {
        let result = npv_decimal(0.25, &[125.0, 156.25]).unwrap();
        assert_eq!(result.to_decimal(), Some(dec!(200)));
    }

    #[test]
    fn test_npv_long_sequence_with_growing_discount() {
        // At -50% each flow is worth twice the previous one: sum = 2^(N+1) - 2.
        let result = npv(-0.5, &[1.0; 80]).unwrap();
        assert_relative_eq!(result, 2f64.powi(81) - 2.0, max_relative = 1e-15);

        let result = npv(-0.5, &[1.0; 100]).unwrap();
        assert_relative_eq!(result, 2f64.powi(101), max_relative = 1e-15);
    }

    #[test]
    fn test_npv_long_sequence_with_vanishing_discount() {
        // Perpetuity limit 1/r once (1+r)^N passes the f64 resolution.
        assert_eq!(npv(1.0, &[1.0; 100]).unwrap(), 1.0);
        assert_eq!(npv(0.25, &[1.0; 300]).unwrap(), 4.0);
    }

    #[test]
    fn test_npv_beyond_f64_range_is_overflow() {
        let result = npv(-0.9, &[1e10; 320]);
        assert!(matches!(result, Err(TvmError::Overflow { .. })));
    }

    #[test]
    fn test_npv_rate_minus_one_is_division_by_zero() {
        let result = npv(-1.0, &[100.0]);
        assert!(matches!(result, Err(TvmError::DivisionByZero { .. })));
    }

    #[test]
    fn test_npv_rejects_nan_cash_flow() {
        let result = npv(0.05, &[100.0, f64::NAN]);
        match result.unwrap_err() {
            TvmError::InvalidInput { field, .. } => assert_eq!(field, "cash_flows"),
            e => panic!("Expected InvalidInput, got {e:?}"),
        }
    }

    #[test]
    fn test_analytic_derivative_matches_finite_difference() {
        let flows = [-1000.0, 300.0, 400.0, 500.0];
        let h = 1e-6;
        let numeric =
            (npv(0.08 + h, &flows).unwrap() - npv(0.08 - h, &flows).unwrap()) / (2.0 * h);
        let analytic = npv_derivative(0.08, &flows, NpvDerivative::Analytic).unwrap();
        assert_abs_diff_eq!(analytic, numeric, epsilon = 1e-4);
    }

    #[test]
    fn test_reference_derivative_formula() {
        // -1 * 300 / 1.1^0 + -2 * 400 / 1.1^1 = -300 - 727.2727
        let flows = [-1000.0, 300.0, 400.0];
        let result = npv_derivative(0.10, &flows, NpvDerivative::Reference).unwrap();
        assert_abs_diff_eq!(result, -1027.2727, epsilon = 1e-4);
    }

    #[test]
    fn test_derivatives_disagree() {
        let flows = [-1000.0, 300.0, 300.0, 300.0];
        let analytic = npv_derivative(0.05, &flows, NpvDerivative::Analytic).unwrap();
        let reference = npv_derivative(0.05, &flows, NpvDerivative::Reference).unwrap();
        assert!((analytic - reference).abs() > 1.0);
    }
}
