use crate::error::{ensure_finite, ensure_finite_result, TvmError};
use crate::types::{Money, PaymentTiming, Rate};
use crate::TvmResult;

/// Compound growth `(1 + rate)^nper` together with the annuity factor
/// `(1 + rate * timing) * ((1 + rate)^nper - 1) / rate`.
///
/// Every closed-form function goes through here so FV, PV and PMT can
/// never disagree numerically.
fn growth_and_factor(rate: Rate, nper: f64, timing: PaymentTiming) -> TvmResult<(f64, f64)> {
    ensure_finite("rate", rate)?;
    ensure_finite("nper", nper)?;

    if rate == 0.0 {
        return Err(TvmError::division_by_zero(
            "annuity factor (rate = 0; use the linear zero-rate relations)",
        ));
    }

    let growth = (1.0 + rate).powf(nper);
    let factor = (1.0 + rate * timing.factor()) * (growth - 1.0) / rate;

    Ok((growth, factor))
}

/// Annuity factor shared by [`fv`], [`pv`] and [`pmt`].
///
/// Fails with `DivisionByZero` at `rate == 0`.
pub fn annuity_factor(rate: Rate, nper: f64, timing: PaymentTiming) -> TvmResult<f64> {
    let (_, factor) = growth_and_factor(rate, nper, timing)?;
    ensure_finite_result("annuity_factor", factor)
}

/// Future Value: `-(pv * (1+rate)^nper + pmt * factor)`.
///
/// Unlike [`nper`], a zero rate is not special-cased here.
pub fn fv(rate: Rate, nper: f64, pmt: Money, pv: Money, timing: PaymentTiming) -> TvmResult<Money> {
    ensure_finite("pmt", pmt)?;
    ensure_finite("pv", pv)?;

    let (growth, factor) = growth_and_factor(rate, nper, timing)?;
    ensure_finite_result("fv", -(pv * growth + pmt * factor))
}

/// Present Value: `-(fv + pmt * factor) / (1+rate)^nper`.
pub fn pv(rate: Rate, nper: f64, pmt: Money, fv: Money, timing: PaymentTiming) -> TvmResult<Money> {
    ensure_finite("pmt", pmt)?;
    ensure_finite("fv", fv)?;

    let (growth, factor) = growth_and_factor(rate, nper, timing)?;
    if growth == 0.0 {
        return Err(TvmError::division_by_zero("PV discount factor (1 + rate)^nper"));
    }

    ensure_finite_result("pv", -(fv + pmt * factor) / growth)
}

/// Payment (PMT): the level payment `-(fv + pv * (1+rate)^nper) / factor`.
pub fn pmt(rate: Rate, nper: f64, pv: Money, fv: Money, timing: PaymentTiming) -> TvmResult<Money> {
    ensure_finite("pv", pv)?;
    ensure_finite("fv", fv)?;

    let (growth, factor) = growth_and_factor(rate, nper, timing)?;
    if factor == 0.0 {
        return Err(TvmError::division_by_zero("PMT annuity factor"));
    }

    ensure_finite_result("pmt", -(fv + pv * growth) / factor)
}

/// Number of periods (NPER).
///
/// At `rate == 0` the relation is linear and timing-independent:
/// `(-pv - fv) / pmt`. Otherwise, with `z = pmt * (1 + rate * timing) / rate`,
/// `nper = ln((z - fv) / (pv + z)) / ln(1 + rate)`.
pub fn nper(rate: Rate, pmt: Money, pv: Money, fv: Money, timing: PaymentTiming) -> TvmResult<f64> {
    ensure_finite("rate", rate)?;
    ensure_finite("pmt", pmt)?;
    ensure_finite("pv", pv)?;
    ensure_finite("fv", fv)?;

    if rate == 0.0 {
        if pmt == 0.0 {
            return Err(TvmError::division_by_zero("NPER at zero rate (pmt = 0)"));
        }
        return ensure_finite_result("nper", (-pv - fv) / pmt);
    }

    if rate <= -1.0 {
        return Err(TvmError::domain(
            "nper",
            format!("ln(1 + rate) is undefined for rate = {rate}"),
        ));
    }

    let z = pmt * (1.0 + rate * timing.factor()) / rate;
    let denominator = pv + z;
    if denominator == 0.0 {
        return Err(TvmError::division_by_zero("NPER log ratio (pv + pmt-adjusted term)"));
    }

    let ratio = (-fv + z) / denominator;
    if ratio <= 0.0 || !ratio.is_finite() {
        return Err(TvmError::domain(
            "nper",
            format!("logarithm of non-positive value {ratio}; payment cannot reach the target value"),
        ));
    }

    ensure_finite_result("nper", ratio.ln() / (1.0 + rate).ln())
}
