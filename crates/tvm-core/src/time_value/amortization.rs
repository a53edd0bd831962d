use crate::error::{ensure_finite, ensure_finite_result, TvmError};
use crate::time_value::annuity::{fv, pmt};
use crate::types::{Money, PaymentTiming, Rate};
use crate::TvmResult;

fn check_period(per: u32, nper: f64) -> TvmResult<()> {
    ensure_finite("nper", nper)?;
    if per == 0 || f64::from(per) > nper {
        return Err(TvmError::PeriodOutOfRange { per, nper });
    }
    Ok(())
}

/// Interest portion of the payment due in period `per` (1-based).
///
/// The interest is the rate applied to the balance carried into the
/// period, i.e. the future value after `per - 1` payments. Under
/// annuity-due timing the first payment lands before any interest accrues,
/// so period 1 returns exactly `0.0`.
pub fn ipmt(
    rate: Rate,
    per: u32,
    nper: f64,
    pv: Money,
    fv_target: Money,
    timing: PaymentTiming,
) -> TvmResult<Money> {
    check_period(per, nper)?;

    let payment = pmt(rate, nper, pv, fv_target, timing)?;
    if per == 1 && timing.is_beginning() {
        return Ok(0.0);
    }

    let balance = fv(rate, f64::from(per - 1), payment, pv, timing)?;
    let mut interest = balance * rate;
    if timing.is_beginning() {
        interest /= 1.0 + rate;
    }

    ensure_finite_result("ipmt", interest)
}

/// Principal portion of the payment due in period `per`: `pmt - ipmt`.
pub fn ppmt(
    rate: Rate,
    per: u32,
    nper: f64,
    pv: Money,
    fv_target: Money,
    timing: PaymentTiming,
) -> TvmResult<Money> {
    let payment = pmt(rate, nper, pv, fv_target, timing)?;
    let interest = ipmt(rate, per, nper, pv, fv_target, timing)?;
    Ok(payment - interest)
}
