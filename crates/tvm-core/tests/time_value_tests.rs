use approx::{assert_abs_diff_eq, assert_relative_eq};
use tvm_core::config::{IRR_DEFAULT_GUESS, IRR_MAX_ITERATIONS, RATE_DEFAULT_GUESS};
use tvm_core::time_value::{
    fv, ipmt, irr, irr_with_config, nper, npv, pmt, ppmt, pv, rate, solve_irr, NpvDerivative,
};
use tvm_core::{PaymentTiming, SolverConfig, TvmError};

// ===========================================================================
// Annuity core
// ===========================================================================

#[test]
fn test_pv_ten_year_annuity() {
    // 1000 a year for 10 years at 10%
    let result = pv(0.10, 10.0, -1000.0, 0.0, PaymentTiming::End).unwrap();
    assert_abs_diff_eq!(result, 6144.57, epsilon = 0.01);
}

#[test]
fn test_fv_savings_plan() {
    // 100 deposited each period for 10 periods at 5%
    let result = fv(0.05, 10.0, -100.0, 0.0, PaymentTiming::End).unwrap();
    assert_abs_diff_eq!(result, 1257.79, epsilon = 0.01);
}

#[test]
fn test_mortgage_payment() {
    // 200,000 over 30 years at 6% / 12 monthly: payment 1199.10
    let result = pmt(0.005, 360.0, 200_000.0, 0.0, PaymentTiming::End).unwrap();
    assert_abs_diff_eq!(result, -1199.10, epsilon = 0.01);
}

#[test]
fn test_nper_mortgage_term() {
    let result = nper(0.005, -1199.10, 200_000.0, 0.0, PaymentTiming::End).unwrap();
    assert_abs_diff_eq!(result, 360.0, epsilon = 0.01);
}

#[test]
fn test_balloon_payment_reduces_pmt() {
    let plain = pmt(0.005, 60.0, 30_000.0, 0.0, PaymentTiming::End).unwrap();
    let balloon = pmt(0.005, 60.0, 30_000.0, -10_000.0, PaymentTiming::End).unwrap();
    assert!(balloon.abs() < plain.abs());
}

// ===========================================================================
// Amortization split
// ===========================================================================

#[test]
fn test_mortgage_first_month_split() {
    let interest = ipmt(0.005, 1, 360.0, 200_000.0, 0.0, PaymentTiming::End).unwrap();
    let principal = ppmt(0.005, 1, 360.0, 200_000.0, 0.0, PaymentTiming::End).unwrap();
    assert_abs_diff_eq!(interest, -1000.0, epsilon = 1e-9);
    assert_abs_diff_eq!(principal, -199.10, epsilon = 0.01);
}

#[test]
fn test_annuity_due_first_period_has_no_interest() {
    let interest = ipmt(0.005, 1, 360.0, 200_000.0, 0.0, PaymentTiming::Beginning).unwrap();
    assert_eq!(interest, 0.0);
}

#[test]
fn test_split_rejects_period_past_term() {
    let result = ppmt(0.005, 361, 360.0, 200_000.0, 0.0, PaymentTiming::End);
    assert!(matches!(result, Err(TvmError::PeriodOutOfRange { per: 361, .. })));
}

// ===========================================================================
// Cash-flow valuation and root finders
// ===========================================================================

#[test]
fn test_npv_long_sequence_matches_annuity_pv() {
    // 360 level flows discounted by NPV equal the closed-form PV
    let flows = vec![1199.10; 360];
    let by_npv = npv(0.005, &flows).unwrap();
    let by_pv = pv(0.005, 360.0, -1199.10, 0.0, PaymentTiming::End).unwrap();
    assert_abs_diff_eq!(by_npv, by_pv, epsilon = 1e-6);
}

#[test]
fn test_npv_long_sequences_far_from_zero_rate() {
    // Discount factors here leave the 28-digit fixed-point range long before
    // the last flow; the result must still track the closed form.
    for (rate, periods) in [(-0.5, 100), (-0.5, 80), (0.25, 300), (1.0, 100), (3.0, 360)] {
        let flows = vec![250.0; periods];
        let by_npv = npv(rate, &flows).unwrap();
        let by_pv = pv(rate, periods as f64, -250.0, 0.0, PaymentTiming::End).unwrap();
        assert_relative_eq!(by_npv, by_pv, max_relative = 1e-12);
    }
}

#[test]
fn test_irr_zeroes_npv() {
    let flows = [-1000.0, 300.0, 300.0, 300.0, 300.0, 300.0];
    let result = irr(&flows, IRR_DEFAULT_GUESS, IRR_MAX_ITERATIONS).unwrap();
    assert_abs_diff_eq!(npv(result, &flows).unwrap(), 0.0, epsilon = 1e-6);
}

#[test]
fn test_irr_uneven_flows() {
    let flows = [-5000.0, 1200.0, 1400.0, 1600.0, 1800.0, 2000.0];
    let result = irr(&flows, IRR_DEFAULT_GUESS, IRR_MAX_ITERATIONS).unwrap();
    assert!(result > 0.10 && result < 0.20, "IRR should be ~16.4%, got {result}");
    assert_abs_diff_eq!(npv(result, &flows).unwrap(), 0.0, epsilon = 1e-6);
}

#[test]
fn test_irr_derivative_choice_changes_path_not_root() {
    let flows = [-5000.0, 1200.0, 1400.0, 1600.0, 1800.0, 2000.0];
    let config = SolverConfig::irr();
    let analytic = solve_irr(&flows, IRR_DEFAULT_GUESS, &config, NpvDerivative::Analytic).unwrap();
    let reference =
        solve_irr(&flows, IRR_DEFAULT_GUESS, &config, NpvDerivative::Reference).unwrap();

    assert_abs_diff_eq!(analytic.root, reference.root, epsilon = 1e-5);
    assert_ne!(analytic.iterations, reference.iterations);
}

#[test]
fn test_irr_no_sign_change_is_absent() {
    let result = irr(&[500.0, 500.0, 500.0, 500.0], IRR_DEFAULT_GUESS, IRR_MAX_ITERATIONS);
    assert!(matches!(result, Err(TvmError::ConvergenceFailure { .. })));

    let result = irr_with_config(
        &[-500.0, -500.0, -500.0],
        IRR_DEFAULT_GUESS,
        &SolverConfig::irr(),
        NpvDerivative::Reference,
    );
    assert!(result.is_err());
}

#[test]
fn test_rate_solves_loan() {
    let r = rate(12.0, -100.0, 1000.0, 0.0, PaymentTiming::End, RATE_DEFAULT_GUESS).unwrap();
    let check = pmt(r, 12.0, 1000.0, 0.0, PaymentTiming::End).unwrap();
    assert_abs_diff_eq!(check, -100.0, epsilon = 1e-6);
}

#[test]
fn test_rate_agrees_with_irr_on_level_flows() {
    // A loan of 1000 repaid by 5 x 300 is the IRR problem viewed as an annuity
    let by_rate = rate(5.0, 300.0, -1000.0, 0.0, PaymentTiming::End, RATE_DEFAULT_GUESS).unwrap();
    let by_irr = irr(
        &[-1000.0, 300.0, 300.0, 300.0, 300.0, 300.0],
        IRR_DEFAULT_GUESS,
        IRR_MAX_ITERATIONS,
    )
    .unwrap();
    assert_abs_diff_eq!(by_rate, by_irr, epsilon = 1e-6);
}
