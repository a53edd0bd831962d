//! Time-value-of-money functions with HP-12C sign and timing conventions.
//!
//! Cash paid out is negative, cash received is positive. Closed-form
//! functions live in [`annuity`] and [`amortization`]; [`cash_flow`]
//! values uneven sequences in extended-range decimal; [`irr`] and [`rate`] are the
//! Newton-Raphson root finders built on top of them.

pub mod amortization;
pub mod annuity;
pub mod cash_flow;
pub mod irr;
pub mod rate;

pub use amortization::{ipmt, ppmt};
pub use annuity::{annuity_factor, fv, nper, pmt, pv};
pub use cash_flow::{npv, npv_decimal, npv_derivative, NpvDerivative};
pub use irr::{irr, irr_with_config, solve_irr};
pub use rate::{rate, rate_with_config, solve_rate};
