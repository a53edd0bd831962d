use serde::{Deserialize, Serialize};

use crate::error::TvmError;
use crate::TvmResult;

/// Step size below which a Newton iteration is considered converged.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// IRR starting point: effectively zero, but never exactly zero.
pub const IRR_DEFAULT_GUESS: f64 = 1e-16;

pub const IRR_MAX_ITERATIONS: u32 = 30;

pub const RATE_DEFAULT_GUESS: f64 = 0.10;

/// Safety cap for RATE, which would otherwise iterate until converged.
pub const RATE_MAX_ITERATIONS: u32 = 100;

/// Configuration for the Newton-Raphson root finders.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Convergence threshold on the distance between successive guesses.
    pub tolerance: f64,
    /// Maximum number of Newton steps before giving up.
    pub max_iterations: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self::irr()
    }
}

impl SolverConfig {
    #[must_use]
    pub fn new(tolerance: f64, max_iterations: u32) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }

    /// IRR defaults: tolerance 1e-6, 30 iterations.
    #[must_use]
    pub fn irr() -> Self {
        Self::new(DEFAULT_TOLERANCE, IRR_MAX_ITERATIONS)
    }

    /// RATE defaults: tolerance 1e-6, capped at 100 iterations.
    #[must_use]
    pub fn rate() -> Self {
        Self::new(DEFAULT_TOLERANCE, RATE_MAX_ITERATIONS)
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn validate(&self) -> TvmResult<()> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(TvmError::InvalidInput {
                field: "tolerance".into(),
                reason: format!("must be a positive finite number, got {}", self.tolerance),
            });
        }
        if self.max_iterations == 0 {
            return Err(TvmError::InvalidInput {
                field: "max_iterations".into(),
                reason: "must be > 0".into(),
            });
        }
        Ok(())
    }
}
