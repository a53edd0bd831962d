use thiserror::Error;

#[derive(Debug, Error)]
pub enum TvmError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Domain error in {function}: {reason}")]
    DomainError { function: String, reason: String },

    #[error("Zero derivative: {function} cannot take a Newton step at iteration {iteration}")]
    ZeroDerivative { function: String, iteration: u32 },

    #[error("Period out of range: per = {per} must lie in [1, {nper}]")]
    PeriodOutOfRange { per: u32, nper: f64 },

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: f64,
    },

    #[error("Numeric overflow in {context}")]
    Overflow { context: String },
}

impl TvmError {
    pub(crate) fn domain(function: &str, reason: impl Into<String>) -> Self {
        TvmError::DomainError {
            function: function.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn division_by_zero(context: impl Into<String>) -> Self {
        TvmError::DivisionByZero {
            context: context.into(),
        }
    }
}

/// Reject NaN and infinite arguments before they reach any formula.
pub(crate) fn ensure_finite(field: &str, value: f64) -> Result<f64, TvmError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(TvmError::InvalidInput {
            field: field.into(),
            reason: format!("must be a finite number, got {value}"),
        })
    }
}

/// Surface a non-finite closed-form result as a domain error.
pub(crate) fn ensure_finite_result(function: &str, value: f64) -> Result<f64, TvmError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(TvmError::domain(
            function,
            format!("result is not a finite number ({value})"),
        ))
    }
}
