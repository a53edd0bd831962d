pub mod calculator;
pub mod config;
pub mod error;
pub mod scaled_decimal;
pub mod time_value;
pub mod types;

pub use config::SolverConfig;
pub use error::TvmError;
pub use scaled_decimal::ScaledDecimal;
pub use time_value::*;
pub use types::*;

/// Standard result type for all time-value operations
pub type TvmResult<T> = Result<T, TvmError>;
