use serde::{Deserialize, Serialize};

use crate::error::TvmError;

/// Monetary amounts. Inflows and outflows carry opposite signs.
pub type Money = f64;

/// Periodic rates expressed as decimals (0.01 = 1% per period). Never as percentages.
pub type Rate = f64;

/// When payments fall within each period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentTiming {
    /// Ordinary annuity: payment at the end of the period (END, flag 0).
    #[default]
    End,
    /// Annuity-due: payment at the beginning of the period (BEG, flag 1).
    Beginning,
}

impl PaymentTiming {
    /// The numeric flag used in `1 + rate * timing`.
    pub fn factor(self) -> f64 {
        match self {
            PaymentTiming::End => 0.0,
            PaymentTiming::Beginning => 1.0,
        }
    }

    pub fn is_beginning(self) -> bool {
        self == PaymentTiming::Beginning
    }
}

impl TryFrom<u8> for PaymentTiming {
    type Error = TvmError;

    fn try_from(flag: u8) -> Result<Self, Self::Error> {
        match flag {
            0 => Ok(PaymentTiming::End),
            1 => Ok(PaymentTiming::Beginning),
            other => Err(TvmError::InvalidInput {
                field: "end_or_beginning".into(),
                reason: format!("timing flag must be 0 (end) or 1 (beginning), got {other}"),
            }),
        }
    }
}

impl From<PaymentTiming> for u8 {
    fn from(timing: PaymentTiming) -> Self {
        match timing {
            PaymentTiming::End => 0,
            PaymentTiming::Beginning => 1,
        }
    }
}

/// Root returned by a Newton-Raphson search, with the number of steps taken.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RootSolution {
    pub root: Rate,
    pub iterations: u32,
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "f64_with_decimal_accumulation".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_timing_flag_round_trip() {
        assert_eq!(PaymentTiming::try_from(0u8).unwrap(), PaymentTiming::End);
        assert_eq!(PaymentTiming::try_from(1u8).unwrap(), PaymentTiming::Beginning);
        assert_eq!(u8::from(PaymentTiming::Beginning), 1);
        assert!(PaymentTiming::try_from(2u8).is_err());
    }

    #[test]
    fn test_timing_default_is_end() {
        assert_eq!(PaymentTiming::default(), PaymentTiming::End);
        assert_eq!(PaymentTiming::End.factor(), 0.0);
        assert_eq!(PaymentTiming::Beginning.factor(), 1.0);
    }

    #[test]
    fn test_timing_serde_names() {
        let json = serde_json::to_string(&PaymentTiming::Beginning).unwrap();
        assert_eq!(json, "\"beginning\"");
        let back: PaymentTiming = serde_json::from_str("\"end\"").unwrap();
        assert_eq!(back, PaymentTiming::End);
    }

    #[test]
    fn test_with_metadata_echoes_assumptions() {
        let out = with_metadata("test", &PaymentTiming::End, vec![], 7, 1.5_f64);
        assert_eq!(out.assumptions, serde_json::json!("end"));
        assert_eq!(out.metadata.computation_time_us, 7);
        assert_eq!(out.metadata.version, env!("CARGO_PKG_VERSION"));
    }
}
