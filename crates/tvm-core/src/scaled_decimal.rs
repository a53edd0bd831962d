use std::fmt;
use std::ops::Neg;

use rust_decimal::Decimal;

/// Largest scale a `Decimal` carries.
const MAX_SCALE: u32 = 28;

/// A `Decimal` mantissa paired with a power-of-ten exponent.
///
/// The mantissa is kept in `[1, 10)` in magnitude (or is zero), so every
/// value holds 28 to 29 significant digits whatever its size. `Decimal`
/// alone is fixed-point: it runs out of range near `7.9e28` and out of
/// digits below `1e-28`, which long discounting sequences reach quickly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaledDecimal {
    mantissa: Decimal,
    exponent: i32,
}

/// Split a non-zero decimal into a mantissa in `[1, 10)` and the power of
/// ten it was shifted by.
fn split(value: Decimal) -> (Decimal, i64) {
    let coefficient = value.mantissa();
    let shift = coefficient.unsigned_abs().ilog10();
    // A 96-bit coefficient has at most 29 digits, so `shift <= 28`.
    let mantissa = Decimal::from_i128_with_scale(coefficient, shift);
    (mantissa, i64::from(shift) - i64::from(value.scale()))
}

/// `10^-places` for `places <= 28`.
fn tenth_power(places: u32) -> Decimal {
    Decimal::new(1, places)
}

impl ScaledDecimal {
    pub const ZERO: ScaledDecimal = ScaledDecimal {
        mantissa: Decimal::ZERO,
        exponent: 0,
    };

    pub const ONE: ScaledDecimal = ScaledDecimal {
        mantissa: Decimal::ONE,
        exponent: 0,
    };

    fn normalize(mantissa: Decimal, exponent: i64) -> Option<Self> {
        if mantissa.is_zero() {
            return Some(Self::ZERO);
        }
        let (mantissa, shift) = split(mantissa);
        let exponent = i32::try_from(exponent + shift).ok()?;
        Some(Self { mantissa, exponent })
    }

    /// Exact value of a finite `f64`, rounded to the mantissa's precision
    /// only when its decimal expansion is longer than 29 digits.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        if value == 0.0 {
            return Some(Self::ZERO);
        }

        let bits = value.to_bits();
        let biased = ((bits >> 52) & 0x7ff) as i32;
        let fraction = bits & ((1 << 52) - 1);
        let (significand, power) = if biased == 0 {
            (fraction, -1074)
        } else {
            (fraction | (1 << 52), biased - 1075)
        };
        let zeros = significand.trailing_zeros();
        let significand = Self::from(Decimal::from(significand >> zeros));
        let power = power + zeros as i32;

        let magnitude = if power >= 0 {
            let scale = Self::from(Decimal::from(2u8)).checked_powi(power.unsigned_abs())?;
            significand.checked_mul(scale)?
        } else {
            // m * 2^-k == m * 5^k * 10^-k
            let places = power.unsigned_abs();
            let scaled =
                significand.checked_mul(Self::from(Decimal::from(5u8)).checked_powi(places)?)?;
            Self::normalize(
                scaled.mantissa,
                i64::from(scaled.exponent) - i64::from(places),
            )?
        };

        Some(if value.is_sign_negative() {
            -magnitude
        } else {
            magnitude
        })
    }

    /// Nearest `f64`, or `None` when the value is beyond the `f64` range.
    pub fn to_f64(self) -> Option<f64> {
        let value: f64 = self.to_string().parse().ok()?;
        value.is_finite().then_some(value)
    }

    /// The value as a plain `Decimal`, rounded to 28 places. `None` when it
    /// is too large for one.
    pub fn to_decimal(self) -> Option<Decimal> {
        let places = self.exponent.unsigned_abs();
        if self.exponent >= 0 {
            if places > MAX_SCALE {
                return None;
            }
            let power = Decimal::from_i128_with_scale(10i128.pow(places), 0);
            return self.mantissa.checked_mul(power);
        }

        let value = self.mantissa.checked_mul(tenth_power(places.min(MAX_SCALE)))?;
        match places.saturating_sub(MAX_SCALE) {
            0 => Some(value),
            rest if rest <= MAX_SCALE => value.checked_mul(tenth_power(rest)),
            _ => Some(Decimal::ZERO),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        if self.is_zero() {
            return Some(other);
        }
        if other.is_zero() {
            return Some(self);
        }

        let (large, small) = if self.exponent >= other.exponent {
            (self, other)
        } else {
            (other, self)
        };
        let gap = i64::from(large.exponent) - i64::from(small.exponent);
        if gap > i64::from(MAX_SCALE) {
            // Entirely below the last digit of `large`.
            return Some(large);
        }
        let aligned = small.mantissa.checked_mul(tenth_power(gap as u32))?;
        Self::normalize(large.mantissa.checked_add(aligned)?, i64::from(large.exponent))
    }

    pub fn checked_mul(self, other: Self) -> Option<Self> {
        Self::normalize(
            self.mantissa.checked_mul(other.mantissa)?,
            i64::from(self.exponent) + i64::from(other.exponent),
        )
    }

    /// `None` on a zero divisor.
    pub fn checked_div(self, other: Self) -> Option<Self> {
        if other.is_zero() {
            return None;
        }
        Self::normalize(
            self.mantissa.checked_div(other.mantissa)?,
            i64::from(self.exponent) - i64::from(other.exponent),
        )
    }

    /// Square-and-multiply. `x^0 == 1` for every `x`, zero included.
    pub fn checked_powi(self, exponent: u32) -> Option<Self> {
        let mut result = Self::ONE;
        let mut base = self;
        let mut remaining = exponent;
        while remaining > 0 {
            if remaining & 1 == 1 {
                result = result.checked_mul(base)?;
            }
            remaining >>= 1;
            if remaining > 0 {
                base = base.checked_mul(base)?;
            }
        }
        Some(result)
    }
}

impl From<Decimal> for ScaledDecimal {
    fn from(value: Decimal) -> Self {
        if value.is_zero() {
            return Self::ZERO;
        }
        let (mantissa, shift) = split(value);
        // |shift| <= 28
        Self {
            mantissa,
            exponent: shift as i32,
        }
    }
}

impl Neg for ScaledDecimal {
    type Output = ScaledDecimal;

    fn neg(self) -> Self::Output {
        Self {
            mantissa: -self.mantissa,
            exponent: self.exponent,
        }
    }
}

impl fmt::Display for ScaledDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}e{}", self.mantissa, self.exponent)
    }
}
