use crate::error::PosError;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A charge amount in euro cents, restricted to what the till accepts.
///
/// The allowed range is 0.10 € to 99.99 € inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Cents(u32);

impl Cents {
    pub const MIN: u32 = 10;
    pub const MAX: u32 = 9_999;

    pub fn new(value: u32) -> Result<Self, PosError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(PosError::InvalidAmount(format!(
                "{value} cents is outside {}..={}",
                Self::MIN,
                Self::MAX
            )))
        }
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// Parses a free-form euro amount typed by staff.
    ///
    /// Both `,` and `.` are accepted as the decimal separator. Inputs that are
    /// blank, not numeric, finer than a cent, or outside the allowed range are
    /// rejected.
    pub fn parse_euros(input: &str) -> Result<Self, PosError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(PosError::InvalidAmount("amount is empty".to_string()));
        }
        let normalized = trimmed.replace(',', ".");
        let euros = Decimal::from_str(&normalized)
            .map_err(|_| PosError::InvalidAmount(format!("'{trimmed}' is not a number")))?;
        Self::from_euros(euros)
    }

    /// Converts an exact euro value, rejecting fractions of a cent.
    pub fn from_euros(euros: Decimal) -> Result<Self, PosError> {
        let cents = euros * Decimal::ONE_HUNDRED;
        if !cents.fract().is_zero() {
            return Err(PosError::InvalidAmount(format!(
                "{euros} has fractions of a cent"
            )));
        }
        let cents = cents
            .to_u32()
            .ok_or_else(|| PosError::InvalidAmount(format!("{euros} is out of range")))?;
        Self::new(cents)
    }
}

impl TryFrom<u32> for Cents {
    type Error = PosError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Cents> for u32 {
    fn from(cents: Cents) -> Self {
        cents.0
    }
}

impl FromStr for Cents {
    type Err = PosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_euros(s)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02} €", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_accepts_both_separators() {
        assert_eq!(Cents::parse_euros("1,50").unwrap().value(), 150);
        assert_eq!(Cents::parse_euros("1.50").unwrap().value(), 150);
        assert_eq!(Cents::parse_euros(" 0.1 ").unwrap().value(), 10);
        assert_eq!(Cents::parse_euros("99,99").unwrap().value(), 9_999);
        assert_eq!(Cents::parse_euros("2").unwrap().value(), 200);
    }

    #[test]
    fn test_parse_rejects_invalid_input() {
        for input in ["", "   ", "abc", "0.05", "100.00", "-1", "1.505", "1,2,3"] {
            assert!(
                matches!(Cents::parse_euros(input), Err(PosError::InvalidAmount(_))),
                "expected '{input}' to be rejected"
            );
        }
    }

    #[test]
    fn test_from_str() {
        let cents: Cents = "2,50".parse().unwrap();
        assert_eq!(cents.value(), 250);
        assert!("0,05".parse::<Cents>().is_err());
    }

    #[test]
    fn test_from_euros() {
        assert_eq!(Cents::from_euros(dec!(1.5)).unwrap().value(), 150);
        assert_eq!(Cents::from_euros(dec!(99.99)).unwrap().value(), 9_999);
        assert!(Cents::from_euros(dec!(0.099)).is_err());
        assert!(Cents::from_euros(dec!(-0.50)).is_err());
    }

    #[test]
    fn test_range_bounds() {
        assert!(Cents::new(9).is_err());
        assert!(Cents::new(10).is_ok());
        assert!(Cents::new(9_999).is_ok());
        assert!(Cents::new(10_000).is_err());
        assert!(Cents::new(5).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Cents::new(150).unwrap().to_string(), "1.50 €");
        assert_eq!(Cents::new(10).unwrap().to_string(), "0.10 €");
    }

    #[test]
    fn test_deserialize_validates_range() {
        let ok: Cents = serde_json::from_str("150").unwrap();
        assert_eq!(ok.value(), 150);
        assert!(serde_json::from_str::<Cents>("10000").is_err());
    }
}
