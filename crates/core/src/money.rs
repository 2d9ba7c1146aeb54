//! Monetary amounts in the smallest currency unit (e.g., cents).

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

const MINOR_PER_MAJOR: i64 = 100;

/// Amount of money in minor units.
///
/// Signed so that malformed caller input (negative shipping, refunds) can be
/// represented and rejected by validation instead of wrapping.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Convert a decimal major-unit amount (e.g. `40.5`) into minor units,
    /// rounding half away from zero to the nearest cent.
    pub fn from_decimal(value: f64) -> Result<Self, DomainError> {
        if !value.is_finite() {
            return Err(DomainError::validation("amount must be a finite number"));
        }
        let minor = (value * MINOR_PER_MAJOR as f64).round();
        if minor.abs() >= i64::MAX as f64 {
            return Err(DomainError::validation("amount is out of range"));
        }
        Ok(Self(minor as i64))
    }

    pub const fn minor_units(&self) -> i64 {
        self.0
    }

    pub fn to_decimal(&self) -> f64 {
        self.0 as f64 / MINOR_PER_MAJOR as f64
    }

    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn checked_mul(&self, factor: i64) -> Option<Money> {
        self.0.checked_mul(factor).map(Money)
    }

    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(
            f,
            "{sign}{}.{:02}",
            abs / MINOR_PER_MAJOR as u64,
            abs % MINOR_PER_MAJOR as u64
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decimal_conversion_rounds_to_cents() {
        assert_eq!(Money::from_decimal(40.0).unwrap(), Money::from_minor(4000));
        assert_eq!(Money::from_decimal(0.105).unwrap().minor_units(), 11);
        assert_eq!(Money::from_decimal(-5.0).unwrap().minor_units(), -500);
    }

    #[test]
    fn rejects_non_finite_input() {
        assert!(Money::from_decimal(f64::NAN).is_err());
        assert!(Money::from_decimal(f64::INFINITY).is_err());
    }

    #[test]
    fn displays_major_and_minor_parts() {
        assert_eq!(Money::from_minor(4000).to_string(), "40.00");
        assert_eq!(Money::from_minor(-7).to_string(), "-0.07");
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: whole-cent minor amounts survive a trip through the decimal form.
        #[test]
        fn minor_units_survive_decimal_form(minor in -1_000_000_000i64..1_000_000_000i64) {
            let money = Money::from_minor(minor);
            prop_assert_eq!(Money::from_decimal(money.to_decimal()).unwrap(), money);
        }
    }
}
