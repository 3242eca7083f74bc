//! [`Percent`]-related definitions.

use std::str::FromStr;

use derive_more::Display;
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;

use crate::Money;

/// Percentage in the `0..=100` range.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Percent(Decimal);

impl Percent {
    /// Zero [`Percent`].
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Creates a new [`Percent`] by checking the provided value is within the
    /// `0..=100` range.
    #[must_use]
    pub fn new(val: Decimal) -> Option<Self> {
        (Decimal::ZERO..=Decimal::ONE_HUNDRED)
            .contains(&val)
            .then_some(Self(val))
    }

    /// Returns the value of this [`Percent`].
    #[must_use]
    pub const fn value(self) -> Decimal {
        self.0
    }

    /// Indicates whether this [`Percent`] is zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// Increases the provided [`Money`] by this [`Percent`].
    #[must_use]
    pub fn increase(self, money: Money) -> Money {
        money.scale(Decimal::ONE + self.0 / Decimal::ONE_HUNDRED)
    }
}

impl FromStr for Percent {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s)
            .ok()
            .and_then(Self::new)
            .ok_or("invalid percent value")
    }
}

#[cfg(test)]
mod spec {
    use rust_decimal::Decimal;

    use crate::{money::Currency, Money};

    use super::Percent;

    #[test]
    fn bounds() {
        assert!(Percent::new(Decimal::ZERO).is_some());
        assert!(Percent::new(Decimal::ONE_HUNDRED).is_some());
        assert!(Percent::new(Decimal::NEGATIVE_ONE).is_none());
        assert!(Percent::new(Decimal::new(10001, 2)).is_none());

        assert!("5".parse::<Percent>().is_ok());
        assert!("101".parse::<Percent>().is_err());
        assert!("five".parse::<Percent>().is_err());
    }

    #[test]
    fn increases_money() {
        let rent = Money::new(Decimal::new(10_000, 0), Currency::Cny);
        let five: Percent = "5".parse().unwrap();
        assert_eq!(
            five.increase(rent),
            Money::new(Decimal::new(10_500, 0), Currency::Cny),
        );
        assert_eq!(Percent::ZERO.increase(rent), rent);
    }
}
