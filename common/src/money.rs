//! [`Money`]-related definitions.

use std::{fmt, str::FromStr};

use rust_decimal::{prelude::ToPrimitive as _, Decimal, RoundingStrategy};

use crate::define_kind;

/// Amount of money in some [`Currency`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Money {
    /// Amount of this [`Money`].
    pub amount: Decimal,

    /// [`Currency`] of this amount.
    pub currency: Currency,
}

impl Money {
    /// Creates a new [`Money`] amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Creates a zero [`Money`] amount in the provided [`Currency`].
    #[must_use]
    pub const fn zero(currency: Currency) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// Indicates whether this [`Money`] is strictly greater than zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Multiplies this [`Money`] by the provided `factor`, rounding the
    /// result to the minor units of its [`Currency`].
    ///
    /// Midpoints are rounded away from zero.
    #[must_use]
    pub fn scale(self, factor: Decimal) -> Self {
        Self {
            amount: (self.amount * factor).round_dp_with_strategy(
                self.currency.minor_units(),
                RoundingStrategy::MidpointAwayFromZero,
            ),
            currency: self.currency,
        }
    }

    /// Sums this [`Money`] with the `other` one.
    ///
    /// [`None`] is returned if their [`Currency`]s differ.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        (self.currency == other.currency).then(|| Self {
            amount: self.amount + other.amount,
            currency: self.currency,
        })
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { amount, currency } = self;
        let currency = currency.code();
        match amount.normalize() {
            a if a.is_integer() => match a.to_i128() {
                Some(i) => write!(f, "{i}{currency}"),
                None => write!(f, "{a}{currency}"),
            },
            a => write!(f, "{a}{currency}"),
        }
    }
}

impl FromStr for Money {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() < 4 || !s.is_char_boundary(s.len() - 3) {
            return Err("too short");
        }

        let (amount, currency) = s.split_at(s.len() - 3);
        let amount = Decimal::from_str(amount).map_err(|_| "invalid amount")?;
        let currency = Currency::from_str(&currency.to_lowercase())
            .map_err(|_| "invalid currency")?;

        Ok(Self { amount, currency })
    }
}

define_kind! {
    #[doc = "Currency of a [`Money`] amount."]
    enum Currency {
        #[doc = "Chinese Yuan Renminbi."]
        Cny = 1,

        #[doc = "US Dollar."]
        Usd = 2,

        #[doc = "Euro."]
        Eur = 3,
    }
}

impl Currency {
    /// Returns number of decimal places of the minor unit of this
    /// [`Currency`].
    #[must_use]
    pub const fn minor_units(self) -> u32 {
        match self {
            Self::Cny | Self::Usd | Self::Eur => 2,
        }
    }

    /// Returns the [ISO 4217] code of this [`Currency`].
    ///
    /// [ISO 4217]: https://en.wikipedia.org/wiki/ISO_4217
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Cny => "CNY",
            Self::Usd => "USD",
            Self::Eur => "EUR",
        }
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use rust_decimal::Decimal;

    use super::{Currency, Money};

    fn decimal(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn cny(s: &str) -> Money {
        Money::new(decimal(s), Currency::Cny)
    }

    #[test]
    fn from_str() {
        assert_eq!(Money::from_str("123.45CNY").unwrap(), cny("123.45"));
        assert_eq!(
            Money::from_str("123.45USD").unwrap(),
            Money::new(decimal("123.45"), Currency::Usd),
        );
        assert_eq!(
            Money::from_str("123.45EUR").unwrap(),
            Money::new(decimal("123.45"), Currency::Eur),
        );

        assert!(Money::from_str("123.45").is_err());
        assert!(Money::from_str("123.45Cn").is_err());
        assert!(Money::from_str("123.45Yuan").is_err());
        assert!(Money::from_str("CNY").is_err());

        assert!(Money::from_str("123.00CNY").is_ok());
        assert!(Money::from_str("123CNY").is_ok());
    }

    #[test]
    fn to_string() {
        assert_eq!(cny("123.45").to_string(), "123.45CNY");
        assert_eq!(cny("123.40").to_string(), "123.4CNY");
        assert_eq!(cny("123.00").to_string(), "123CNY");
        assert_eq!(cny("123").to_string(), "123CNY");
        assert_eq!(
            Money::new(decimal("9.99"), Currency::Eur).to_string(),
            "9.99EUR",
        );
    }

    #[test]
    fn scales_with_rounding() {
        assert_eq!(cny("1000").scale(decimal("0.45")), cny("450.00"));
        assert_eq!(cny("333.33").scale(decimal("0.5")), cny("166.67"));
        assert_eq!(cny("100").scale(decimal("1.05")), cny("105.00"));
        assert_eq!(cny("100").scale(Decimal::ZERO), cny("0"));
    }

    #[test]
    fn adds_same_currency_only() {
        assert_eq!(cny("1.5").checked_add(cny("2.25")), Some(cny("3.75")));
        assert_eq!(
            cny("1").checked_add(Money::new(Decimal::ONE, Currency::Usd)),
            None,
        );
    }

    #[test]
    fn positivity() {
        assert!(cny("0.01").is_positive());
        assert!(!cny("0").is_positive());
        assert!(!cny("-5").is_positive());
    }
}
