//! Proration of billing periods overlapping a rent-free window.

use common::Period;
use derive_more::Display;
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;

use crate::domain::contract::FreeRent;

/// Share of a billing [`Period`] which is charged, in the `0..=1` range
/// with two decimal places.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Ratio(Decimal);

impl Ratio {
    /// Full [`Ratio`]: the whole [`Period`] is charged.
    pub const ONE: Self = Self(Decimal::ONE);

    /// Zero [`Ratio`]: nothing is charged.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Creates a new [`Ratio`] if the provided `value` is within the `0..=1`
    /// range.
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        (Decimal::ZERO..=Decimal::ONE)
            .contains(&value)
            .then(|| Self(value.round_dp(2)))
    }

    /// Calculates the charged [`Ratio`] of the provided `period` considering
    /// the provided [`FreeRent`] window.
    ///
    /// Empty periods and periods not overlapping the window are charged
    /// fully.
    #[must_use]
    pub fn of(period: Period, free_rent: Option<&FreeRent>) -> Self {
        let Some(free_rent) = free_rent else {
            return Self::ONE;
        };
        let days = period.days();
        let free = period.overlap_days(&free_rent.period());
        if days == 0 || free == 0 {
            return Self::ONE;
        }

        let charged = Decimal::from(days - free) / Decimal::from(days);
        Self(charged.round_dp(2).clamp(Decimal::ZERO, Decimal::ONE))
    }

    /// Returns the value of this [`Ratio`].
    #[must_use]
    pub const fn value(self) -> Decimal {
        self.0
    }

    /// Indicates whether this [`Ratio`] charges the whole [`Period`].
    #[must_use]
    pub fn is_full(self) -> bool {
        self.0 == Decimal::ONE
    }

    /// Indicates whether this [`Ratio`] charges nothing.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }
}

#[cfg(test)]
mod spec {
    use common::{Frequency, Period};
    use rust_decimal::Decimal;

    use crate::domain::contract::{spec::date, FreeRent};

    use super::Ratio;

    fn free(first: &str, last: &str) -> FreeRent {
        FreeRent::new(date(first), date(last)).unwrap()
    }

    #[test]
    fn no_window_is_full() {
        let p = Period::of(Frequency::Monthly, date("2025-01-15"));
        assert_eq!(Ratio::of(p, None), Ratio::ONE);
    }

    #[test]
    fn partially_free_first_period() {
        let p = Period::of(Frequency::Monthly, date("2025-01-15"));
        let r = Ratio::of(p, Some(&free("2025-01-15", "2025-01-31")));

        assert_eq!(r.value(), Decimal::new(45, 2));
    }

    #[test]
    fn fully_free_period_is_zero() {
        let p = Period::of(Frequency::Monthly, date("2025-02-01"));
        let r = Ratio::of(p, Some(&free("2025-01-15", "2025-03-31")));

        assert!(r.is_zero());
    }

    #[test]
    fn disjoint_window_is_full() {
        let p = Period::of(Frequency::Monthly, date("2025-03-01"));
        let r = Ratio::of(p, Some(&free("2025-01-15", "2025-01-31")));

        assert!(r.is_full());
    }

    #[test]
    fn window_in_the_middle_of_period() {
        let p = Period::of(Frequency::Quarterly, date("2025-01-01"));
        let r = Ratio::of(p, Some(&free("2025-02-01", "2025-02-28")));

        // (90 - 28) / 90 = 0.6888...
        assert_eq!(r.value(), Decimal::new(69, 2));
    }

    #[test]
    fn ratio_is_bounded() {
        for (first, last) in [
            ("2024-12-01", "2025-01-20"),
            ("2025-01-10", "2025-01-10"),
            ("2025-01-31", "2025-03-01"),
            ("2024-01-01", "2026-01-01"),
        ] {
            let p = Period::of(Frequency::Monthly, date("2025-01-15"));
            let r = Ratio::of(p, Some(&free(first, last)));
            assert!(
                (Decimal::ZERO..=Decimal::ONE).contains(&r.value()),
                "{first}..={last}: {r}",
            );
        }
        assert!(Ratio::new(Decimal::new(101, 2)).is_none());
        assert!(Ratio::new(Decimal::new(-1, 2)).is_none());
    }
}
