//! Rent [`Escalation`] definitions.

use common::{Date, Money, Percent};

#[cfg(doc)]
use crate::domain::{contract::Lease, Contract};

/// Periodic rent increase of a [`Contract`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Escalation {
    /// Rate the rent is increased by.
    pub rate: Percent,

    /// Lease year (counting from `1`) the escalation cycles begin in.
    pub start_year: u16,

    /// Length of an escalation cycle in years.
    pub cycle_years: u16,

    /// [`Date`] of the next rent increase.
    ///
    /// [`None`] until the [`Contract`] is activated.
    pub next_at: Option<Date>,

    /// [`Date`] of the last applied rent increase, if any.
    pub applied_at: Option<Date>,

    /// Number of applied rent increases.
    pub version: u32,
}

impl Escalation {
    /// Creates a new not yet scheduled [`Escalation`].
    ///
    /// [`None`] is returned if the `start_year` or the `cycle_years` is zero.
    #[must_use]
    pub fn new(
        rate: Percent,
        start_year: u16,
        cycle_years: u16,
    ) -> Option<Self> {
        (start_year >= 1 && cycle_years >= 1).then_some(Self {
            rate,
            start_year,
            cycle_years,
            next_at: None,
            applied_at: None,
            version: 0,
        })
    }

    /// Schedules the first rent increase of this [`Escalation`] for a
    /// [`Lease`] started on the provided [`Date`].
    pub fn schedule(&mut self, lease_start: Date) {
        let years =
            u32::from(self.start_year - 1) + u32::from(self.cycle_years);
        self.next_at = Some(lease_start.add_years(years));
    }

    /// Applies a rent increase to the provided `rent` if one is due for a
    /// billing period starting on the provided [`Date`].
    ///
    /// Returns the increased rent, or [`None`] if no increase is due.
    /// A zero rate never increases the rent.
    pub fn apply(&mut self, period_start: Date, rent: Money) -> Option<Money> {
        let next_at = self.next_at.filter(|at| *at <= period_start)?;
        if self.rate.is_zero() {
            return None;
        }

        self.applied_at = Some(next_at);
        self.next_at = Some(next_at.add_years(u32::from(self.cycle_years)));
        self.version += 1;
        Some(self.rate.increase(rent))
    }
}

#[cfg(test)]
mod spec {
    use common::Percent;
    use rust_decimal::Decimal;

    use crate::domain::contract::spec::{cny, date};

    use super::Escalation;

    fn escalation(rate: i64, start_year: u16, cycle_years: u16) -> Escalation {
        let mut e = Escalation::new(
            Percent::new(Decimal::from(rate)).unwrap(),
            start_year,
            cycle_years,
        )
        .unwrap();
        e.schedule(date("2025-01-15"));
        e
    }

    #[test]
    fn first_increase_date() {
        assert_eq!(escalation(5, 1, 1).next_at, Some(date("2026-01-15")));
        assert_eq!(escalation(5, 2, 1).next_at, Some(date("2027-01-15")));
        assert_eq!(escalation(5, 1, 2).next_at, Some(date("2027-01-15")));
    }

    #[test]
    fn increases_rent_once_per_cycle() {
        let mut e = escalation(5, 1, 1);

        assert_eq!(e.apply(date("2025-12-15"), cny(1000)), None);

        let rent = e.apply(date("2026-01-15"), cny(1000)).unwrap();
        assert_eq!(rent, cny(1050));
        assert_eq!(e.applied_at, Some(date("2026-01-15")));
        assert_eq!(e.next_at, Some(date("2027-01-15")));
        assert_eq!(e.version, 1);

        assert_eq!(e.apply(date("2026-02-15"), rent), None);
        assert_eq!(e.version, 1);
    }

    #[test]
    fn zero_rate_is_noop() {
        let mut e = escalation(0, 1, 1);

        assert_eq!(e.apply(date("2026-01-15"), cny(1000)), None);
        assert_eq!(e.version, 0);
    }

    #[test]
    fn unscheduled_is_noop() {
        let mut e =
            Escalation::new(Percent::new(Decimal::from(5)).unwrap(), 1, 1)
                .unwrap();

        assert_eq!(e.apply(date("2030-01-01"), cny(1000)), None);
    }

    #[test]
    fn rejects_zero_cycles() {
        let rate = Percent::new(Decimal::from(5)).unwrap();
        assert!(Escalation::new(rate, 0, 1).is_none());
        assert!(Escalation::new(rate, 1, 0).is_none());
    }
}
