//! Billing [`Schedule`] of a [`Contract`].

use common::{unit, Date, DateOf, Period};

use crate::domain::{
    billing::{fee, Line, Ratio},
    contract::{Lease, Terms},
};
#[cfg(doc)]
use crate::domain::Contract;

/// [`Date`] a bill is to be generated on.
pub type BillDate = DateOf<(Schedule, unit::Due)>;

/// Billing schedule of a [`Contract`].
///
/// Periods are consecutive [`Terms::frequency`] cycles beginning at the
/// [`Lease`] start, each billed [`Terms::advance_days`] before it starts.
/// Every period boundary is counted in months from the [`Lease`] start, so
/// month-end clamping never accumulates.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Schedule {
    /// Start of the next billing period.
    ///
    /// [`None`] if not started yet or exhausted.
    pub next_period_start: Option<Date>,

    /// [`BillDate`] of the next billing period.
    ///
    /// [`None`] if not started yet or exhausted.
    pub next_bill_date: Option<BillDate>,

    /// Number of months between the [`Lease`] start and the start of the
    /// next billing period.
    pub next_period_offset: u32,

    /// Charged [`Ratio`] of the first billing period.
    pub first_period_ratio: Option<Ratio>,

    /// Indicator whether the first rent has been billed.
    pub first_rent_billed: bool,

    /// Indicator whether the deposit has been billed.
    pub deposit_billed: bool,

    /// Indicator whether the decoration deposit has been billed.
    pub decoration_deposit_billed: bool,
}

impl Schedule {
    /// Starts a new [`Schedule`] at the beginning of the provided [`Lease`].
    #[must_use]
    pub fn start(lease: &Lease, terms: &Terms) -> Self {
        let mut schedule = Self {
            next_period_start: Some(lease.start),
            next_bill_date: Some(bill_date(lease.start, terms)),
            ..Self::default()
        };
        schedule.first_period_ratio = schedule
            .next_period(lease, terms)
            .map(|first| Ratio::of(first, lease.free_rent.as_ref()));
        schedule
    }

    /// Indicates whether the next bill is due on `today`.
    #[must_use]
    pub fn is_due(&self, today: Date) -> bool {
        self.next_bill_date.is_some_and(|d| d.coerce() <= today)
    }

    /// Indicates whether this [`Schedule`] has no more periods to bill.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.next_period_start.is_none()
    }

    /// Returns the next billing [`Period`], if any.
    ///
    /// The [`Period`] never lasts beyond the [`Lease`] end.
    #[must_use]
    pub fn next_period(&self, lease: &Lease, terms: &Terms) -> Option<Period> {
        self.next_period_start?;
        let months = u32::from(terms.frequency.months());
        Some(Period {
            start: lease.start.add_months(self.next_period_offset),
            end: lease
                .start
                .add_months(self.next_period_offset + months)
                .min(lease.end().add_days(1)),
        })
    }

    /// Moves this [`Schedule`] to the period following the next one.
    ///
    /// The [`Schedule`] becomes exhausted once the following period starts
    /// after the [`Lease`] end.
    pub fn advance(&mut self, lease: &Lease, terms: &Terms) {
        if self.is_exhausted() {
            return;
        }
        self.next_period_offset += u32::from(terms.frequency.months());
        let start = lease.start.add_months(self.next_period_offset);
        if start > lease.end() {
            self.next_period_start = None;
            self.next_bill_date = None;
        } else {
            self.next_period_start = Some(start);
            self.next_bill_date = Some(bill_date(start, terms));
        }
    }

    /// Recalculates the next [`BillDate`] after [`Terms`] have changed.
    pub fn realign(&mut self, terms: &Terms) {
        self.next_bill_date =
            self.next_period_start.map(|start| bill_date(start, terms));
    }

    /// Latches the one-time fees billed with the provided [`Line`]s.
    pub fn record(&mut self, lines: &[Line], first_period: bool) {
        for line in lines {
            match line.kind {
                fee::Kind::Rent if first_period => {
                    self.first_rent_billed = true;
                }
                fee::Kind::Deposit => self.deposit_billed = true,
                fee::Kind::DecorationDeposit => {
                    self.decoration_deposit_billed = true;
                }
                fee::Kind::Rent
                | fee::Kind::PropertyFee
                | fee::Kind::ServiceFee
                | fee::Kind::CleanupFee => {}
            }
        }
    }
}

/// Calculates the [`BillDate`] of a period starting on the provided [`Date`].
fn bill_date(period_start: Date, terms: &Terms) -> BillDate {
    period_start
        .add_days(-i64::from(u16::from(terms.advance_days)))
        .coerce()
}
