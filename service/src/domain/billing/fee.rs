//! Fee [`Line`]s of a bill.

use common::{define_kind, Money};
use derive_more::{Display, Error};

use crate::domain::{
    billing::{CleanupFeePolicy, Ratio, Schedule},
    contract::Terms,
};
#[cfg(doc)]
use crate::domain::Contract;

define_kind! {
    #[doc = "Kind of a fee billed by a [`Contract`]."]
    enum Kind {
        #[doc = "Periodic rent."]
        Rent = 1,

        #[doc = "One-time security deposit."]
        Deposit = 2,

        #[doc = "One-time decoration deposit."]
        DecorationDeposit = 3,

        #[doc = "Periodic property-management fee."]
        PropertyFee = 4,

        #[doc = "Periodic service fee."]
        ServiceFee = 5,

        #[doc = "Cleanup fee."]
        CleanupFee = 6,
    }
}

impl Kind {
    /// Returns human-readable label of this [`Kind`].
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rent => "Rent",
            Self::Deposit => "Deposit",
            Self::DecorationDeposit => "Decoration deposit",
            Self::PropertyFee => "Property fee",
            Self::ServiceFee => "Service fee",
            Self::CleanupFee => "Cleanup fee",
        }
    }

    /// Indicates whether this [`Kind`] is prorated by the rent-free window.
    #[must_use]
    pub const fn is_prorated(self) -> bool {
        matches!(self, Self::Rent | Self::PropertyFee | Self::ServiceFee)
    }
}

/// Single billed fee.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[display("{}: {amount}", kind.label())]
pub struct Line {
    /// [`Kind`] of the fee.
    pub kind: Kind,

    /// Billed amount, always positive.
    pub amount: Money,
}

impl Line {
    /// Creates a new [`Line`].
    #[must_use]
    pub const fn new(kind: Kind, amount: Money) -> Self {
        Self { kind, amount }
    }
}

/// Inputs of assembling the [`Line`]s of a single bill.
#[derive(Clone, Copy, Debug)]
pub struct Assembly<'a> {
    /// [`Terms`] of the billed [`Contract`].
    pub terms: &'a Terms,

    /// [`Schedule`] of the billed [`Contract`].
    pub schedule: &'a Schedule,

    /// Indicator whether the billed period is the first one of the lease.
    pub first_period: bool,

    /// Charged [`Ratio`] of the billed period.
    pub ratio: Ratio,

    /// [`CleanupFeePolicy`] to apply.
    pub cleanup_fee: CleanupFeePolicy,

    /// Indicator whether the cleanup fee has been billed already.
    pub cleanup_fee_billed: bool,
}

impl Assembly<'_> {
    /// Assembles the [`Line`]s of a bill.
    ///
    /// [`Line`]s are ordered by their [`Kind`], and never contain zero
    /// amounts.
    ///
    /// # Errors
    ///
    /// With [`NothingToBill`] if there is no positive amount to bill.
    pub fn lines(&self) -> Result<Vec<Line>, NothingToBill> {
        let Self {
            terms,
            schedule,
            first_period,
            ratio,
            cleanup_fee,
            cleanup_fee_billed,
        } = *self;

        let prorate = |m: Money| {
            if ratio.is_full() {
                m
            } else {
                m.scale(ratio.value())
            }
        };

        let rent = match terms.first_rent {
            Some(first) if first_period && !schedule.first_rent_billed => first,
            Some(_) | None => prorate(terms.rent),
        };
        let cleanup = match cleanup_fee {
            CleanupFeePolicy::Once if cleanup_fee_billed => None,
            CleanupFeePolicy::Once | CleanupFeePolicy::EveryPeriod => {
                terms.cleanup_fee
            }
        };

        let lines = [
            Some((Kind::Rent, rent)),
            terms
                .deposit
                .filter(|_| !schedule.deposit_billed)
                .map(|m| (Kind::Deposit, m)),
            terms
                .decoration_deposit
                .filter(|_| !schedule.decoration_deposit_billed)
                .map(|m| (Kind::DecorationDeposit, m)),
            terms
                .property_fee
                .as_ref()
                .map(|f| (Kind::PropertyFee, prorate(f.amount()))),
            terms.service_fee.map(|m| (Kind::ServiceFee, prorate(m))),
            cleanup.map(|m| (Kind::CleanupFee, m)),
        ]
        .into_iter()
        .flatten()
        .filter(|(_, m)| m.is_positive())
        .map(|(kind, amount)| Line::new(kind, amount))
        .collect::<Vec<_>>();

        if lines.is_empty() {
            return Err(NothingToBill);
        }
        Ok(lines)
    }
}

/// There is no positive amount to bill.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("nothing to bill")]
pub struct NothingToBill;

#[cfg(test)]
mod spec {
    use rust_decimal::Decimal;

    use crate::domain::{
        billing::{CleanupFeePolicy, Ratio, Schedule},
        contract::{
            spec::{cny, terms},
            PropertyFee, Terms,
        },
    };

    use super::{Assembly, Kind, Line};

    fn assembly<'a>(terms: &'a Terms, schedule: &'a Schedule) -> Assembly<'a> {
        Assembly {
            terms,
            schedule,
            first_period: false,
            ratio: Ratio::ONE,
            cleanup_fee: CleanupFeePolicy::Once,
            cleanup_fee_billed: false,
        }
    }

    fn kinds(lines: &[Line]) -> Vec<Kind> {
        lines.iter().map(|l| l.kind).collect()
    }

    #[test]
    fn rent_only() {
        let t = terms(1000);
        let s = Schedule::default();

        let lines = assembly(&t, &s).lines().unwrap();

        assert_eq!(lines, [Line::new(Kind::Rent, cny(1000))]);
    }

    #[test]
    fn prorates_periodic_fees() {
        let mut t = terms(10_000);
        t.service_fee = Some(cny(200));
        t.deposit = Some(cny(30_000));
        let s = Schedule::default();
        let mut a = assembly(&t, &s);
        a.ratio = Ratio::new(Decimal::new(45, 2)).unwrap();

        let lines = a.lines().unwrap();

        assert_eq!(
            lines,
            [
                Line::new(Kind::Rent, cny(4500)),
                Line::new(Kind::Deposit, cny(30_000)),
                Line::new(Kind::ServiceFee, cny(90)),
            ],
        );
    }

    #[test]
    fn first_rent_overrides_prorated_rent() {
        let mut t = terms(10_000);
        t.first_rent = Some(cny(7000));
        let s = Schedule::default();
        let mut a = assembly(&t, &s);
        a.first_period = true;
        a.ratio = Ratio::new(Decimal::new(45, 2)).unwrap();

        assert_eq!(a.lines().unwrap()[0], Line::new(Kind::Rent, cny(7000)));

        a.first_period = false;
        assert_eq!(a.lines().unwrap()[0], Line::new(Kind::Rent, cny(4500)));
    }

    #[test]
    fn one_time_fees_are_latched() {
        let mut t = terms(1000);
        t.deposit = Some(cny(3000));
        t.decoration_deposit = Some(cny(5000));
        let mut s = Schedule::default();

        assert_eq!(
            kinds(&assembly(&t, &s).lines().unwrap()),
            [Kind::Rent, Kind::Deposit, Kind::DecorationDeposit],
        );

        s.deposit_billed = true;
        s.decoration_deposit_billed = true;
        assert_eq!(kinds(&assembly(&t, &s).lines().unwrap()), [Kind::Rent]);
    }

    #[test]
    fn cleanup_fee_policy() {
        let mut t = terms(1000);
        t.cleanup_fee = Some(cny(100));
        let s = Schedule::default();
        let mut a = assembly(&t, &s);

        assert!(kinds(&a.lines().unwrap()).contains(&Kind::CleanupFee));

        a.cleanup_fee_billed = true;
        assert!(!kinds(&a.lines().unwrap()).contains(&Kind::CleanupFee));

        a.cleanup_fee = CleanupFeePolicy::EveryPeriod;
        assert!(kinds(&a.lines().unwrap()).contains(&Kind::CleanupFee));
    }

    #[test]
    fn orders_all_kinds() {
        let mut t = terms(1000);
        t.deposit = Some(cny(1));
        t.decoration_deposit = Some(cny(2));
        t.property_fee = Some(PropertyFee::Fixed(cny(3)));
        t.service_fee = Some(cny(4));
        t.cleanup_fee = Some(cny(5));
        let s = Schedule::default();

        assert_eq!(kinds(&assembly(&t, &s).lines().unwrap()), Kind::ALL);
    }

    #[test]
    fn fully_free_period_has_nothing_to_bill() {
        let mut t = terms(1000);
        t.service_fee = Some(cny(100));
        let s = Schedule::default();
        let mut a = assembly(&t, &s);
        a.ratio = Ratio::ZERO;

        assert!(a.lines().is_err());
    }

    #[test]
    fn zero_recurring_amounts_have_nothing_to_bill() {
        let mut t = terms(0);
        t.service_fee = Some(cny(0));
        t.property_fee = Some(PropertyFee::Fixed(cny(0)));
        let s = Schedule::default();
        let a = assembly(&t, &s);

        assert!(a.ratio.is_full());
        assert!(a.lines().is_err());
    }

    #[test]
    fn zero_amounts_are_dropped() {
        let mut t = terms(1000);
        t.service_fee = Some(cny(0));
        let s = Schedule::default();

        assert_eq!(kinds(&assembly(&t, &s).lines().unwrap()), [Kind::Rent]);
    }
}
