//! Calendar arithmetic of billing periods.

use derive_more::Display;

use crate::{date::DateOf, define_kind, Date};

define_kind! {
    #[doc = "Frequency of recurring payments."]
    enum Frequency {
        #[doc = "Every month."]
        Monthly = 1,

        #[doc = "Every quarter (January, April, July, October)."]
        Quarterly = 2,

        #[doc = "Every half a year (January, July)."]
        HalfYearly = 3,

        #[doc = "Every year."]
        Yearly = 4,
    }
}

impl Frequency {
    /// Returns length of a period of this [`Frequency`] in months.
    #[must_use]
    pub const fn months(self) -> u8 {
        match self {
            Self::Monthly => 1,
            Self::Quarterly => 3,
            Self::HalfYearly => 6,
            Self::Yearly => 12,
        }
    }

    /// Indicates whether the provided `date` is a natural period boundary of
    /// this [`Frequency`].
    #[must_use]
    pub fn is_boundary<Of: ?Sized>(self, date: &DateOf<Of>) -> bool {
        date.day() == 1 && (date.month() - 1) % self.months() == 0
    }

    /// Returns start of the next natural period of this [`Frequency`].
    ///
    /// The `date` itself is returned if it's already a boundary.
    #[must_use]
    pub fn next_period_start<Of: ?Sized>(self, date: DateOf<Of>) -> DateOf<Of> {
        if self.is_boundary(&date) {
            return date;
        }
        let months = self.months();
        let into_period = (date.month() - 1) % months;
        date.first_of_month()
            .add_months(u32::from(months - into_period))
    }
}

/// Half-open interval of days `[start, end)`.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[display("[{start}, {end})")]
pub struct Period {
    /// First day of this [`Period`].
    pub start: Date,

    /// First day after this [`Period`].
    pub end: Date,
}

impl Period {
    /// Creates a new [`Period`] of a single `frequency` cycle beginning at
    /// `start`.
    #[must_use]
    pub fn of(frequency: Frequency, start: Date) -> Self {
        Self {
            start,
            end: start.add_months(u32::from(frequency.months())),
        }
    }

    /// Creates a new [`Period`] covering the provided days inclusively.
    #[must_use]
    pub fn inclusive(first: Date, last: Date) -> Self {
        Self {
            start: first,
            end: last.add_days(1),
        }
    }

    /// Returns the last day belonging to this [`Period`].
    #[must_use]
    pub fn last_day(&self) -> Date {
        self.end.add_days(-1)
    }

    /// Returns number of days in this [`Period`].
    ///
    /// Inverted periods are empty.
    #[must_use]
    pub fn days(&self) -> u32 {
        u32::try_from(self.start.days_until(&self.end)).unwrap_or(0)
    }

    /// Indicates whether the provided `date` belongs to this [`Period`].
    #[must_use]
    pub fn contains<Of: ?Sized>(&self, date: &DateOf<Of>) -> bool {
        let date = date.coerce::<()>();
        self.start <= date && date < self.end
    }

    /// Returns number of days shared by this [`Period`] and the `other` one.
    #[must_use]
    pub fn overlap_days(&self, other: &Self) -> u32 {
        Self {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        }
        .days()
    }
}

#[cfg(test)]
mod spec {
    use crate::Date;

    use super::{Frequency, Period};

    fn date(s: &str) -> Date {
        s.parse().unwrap()
    }

    #[test]
    fn period_lengths() {
        assert_eq!(Frequency::Monthly.months(), 1);
        assert_eq!(Frequency::Quarterly.months(), 3);
        assert_eq!(Frequency::HalfYearly.months(), 6);
        assert_eq!(Frequency::Yearly.months(), 12);
    }

    #[test]
    fn parses_tokens() {
        assert_eq!("monthly".parse::<Frequency>(), Ok(Frequency::Monthly));
        assert_eq!(
            "half_yearly".parse::<Frequency>(),
            Ok(Frequency::HalfYearly),
        );
        assert_eq!(Frequency::Quarterly.to_string(), "quarterly");
        assert!("weekly".parse::<Frequency>().is_err());
    }

    #[test]
    fn next_period_start_of_each_frequency() {
        let d = date("2025-05-20");
        assert_eq!(Frequency::Monthly.next_period_start(d), date("2025-06-01"));
        assert_eq!(
            Frequency::Quarterly.next_period_start(d),
            date("2025-07-01"),
        );
        assert_eq!(
            Frequency::HalfYearly.next_period_start(d),
            date("2025-07-01"),
        );
        assert_eq!(Frequency::Yearly.next_period_start(d), date("2026-01-01"));

        assert_eq!(
            Frequency::Quarterly.next_period_start(date("2025-02-01")),
            date("2025-04-01"),
        );
        assert_eq!(
            Frequency::HalfYearly.next_period_start(date("2025-12-31")),
            date("2026-01-01"),
        );
    }

    #[test]
    fn next_period_start_keeps_boundaries() {
        assert_eq!(
            Frequency::Quarterly.next_period_start(date("2025-10-01")),
            date("2025-10-01"),
        );
        assert_eq!(
            Frequency::HalfYearly.next_period_start(date("2025-07-01")),
            date("2025-07-01"),
        );
        assert_eq!(
            Frequency::Yearly.next_period_start(date("2025-01-01")),
            date("2025-01-01"),
        );
    }

    #[test]
    fn next_period_start_is_within_one_period() {
        for &f in Frequency::ALL {
            let mut d = date("2024-01-01");
            while d < date("2026-01-01") {
                let next = f.next_period_start(d);
                if f.is_boundary(&d) {
                    assert_eq!(next, d, "{f} at {d}");
                } else {
                    assert!(next > d, "{f} at {d}");
                    assert!(
                        next <= d.add_months(u32::from(f.months())),
                        "{f} at {d}",
                    );
                    assert!(f.is_boundary(&next), "{f} at {d}");
                }
                d = d.add_days(1);
            }
        }
    }

    #[test]
    fn overlap_of_periods() {
        let first = Period::of(Frequency::Monthly, date("2025-01-15"));
        assert_eq!(first.end, date("2025-02-15"));
        assert_eq!(first.days(), 31);

        let free = Period::inclusive(date("2025-01-15"), date("2025-01-31"));
        assert_eq!(free.days(), 17);
        assert_eq!(first.overlap_days(&free), 17);
        assert_eq!(free.overlap_days(&first), 17);

        let later = Period::inclusive(date("2025-03-01"), date("2025-03-31"));
        assert_eq!(first.overlap_days(&later), 0);

        let inverted = Period {
            start: date("2025-02-01"),
            end: date("2025-01-01"),
        };
        assert_eq!(inverted.days(), 0);
        assert_eq!(first.overlap_days(&inverted), 0);
    }

    #[test]
    fn contains_is_half_open() {
        let p = Period::of(Frequency::Monthly, date("2025-01-15"));
        assert!(p.contains(&date("2025-01-15")));
        assert!(p.contains(&date("2025-02-14")));
        assert!(!p.contains(&date("2025-02-15")));
        assert!(!p.contains(&date("2025-01-14")));
        assert_eq!(p.last_day(), date("2025-02-14"));
    }
}
