//! Calendar date utilities.

#[cfg(feature = "postgres")]
use std::error::Error as StdError;
use std::{cmp::Ordering, fmt, hash, marker::PhantomData, str::FromStr};

use derive_more::{Debug, Display, Error};
#[cfg(feature = "postgres")]
use postgres_types::{
    accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql, Type,
};
use time::{macros::format_description, Month};

/// Untyped calendar date.
pub type Date = DateOf;

/// Calendar date (without time and offset) of some kind.
///
/// All the arithmetic saturates at the supported date range instead of
/// panicking.
#[derive(Debug)]
pub struct DateOf<Of: ?Sized = ()> {
    /// Inner representation of the date.
    inner: time::Date,

    /// Type parameter describing the kind of date.
    #[debug(skip)]
    _of: PhantomData<Of>,
}

impl<Of: ?Sized> DateOf<Of> {
    /// Creates a new [`Date`] from the provided calendar components.
    ///
    /// [`None`] is returned if the components don't form a valid date.
    #[must_use]
    pub fn new(year: i32, month: u8, day: u8) -> Option<Self> {
        let month = Month::try_from(month).ok()?;
        time::Date::from_calendar_date(year, month, day)
            .ok()
            .map(Self::from_inner)
    }

    /// Returns the current [`Date`] in UTC.
    #[must_use]
    pub fn today() -> Self {
        Self::from_inner(time::OffsetDateTime::now_utc().date())
    }

    /// Wraps the provided [`time::Date`].
    const fn from_inner(inner: time::Date) -> Self {
        Self {
            inner,
            _of: PhantomData,
        }
    }

    /// Returns the year of this [`Date`].
    #[must_use]
    pub fn year(&self) -> i32 {
        self.inner.year()
    }

    /// Returns the month (`1..=12`) of this [`Date`].
    #[must_use]
    pub fn month(&self) -> u8 {
        u8::from(self.inner.month())
    }

    /// Returns the day of the month (`1..=31`) of this [`Date`].
    #[must_use]
    pub fn day(&self) -> u8 {
        self.inner.day()
    }

    /// Returns the number of days in the month of this [`Date`].
    #[must_use]
    pub fn days_in_month(&self) -> u8 {
        time::util::days_in_year_month(self.inner.year(), self.inner.month())
    }

    /// Returns the first day of the month of this [`Date`].
    #[must_use]
    pub fn first_of_month(self) -> Self {
        Self::from_inner(self.inner.replace_day(1).unwrap_or(self.inner))
    }

    /// Returns this [`Date`] shifted by the given number of days.
    #[must_use]
    pub fn add_days(self, days: i64) -> Self {
        Self::from_inner(self.inner.saturating_add(time::Duration::days(days)))
    }

    /// Returns this [`Date`] shifted by the given number of months.
    ///
    /// The day is clamped to the length of the resulting month, so
    /// `Jan 31 + 1 month` is the last day of February.
    #[must_use]
    pub fn add_months(self, months: u32) -> Self {
        let total = i64::from(self.year()) * 12
            + i64::from(self.month() - 1)
            + i64::from(months);
        let Ok(year) = i32::try_from(total.div_euclid(12)) else {
            return Self::from_inner(time::Date::MAX);
        };
        let month = Month::January
            .nth_next(u8::try_from(total.rem_euclid(12)).unwrap_or(0));
        let day = self
            .day()
            .min(time::util::days_in_year_month(year, month));
        Self::from_inner(
            time::Date::from_calendar_date(year, month, day)
                .unwrap_or(time::Date::MAX),
        )
    }

    /// Returns this [`Date`] shifted by the given number of years.
    ///
    /// `Feb 29` becomes `Feb 28` in non-leap years.
    #[must_use]
    pub fn add_years(self, years: u32) -> Self {
        self.add_months(years.saturating_mul(12))
    }

    /// Returns the number of days from this [`Date`] to the `other` one.
    ///
    /// Negative if `other` is earlier.
    #[must_use]
    pub fn days_until<O: ?Sized>(&self, other: &DateOf<O>) -> i64 {
        (other.inner - self.inner).whole_days()
    }

    /// Coerces one kind of [`Date`] into another.
    #[must_use]
    pub fn coerce<NewOf: ?Sized>(self) -> DateOf<NewOf> {
        DateOf::from_inner(self.inner)
    }
}

/// Error of parsing a [`Date`] from a `YYYY-MM-DD` string.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("invalid date: {_0}")]
pub struct ParseError(time::error::Parse);

impl<Of: ?Sized> FromStr for DateOf<Of> {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        time::Date::parse(s, format_description!("[year]-[month]-[day]"))
            .map(Self::from_inner)
            .map_err(ParseError)
    }
}

impl<Of: ?Sized> fmt::Display for DateOf<Of> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.year(),
            self.month(),
            self.day(),
        )
    }
}

impl<Of: ?Sized> Copy for DateOf<Of> {}
impl<Of: ?Sized> Clone for DateOf<Of> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Of: ?Sized> Eq for DateOf<Of> {}
impl<Of: ?Sized> PartialEq for DateOf<Of> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<Of: ?Sized> hash::Hash for DateOf<Of> {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl<Of: ?Sized> Ord for DateOf<Of> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}
impl<Of: ?Sized> PartialOrd for DateOf<Of> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<Of: ?Sized> From<time::Date> for DateOf<Of> {
    fn from(date: time::Date) -> Self {
        Self::from_inner(date)
    }
}

impl<Of: ?Sized> From<DateOf<Of>> for time::Date {
    fn from(date: DateOf<Of>) -> Self {
        date.inner
    }
}

#[cfg(feature = "postgres")]
impl<Of: ?Sized> FromSql<'_> for DateOf<Of> {
    accepts!(DATE);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        time::Date::from_sql(ty, raw).map(Self::from_inner)
    }
}

#[cfg(feature = "postgres")]
impl<Of: ?Sized> ToSql for DateOf<Of> {
    accepts!(DATE);
    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        w: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.inner.to_sql(ty, w)
    }
}

#[cfg(feature = "serde")]
mod serde {
    //! Module providing integration with [`serde`] crate.

    use serde::{de::Error as _, Deserialize, Deserializer, Serialize};

    use super::DateOf;

    impl<Of: ?Sized> Serialize for DateOf<Of> {
        fn serialize<S: serde::Serializer>(
            &self,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            serializer.collect_str(self)
        }
    }

    impl<'de, Of: ?Sized> Deserialize<'de> for DateOf<Of> {
        fn deserialize<D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Self, D::Error> {
            String::deserialize(deserializer)?
                .parse()
                .map_err(D::Error::custom)
        }
    }
}
