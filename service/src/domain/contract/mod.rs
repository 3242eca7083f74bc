//! [`Contract`] definitions.

pub mod state;
pub mod version;

use std::{str::FromStr, sync::LazyLock};

use common::{
    define_kind, money::Currency, unit, Date, DateOf, Frequency, Money, Period,
};
use derive_more::{AsRef, Display, Error, From, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    billing::{self, Escalation, Schedule},
    facade, party,
};
#[cfg(doc)]
use crate::domain::Facade;

pub use self::{
    state::{InvalidTransition, State, Transition, TransitionError},
    version::{Change, Version},
};

/// Lease contract of a mall [`Facade`].
#[derive(Clone, Debug)]
pub struct Contract {
    /// ID of this [`Contract`].
    pub id: Id,

    /// Human-readable [`Reference`] of this [`Contract`].
    pub reference: Reference,

    /// [`Kind`] of this [`Contract`].
    pub kind: Kind,

    /// ID of the leased [`Facade`].
    pub facade_id: facade::Id,

    /// ID of the mall operator.
    pub operator_id: party::Id,

    /// ID of the counterparty (tenant or landlord).
    pub counterparty_id: party::Id,

    /// ID of the property-management company, if any.
    pub property_company_id: Option<party::Id>,

    /// ID of the landlord, if it differs from the counterparty.
    pub landlord_id: Option<party::Id>,

    /// Financial [`Terms`] of this [`Contract`].
    pub terms: Terms,

    /// [`Lease`] of this [`Contract`], if already agreed.
    pub lease: Option<Lease>,

    /// Rent [`Escalation`] policy, if any.
    pub escalation: Option<Escalation>,

    /// Billing [`Schedule`] of this [`Contract`].
    pub schedule: Schedule,

    /// Current lifecycle [`State`] of this [`Contract`].
    pub state: State,

    /// [`Date`] when this [`Contract`] was created.
    pub created_at: CreationDate,

    /// [`Date`] when this [`Contract`] was terminated, if it was.
    pub terminated_at: Option<TerminationDate>,
}

impl Contract {
    /// Resolves the money [`billing::Flow`] of this [`Contract`].
    ///
    /// [`None`] is returned if a party required by the [`Kind`] is not set.
    #[must_use]
    pub fn flow(&self) -> Option<billing::Flow> {
        use billing::Direction as D;

        Some(match self.kind {
            Kind::Tenant => billing::Flow {
                direction: D::Receivable,
                payer: self.counterparty_id,
                payee: self.operator_id,
            },
            Kind::Property => billing::Flow {
                direction: D::Receivable,
                payer: self.counterparty_id,
                payee: self.property_company_id?,
            },
            Kind::Landlord => billing::Flow {
                direction: D::Payable,
                payer: self.operator_id,
                payee: self.landlord_id.unwrap_or(self.counterparty_id),
            },
        })
    }

    /// Indicates whether a bill of this [`Contract`] is due on `today`.
    #[must_use]
    pub fn is_due(&self, today: Date) -> bool {
        self.state == State::Active
            && self.lease.is_some()
            && self.schedule.is_due(today)
    }

    /// Applies the provided [`Transition`] to this [`Contract`].
    ///
    /// Activation initializes the billing [`Schedule`] and the
    /// [`Escalation`], while termination records the `today` [`Date`].
    ///
    /// # Errors
    ///
    /// - If the [`Transition`] is not allowed from the current [`State`].
    /// - If activating a [`Contract`] without a [`Lease`].
    pub fn transit(
        &mut self,
        transition: Transition,
        today: Date,
    ) -> Result<(), TransitionError> {
        let next = self.state.transit(transition)?;
        match transition {
            Transition::Activate => {
                let lease =
                    self.lease.as_ref().ok_or(TransitionError::LeaseMissing)?;
                self.schedule = Schedule::start(lease, &self.terms);
                if let Some(esc) = &mut self.escalation {
                    esc.schedule(lease.start);
                }
            }
            Transition::Terminate => {
                self.terminated_at = Some(today.coerce());
            }
            Transition::Approve
            | Transition::Reject
            | Transition::Sign
            | Transition::Renew => {}
        }
        self.state = next;
        Ok(())
    }

    /// Applies the provided [`Amendment`] to this [`Contract`].
    ///
    /// # Errors
    ///
    /// - If this [`Contract`] is terminated.
    /// - If changing the [`Kind`] of a non-draft [`Contract`].
    /// - If changing the [`Lease`] or [`Escalation`] of an already billed
    ///   [`Contract`].
    /// - If the amended [`Terms`] mix [`Currency`]s.
    pub fn amend(
        &mut self,
        amendment: Amendment,
    ) -> Result<(), AmendmentError> {
        use AmendmentError as E;

        let Amendment {
            kind,
            terms,
            lease,
            escalation,
        } = amendment;

        if self.state == State::Terminated {
            return Err(E::Terminated);
        }
        if kind.is_some_and(|k| k != self.kind) && self.state != State::Draft {
            return Err(E::KindLocked(self.state));
        }
        let billed = matches!(self.state, State::Active | State::Renewed);
        if billed && (lease.is_some() || escalation.is_some()) {
            return Err(E::ScheduleLocked(self.state));
        }
        if let Some(terms) = &terms {
            terms.check().map_err(E::Terms)?;
        }

        if let Some(kind) = kind {
            self.kind = kind;
        }
        if let Some(terms) = terms {
            self.terms = terms;
            if billed {
                self.schedule.realign(&self.terms);
            }
        }
        if let Some(lease) = lease {
            self.lease = Some(lease);
        }
        if let Some(escalation) = escalation {
            self.escalation = Some(escalation);
        }
        Ok(())
    }

    /// Returns number of days left until the [`Lease`] of this [`Contract`]
    /// ends, counting from `today`.
    ///
    /// [`None`] is returned if there is no [`Lease`].
    #[must_use]
    pub fn days_to_expiry(&self, today: Date) -> Option<i64> {
        self.lease.as_ref().map(|l| today.days_until(&l.end()))
    }
}

/// ID of a [`Contract`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    derive_more::FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Human-readable reference of a [`Contract`], like `TEN-000042`.
#[derive(
    AsRef, Clone, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd,
)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Reference(String);

impl Reference {
    /// Creates a new [`Reference`] if the given `reference` is valid.
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Option<Self> {
        let reference = reference.into();
        Self::check(&reference).then_some(Self(reference))
    }

    /// Generates a [`Reference`] for the provided [`Kind`] out of its
    /// sequence number.
    #[must_use]
    pub fn generate(kind: Kind, seq: u32) -> Self {
        Self(format!("{}-{seq:06}", kind.prefix()))
    }

    /// Checks whether the given `reference` is a valid [`Reference`].
    fn check(reference: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Reference`] format.
        ///
        /// - Three uppercase letters prefix;
        /// - Dash separator;
        /// - At least six digits.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[A-Z]{3}-[0-9]{6,}$").expect("valid regex")
        });

        REGEX.is_match(reference.as_ref())
    }
}

impl FromStr for Reference {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Reference`")
    }
}

define_kind! {
    #[doc = "Kind of a [`Contract`]."]
    enum Kind {
        #[doc = "Lease of a [`Facade`] to a tenant."]
        Tenant = 1,

        #[doc = "Property-management services charged to a tenant."]
        Property = 2,

        #[doc = "Lease of a [`Facade`] from its landlord."]
        Landlord = 3,
    }
}

impl Kind {
    /// Returns [`Reference`] prefix of this [`Kind`].
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Tenant => "TEN",
            Self::Property => "PRO",
            Self::Landlord => "LAN",
        }
    }
}

/// Financial terms of a [`Contract`].
///
/// All the amounts share the same [`Currency`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Terms {
    /// Rent per billing period.
    pub rent: Money,

    /// Rent of the very first billing period, if it differs.
    pub first_rent: Option<Money>,

    /// One-time security deposit.
    pub deposit: Option<Money>,

    /// One-time decoration deposit.
    pub decoration_deposit: Option<Money>,

    /// [`PropertyFee`] per billing period.
    pub property_fee: Option<PropertyFee>,

    /// Service fee per billing period.
    pub service_fee: Option<Money>,

    /// Cleanup fee.
    pub cleanup_fee: Option<Money>,

    /// [`Frequency`] of billing periods.
    pub frequency: Frequency,

    /// Day of month payments are due on.
    pub payment_day: PaymentDay,

    /// Number of days a bill is generated ahead of its period.
    pub advance_days: AdvanceDays,
}

impl Terms {
    /// Returns the [`Currency`] of these [`Terms`].
    #[must_use]
    pub fn currency(&self) -> Currency {
        self.rent.currency
    }

    /// Checks these [`Terms`] are consistent.
    ///
    /// # Errors
    ///
    /// If any amount is denominated in a [`Currency`] other than the rent's
    /// one.
    pub fn check(&self) -> Result<(), TermsError> {
        let expected = self.currency();
        let mismatch = [
            self.first_rent,
            self.deposit,
            self.decoration_deposit,
            self.property_fee.as_ref().map(PropertyFee::amount),
            self.service_fee,
            self.cleanup_fee,
        ]
        .into_iter()
        .flatten()
        .find(|m| m.currency != expected);

        match mismatch {
            Some(m) => Err(TermsError::CurrencyMismatch {
                expected,
                found: m.currency,
            }),
            None => Ok(()),
        }
    }
}

/// Error of [`Terms`] validation.
#[derive(Clone, Copy, Debug, Display, Error)]
pub enum TermsError {
    /// [`Terms`] mix different [`Currency`]s.
    #[display("amounts must be in `{expected}`, but `{found}` is found")]
    CurrencyMismatch {
        /// [`Currency`] of the rent.
        expected: Currency,

        /// Mismatching [`Currency`].
        found: Currency,
    },
}

/// Property fee of a [`Contract`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PropertyFee {
    /// Fixed amount per billing period.
    Fixed(Money),

    /// Amount per square meter of the leased area.
    PerArea {
        /// Leased area in square meters.
        area: Decimal,

        /// Rate per square meter.
        unit_rate: Money,
    },
}

impl PropertyFee {
    /// Returns the amount charged per billing period.
    #[must_use]
    pub fn amount(&self) -> Money {
        match self {
            Self::Fixed(m) => *m,
            Self::PerArea { area, unit_rate } => unit_rate.scale(*area),
        }
    }
}

/// Day of month payments are due on, in the `1..=31` range.
///
/// Days absent in a shorter month fall on its last day.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub struct PaymentDay(u8);

impl PaymentDay {
    /// Creates a new [`PaymentDay`] if the provided `day` is within the
    /// `1..=31` range.
    #[must_use]
    pub fn new(day: u8) -> Option<Self> {
        (1..=31).contains(&day).then_some(Self(day))
    }

    /// Returns the day number of this [`PaymentDay`].
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Returns the first [`Date`] falling on this [`PaymentDay`], which is
    /// not earlier than the provided `date`.
    #[must_use]
    pub fn on_or_after<Of: ?Sized>(self, date: DateOf<Of>) -> DateOf<Of> {
        let within = |month: DateOf<Of>| {
            let first = month.first_of_month();
            first.add_days(i64::from(self.0.min(first.days_in_month())) - 1)
        };
        let candidate = within(date);
        if candidate >= date {
            candidate
        } else {
            within(date.first_of_month().add_months(1))
        }
    }
}

/// Number of days a bill is generated ahead of its billing period.
#[derive(
    Clone, Copy, Debug, Default, Display, Eq, From, Into, Ord, PartialEq,
    PartialOrd,
)]
pub struct AdvanceDays(u16);

/// Lease of a [`Contract`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Lease {
    /// First day of this [`Lease`].
    pub start: Date,

    /// Duration of this [`Lease`] in years.
    pub term: TermYears,

    /// Rent-free window granted at the beginning of this [`Lease`], if any.
    pub free_rent: Option<FreeRent>,
}

impl Lease {
    /// Returns the last day of this [`Lease`].
    #[must_use]
    pub fn end(&self) -> Date {
        self.start.add_years(u32::from(self.term.get())).add_days(-1)
    }
}

/// Duration of a [`Lease`] in years, at least one.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub struct TermYears(u8);

impl TermYears {
    /// Creates new [`TermYears`] if the provided `years` are positive.
    #[must_use]
    pub fn new(years: u8) -> Option<Self> {
        (years >= 1).then_some(Self(years))
    }

    /// Returns the number of years.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

/// Rent-free window of a [`Lease`], inclusive on both ends.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[display("{first}..={last}")]
pub struct FreeRent {
    /// First rent-free day.
    first: Date,

    /// Last rent-free day.
    last: Date,
}

impl FreeRent {
    /// Creates a new [`FreeRent`] window if `first` doesn't follow `last`.
    #[must_use]
    pub fn new(first: Date, last: Date) -> Option<Self> {
        (first <= last).then_some(Self { first, last })
    }

    /// Returns the first rent-free day.
    #[must_use]
    pub const fn first(&self) -> Date {
        self.first
    }

    /// Returns the last rent-free day.
    #[must_use]
    pub const fn last(&self) -> Date {
        self.last
    }

    /// Returns this [`FreeRent`] window as a [`Period`].
    #[must_use]
    pub fn period(&self) -> Period {
        Period::inclusive(self.first, self.last)
    }
}

/// Changes to be applied to a [`Contract`].
#[derive(Clone, Debug, Default)]
pub struct Amendment {
    /// New [`Kind`].
    pub kind: Option<Kind>,

    /// New [`Terms`].
    pub terms: Option<Terms>,

    /// New [`Lease`].
    pub lease: Option<Lease>,

    /// New [`Escalation`] policy.
    pub escalation: Option<Escalation>,
}

/// Error of applying an [`Amendment`].
#[derive(Clone, Copy, Debug, Display, Error)]
pub enum AmendmentError {
    /// [`Kind`] cannot be changed outside the draft [`State`].
    #[display("kind cannot be changed in `{_0}` state")]
    KindLocked(#[error(not(source))] State),

    /// [`Lease`] and [`Escalation`] cannot be changed once billing started.
    #[display("lease and escalation cannot be changed in `{_0}` state")]
    ScheduleLocked(#[error(not(source))] State),

    /// Terminated [`Contract`]s cannot be changed.
    #[display("terminated contract cannot be changed")]
    Terminated,

    /// Amended [`Terms`] are inconsistent.
    #[display("invalid terms: {_0}")]
    Terms(TermsError),
}

/// [`Date`] when a [`Contract`] was created.
pub type CreationDate = DateOf<(Contract, unit::Creation)>;

/// [`Date`] when a [`Contract`] was terminated.
pub type TerminationDate = DateOf<(Contract, unit::Termination)>;

#[cfg(test)]
pub(crate) mod spec {
    use common::{money::Currency, Date, Frequency, Money};
    use rust_decimal::Decimal;

    use crate::domain::{billing::Schedule, facade, party};

    use super::{
        AdvanceDays, Amendment, AmendmentError, Contract, CreationDate,
        FreeRent, Id, Kind, Lease, PaymentDay, PropertyFee, Reference, State,
        TermYears, Terms, Transition, TransitionError,
    };

    pub(crate) fn date(s: &str) -> Date {
        s.parse().unwrap()
    }

    pub(crate) fn cny(amount: i64) -> Money {
        Money::new(Decimal::from(amount), Currency::Cny)
    }

    pub(crate) fn terms(rent: i64) -> Terms {
        Terms {
            rent: cny(rent),
            first_rent: None,
            deposit: None,
            decoration_deposit: None,
            property_fee: None,
            service_fee: None,
            cleanup_fee: None,
            frequency: Frequency::Monthly,
            payment_day: PaymentDay::new(5).unwrap(),
            advance_days: AdvanceDays::from(0),
        }
    }

    pub(crate) fn lease(start: &str, years: u8) -> Lease {
        Lease {
            start: date(start),
            term: TermYears::new(years).unwrap(),
            free_rent: None,
        }
    }

    /// Creates a draft tenant [`Contract`] with a one-year lease.
    pub(crate) fn contract(start: &str, rent: i64) -> Contract {
        Contract {
            id: Id::new(),
            reference: Reference::generate(Kind::Tenant, 1),
            kind: Kind::Tenant,
            facade_id: facade::Id::new(),
            operator_id: party::Id::new(),
            counterparty_id: party::Id::new(),
            property_company_id: None,
            landlord_id: None,
            terms: terms(rent),
            lease: Some(lease(start, 1)),
            escalation: None,
            schedule: Schedule::default(),
            state: State::Draft,
            created_at: CreationDate::today(),
            terminated_at: None,
        }
    }

    /// Creates an active tenant [`Contract`] with a one-year lease.
    pub(crate) fn active(start: &str, rent: i64) -> Contract {
        activate(contract(start, rent))
    }

    /// Moves the provided draft [`Contract`] to the [`State::Active`].
    pub(crate) fn activate(mut c: Contract) -> Contract {
        let today = c.lease.unwrap().start;
        for t in [Transition::Approve, Transition::Sign, Transition::Activate]
        {
            c.transit(t, today).unwrap();
        }
        c
    }

    #[test]
    fn generates_references() {
        let r = Reference::generate(Kind::Tenant, 42);
        assert_eq!(r.to_string(), "TEN-000042");
        assert!(Reference::new(r.to_string()).is_some());
        assert_eq!(
            Reference::generate(Kind::Landlord, 1_234_567).to_string(),
            "LAN-1234567",
        );
    }

    #[test]
    fn validates_references() {
        for valid in ["TEN-000001", "PRO-123456", "LAN-0000001"] {
            assert!(Reference::new(valid).is_some(), "{valid}");
        }
        for invalid in ["", "TEN-1", "ten-000001", "TENANT-000001", " TEN-0"] {
            assert!(Reference::new(invalid).is_none(), "{invalid}");
        }
    }

    #[test]
    fn lease_ends_day_before_anniversary() {
        assert_eq!(lease("2025-01-15", 1).end(), date("2026-01-14"));
        assert_eq!(lease("2025-01-01", 3).end(), date("2027-12-31"));
    }

    #[test]
    fn free_rent_window_is_ordered() {
        let window = |from, to| FreeRent::new(date(from), date(to));

        assert!(window("2025-01-15", "2025-01-31").is_some());
        assert!(window("2025-01-15", "2025-01-15").is_some());
        assert!(window("2025-02-01", "2025-01-31").is_none());
    }

    #[test]
    fn payment_day_is_clamped_to_month() {
        let day = PaymentDay::new(31).unwrap();
        assert_eq!(day.on_or_after(date("2025-02-01")), date("2025-02-28"));
        assert_eq!(day.on_or_after(date("2025-01-10")), date("2025-01-31"));

        let day = PaymentDay::new(5).unwrap();
        assert_eq!(day.on_or_after(date("2025-01-05")), date("2025-01-05"));
        assert_eq!(day.on_or_after(date("2025-01-06")), date("2025-02-05"));

        assert!(PaymentDay::new(0).is_none());
        assert!(PaymentDay::new(32).is_none());
    }

    #[test]
    fn per_area_property_fee() {
        let fee = PropertyFee::PerArea {
            area: Decimal::new(1255, 1),
            unit_rate: cny(12),
        };
        assert_eq!(fee.amount(), cny(1506));
    }

    #[test]
    fn detects_currency_mismatch() {
        let mut t = terms(1000);
        assert!(t.check().is_ok());

        t.deposit = Some(Money::new(Decimal::from(10), Currency::Usd));
        assert!(t.check().is_err());
    }

    #[test]
    fn activation_initializes_schedule() {
        let c = active("2025-01-15", 1000);

        assert_eq!(c.state, State::Active);
        assert_eq!(c.schedule.next_period_start, Some(date("2025-01-15")));
        assert!(c.is_due(date("2025-01-15")));
        assert!(!c.is_due(date("2025-01-14")));
    }

    #[test]
    fn activation_requires_lease() {
        let mut c = contract("2025-01-15", 1000);
        c.lease = None;
        c.transit(Transition::Approve, date("2025-01-01")).unwrap();
        c.transit(Transition::Sign, date("2025-01-01")).unwrap();

        assert!(matches!(
            c.transit(Transition::Activate, date("2025-01-01")),
            Err(TransitionError::LeaseMissing),
        ));
        assert_eq!(c.state, State::Signed);
    }

    #[test]
    fn termination_records_date() {
        let mut c = active("2025-01-15", 1000);
        c.transit(Transition::Terminate, date("2025-03-01")).unwrap();

        assert_eq!(c.state, State::Terminated);
        assert_eq!(
            c.terminated_at.map(|d| d.coerce()),
            Some(date("2025-03-01")),
        );
        assert!(!c.is_due(date("2025-03-01")));
    }

    #[test]
    fn kind_is_locked_after_draft() {
        let mut c = contract("2025-01-15", 1000);
        c.amend(Amendment {
            kind: Some(Kind::Landlord),
            ..Amendment::default()
        })
        .unwrap();
        assert_eq!(c.kind, Kind::Landlord);

        c.transit(Transition::Approve, date("2025-01-01")).unwrap();
        assert!(matches!(
            c.amend(Amendment {
                kind: Some(Kind::Tenant),
                ..Amendment::default()
            }),
            Err(AmendmentError::KindLocked(State::Approved)),
        ));
        assert_eq!(c.kind, Kind::Landlord);
    }

    #[test]
    fn schedule_is_locked_once_active() {
        let mut c = active("2025-01-15", 1000);

        assert!(matches!(
            c.amend(Amendment {
                lease: Some(lease("2025-02-01", 2)),
                ..Amendment::default()
            }),
            Err(AmendmentError::ScheduleLocked(State::Active)),
        ));

        c.amend(Amendment {
            terms: Some(terms(1200)),
            ..Amendment::default()
        })
        .unwrap();
        assert_eq!(c.terms.rent, cny(1200));
    }

    #[test]
    fn resolves_flow_by_kind() {
        let mut c = contract("2025-01-15", 1000);
        let flow = c.flow().unwrap();
        assert_eq!(flow.payer, c.counterparty_id);
        assert_eq!(flow.payee, c.operator_id);

        c.kind = Kind::Property;
        assert!(c.flow().is_none());
        let company = party::Id::new();
        c.property_company_id = Some(company);
        assert_eq!(c.flow().unwrap().payee, company);

        c.kind = Kind::Landlord;
        let flow = c.flow().unwrap();
        assert_eq!(flow.payer, c.operator_id);
        assert_eq!(flow.payee, c.counterparty_id);
    }
}
