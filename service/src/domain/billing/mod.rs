//! Billing definitions.

pub mod escalation;
pub mod fee;
pub mod proration;
pub mod schedule;

use common::{define_kind, unit, Date, DateOf, Money, Period};
use derive_more::{AsRef, Display, From, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use uuid::Uuid;
use xxhash_rust::xxh3;

use crate::domain::{contract, facade, party};
#[cfg(doc)]
use crate::domain::Contract;

pub use self::{
    escalation::Escalation,
    fee::Line,
    proration::Ratio,
    schedule::{BillDate, Schedule},
};

/// Billing configuration.
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// [`Journal`] receivable bills are posted to.
    ///
    /// Receivable bills fail with a configuration error if not set.
    pub receivable_journal: Option<Journal>,

    /// [`Journal`] payable bills are posted to.
    ///
    /// Payable bills fail with a configuration error if not set.
    pub payable_journal: Option<Journal>,

    /// [`CleanupFeePolicy`] to apply.
    pub cleanup_fee: CleanupFeePolicy,
}

impl Config {
    /// Returns the [`Journal`] configured for the provided [`Direction`].
    #[must_use]
    pub fn journal(&self, direction: Direction) -> Option<&Journal> {
        match direction {
            Direction::Receivable => self.receivable_journal.as_ref(),
            Direction::Payable => self.payable_journal.as_ref(),
        }
    }
}

/// Policy of billing the cleanup fee of a [`Contract`].
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, SmartDefault,
)]
#[serde(rename_all = "snake_case")]
pub enum CleanupFeePolicy {
    /// Billed once, along with the first bill it can be included into.
    #[default]
    Once,

    /// Billed along with every bill.
    EveryPeriod,
}

define_kind! {
    #[doc = "Direction of money of a bill."]
    enum Direction {
        #[doc = "Operator receives money (from a tenant)."]
        Receivable = 1,

        #[doc = "Operator pays money (to a landlord)."]
        Payable = 2,
    }
}

/// Money flow of a [`Contract`]: who pays whom.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Flow {
    /// [`Direction`] of this [`Flow`].
    pub direction: Direction,

    /// ID of the paying party.
    pub payer: party::Id,

    /// ID of the receiving party.
    pub payee: party::Id,
}

/// Code of an accounting journal documents are posted to.
#[derive(AsRef, Clone, Debug, Display, Eq, From, Hash, PartialEq)]
#[as_ref(str, String)]
#[from(&str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Journal(String);

/// Deterministic key deduplicating accounting postings.
///
/// Retrying the bill of the same [`Period`] produces the same
/// [`IdempotencyKey`], even if the billed [`fee::Kind`]s have changed since.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, Hash, Into, PartialEq,
)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct IdempotencyKey(Uuid);

impl IdempotencyKey {
    /// Calculates the [`IdempotencyKey`] of a bill of the provided
    /// [`Contract`] for the [`Period`] starting on the provided [`Date`].
    #[must_use]
    pub fn of_bill(contract_id: contract::Id, period_start: Date) -> Self {
        Self::calculate(contract_id, period_start, None)
    }

    /// Calculates the [`IdempotencyKey`] of a single [`fee::Kind`] billed
    /// to the provided [`Contract`] for the [`Period`] starting on the
    /// provided [`Date`].
    #[must_use]
    pub fn of_line(
        contract_id: contract::Id,
        period_start: Date,
        fee: fee::Kind,
    ) -> Self {
        Self::calculate(contract_id, period_start, Some(fee))
    }

    /// Hashes the provided parts into an [`IdempotencyKey`].
    fn calculate(
        contract_id: contract::Id,
        period_start: Date,
        fee: Option<fee::Kind>,
    ) -> Self {
        use std::hash::Hash as _;

        // WARNING: Avoid changing the order of the fields in the hasher,
        //          because it will be a breaking change making already
        //          posted bills to be posted again.
        let mut hasher = xxh3::Xxh3Builder::new().build();
        contract_id.hash(&mut hasher);
        period_start.hash(&mut hasher);
        fee.hash(&mut hasher);
        Self(Uuid::from_u128(hasher.digest128()))
    }
}

/// Reference to a document created in the accounting system.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, Hash, Into, PartialEq,
)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct DocumentRef(Uuid);

impl DocumentRef {
    /// Creates a new random [`DocumentRef`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentRef {
    fn default() -> Self {
        Self::new()
    }
}

/// [`Date`] a bill must be paid by.
pub type DueDate = DateOf<(Event, unit::Due)>;

/// Billing event handed over to the accounting system.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Event {
    /// [`IdempotencyKey`] of this [`Event`].
    pub key: IdempotencyKey,

    /// ID of the billed [`Contract`].
    pub contract_id: contract::Id,

    /// [`contract::Reference`] of the billed [`Contract`].
    pub reference: contract::Reference,

    /// ID of the leased [`facade::Facade`].
    pub facade_id: facade::Id,

    /// Money [`Flow`] of this [`Event`].
    pub flow: Flow,

    /// [`Journal`] to post this [`Event`] to.
    pub journal: Journal,

    /// Billed [`Period`].
    pub period: Period,

    /// [`DueDate`] of this [`Event`].
    pub due_date: DueDate,

    /// Billed [`Line`]s, never empty.
    pub lines: Vec<Line>,
}

impl Event {
    /// Returns the [`IdempotencyKey`] of the provided [`Line`] of this
    /// [`Event`].
    #[must_use]
    pub fn line_key(&self, line: &Line) -> IdempotencyKey {
        IdempotencyKey::of_line(self.contract_id, self.period.start, line.kind)
    }

    /// Returns the total amount of this [`Event`].
    ///
    /// [`None`] is returned if the [`Line`]s mix currencies.
    #[must_use]
    pub fn total(&self) -> Option<Money> {
        let (first, rest) = self.lines.split_first()?;
        rest.iter()
            .try_fold(first.amount, |sum, l| sum.checked_add(l.amount))
    }
}

/// Billed amount recorded in the ledger of a [`Contract`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Entry {
    /// [`IdempotencyKey`] of the billed [`Line`].
    pub key: IdempotencyKey,

    /// ID of the billed [`Contract`].
    pub contract_id: contract::Id,

    /// Billed [`fee::Kind`].
    pub fee: fee::Kind,

    /// Billed [`Period`].
    pub period: Period,

    /// Billed amount.
    pub amount: Money,

    /// [`DocumentRef`] of the accounting document this [`Entry`] is posted
    /// with.
    pub document: DocumentRef,
}
