//! [`Accounting`] system integration.
//!
//! Postings are idempotent: posting an [`Event`] with an already posted
//! [`IdempotencyKey`] returns the [`DocumentRef`] of the existing document
//! instead of creating a new one.
//!
//! [`DocumentRef`]: crate::domain::billing::DocumentRef
//! [`Event`]: crate::domain::billing::Event
//! [`IdempotencyKey`]: crate::domain::billing::IdempotencyKey

#[cfg(any(test, feature = "memory"))]
pub mod memory;
#[cfg(feature = "postgres")]
mod postgres;

use derive_more::{Display, Error as StdError, From};

use crate::infra::database;

#[cfg(any(test, feature = "memory"))]
pub use self::memory::Memory;

/// Accounting system operation.
pub use common::Handler as Accounting;

/// [`Accounting`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// Concurrent posting of the same document interfered, so it may be
    /// retried.
    #[display("Posting conflicted with a concurrent one")]
    #[from(ignore)]
    Conflict,

    /// [`database::Error`] of the accounting storage.
    #[display("Accounting storage failed: {_0}")]
    Db(database::Error),

    /// Posted amounts mix different currencies.
    #[display("Posted amounts mix different currencies")]
    #[from(ignore)]
    MixedCurrencies,

    /// Accounting system is temporarily unavailable.
    #[display("Accounting system is unavailable")]
    #[from(ignore)]
    Unavailable,
}
