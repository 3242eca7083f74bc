//! [`Notification`] definitions.

use common::Date;

use crate::domain::contract;
#[cfg(doc)]
use crate::domain::Contract;

/// Message about a [`Contract`] addressed to its responsible people.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notification {
    /// ID of the [`Contract`] this [`Notification`] is about.
    pub contract_id: contract::Id,

    /// [`contract::Reference`] of the [`Contract`].
    pub reference: contract::Reference,

    /// Human-readable text.
    pub message: String,

    /// [`Date`] this [`Notification`] was issued on.
    pub date: Date,
}
