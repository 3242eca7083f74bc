//! [`Contract`] read model definitions.

use common::Date;

use crate::domain::contract;
#[cfg(doc)]
use crate::domain::Contract;

/// Active [`Contract`] with a bill due.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Due {
    /// ID of the [`Contract`].
    pub id: contract::Id,

    /// [`contract::Reference`] of the [`Contract`].
    pub reference: contract::Reference,
}

/// Selector of active [`Contract`]s with a bill due on the provided [`Date`].
///
/// Selected [`Contract`]s are ordered by their bill dates.
#[derive(Clone, Copy, Debug)]
pub struct DueOn(pub Date);

/// Selector of active [`Contract`]s whose lease ends on the provided [`Date`].
#[derive(Clone, Copy, Debug)]
pub struct ExpiringOn(pub Date);
