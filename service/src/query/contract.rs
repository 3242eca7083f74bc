//! [`Query`] collection related to a single [`Contract`].

use common::operations::By;

use crate::domain::{billing, contract, facade, Contract, Notification};
#[cfg(doc)]
use crate::{domain::Facade, Query};

use super::DatabaseQuery;

/// Queries a [`Contract`] by its [`contract::Id`].
pub type ById = DatabaseQuery<By<Option<Contract>, contract::Id>>;

/// Queries all the [`Contract`]s of a [`Facade`].
pub type ByFacade = DatabaseQuery<By<Vec<Contract>, facade::Id>>;

/// Queries the billing ledger of a [`Contract`].
pub type BillingEntries = DatabaseQuery<By<Vec<billing::Entry>, contract::Id>>;

/// Queries the recorded [`contract::Version`]s of a [`Contract`], oldest
/// first.
pub type Versions = DatabaseQuery<By<Vec<contract::Version>, contract::Id>>;

/// Queries [`Notification`]s issued about a [`Contract`].
pub type Notifications = DatabaseQuery<By<Vec<Notification>, contract::Id>>;
