//! [`Actor`] definitions.

use common::define_kind;
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::Contract;

/// Person performing actions upon [`Contract`]s.
#[derive(Clone, Copy, Debug)]
pub struct Actor {
    /// ID of this [`Actor`].
    pub id: Id,
}

/// ID of an [`Actor`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
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

define_kind! {
    #[doc = "Role an [`Actor`] may be granted."]
    enum Role {
        #[doc = "Manages [`Contract`]s: drafts, signs, activates, renews and \
                 terminates them."]
        Manager = 1,

        #[doc = "Approves or rejects drafted [`Contract`]s."]
        Approver = 2,
    }
}

/// [`Role`] granted to an [`Actor`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Grant {
    /// ID of the [`Actor`] the [`Role`] is granted to.
    pub actor_id: Id,

    /// Granted [`Role`].
    pub role: Role,
}
