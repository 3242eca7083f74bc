//! [`Version`] history of a [`Contract`].

use common::Date;
use derive_more::Display;

use crate::domain::{actor, contract::Transition, Contract};
#[cfg(doc)]
use crate::domain::contract::Amendment;

/// Snapshot of a [`Contract`] taken right after its [`Change`].
///
/// [`Version`]s are append-only. Each one is recorded in the same
/// transaction as the [`Change`] itself.
#[derive(Clone, Debug)]
pub struct Version {
    /// Snapshot of the changed [`Contract`].
    pub contract: Contract,

    /// [`Change`] recorded by this [`Version`].
    pub change: Change,

    /// ID of the [`actor::Actor`] who made the [`Change`].
    pub actor_id: actor::Id,

    /// [`Date`] the [`Change`] was made on.
    pub date: Date,
}

/// Change of a [`Contract`] recorded by a [`Version`].
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Change {
    /// [`Amendment`] has been applied.
    #[display("amendment")]
    Amendment,

    /// Lifecycle [`Transition`] has been applied.
    #[display("{_0}")]
    Transition(Transition),
}

impl Change {
    /// Returns the applied [`Transition`], if any.
    #[must_use]
    pub const fn transition(self) -> Option<Transition> {
        match self {
            Self::Amendment => None,
            Self::Transition(t) => Some(t),
        }
    }
}

impl From<Option<Transition>> for Change {
    fn from(transition: Option<Transition>) -> Self {
        transition.map_or(Self::Amendment, Self::Transition)
    }
}

#[cfg(test)]
mod spec {
    use crate::domain::contract::Transition;

    use super::Change;

    #[test]
    fn maps_stored_transition() {
        assert_eq!(Change::from(None), Change::Amendment);
        assert_eq!(
            Change::from(Some(Transition::Sign)),
            Change::Transition(Transition::Sign),
        );
        assert_eq!(Change::Transition(Transition::Sign).to_string(), "sign");
        assert_eq!(Change::Amendment.transition(), None);
    }
}
