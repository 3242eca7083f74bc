//! Lifecycle [`State`] machine of a [`Contract`].

use common::define_kind;
use derive_more::{Display, Error, From};

#[cfg(doc)]
use crate::domain::Contract;

define_kind! {
    #[doc = "Lifecycle state of a [`Contract`]."]
    enum State {
        #[doc = "Being drafted, editable."]
        Draft = 1,

        #[doc = "Approved, awaiting signature."]
        Approved = 2,

        #[doc = "Signed by all the parties."]
        Signed = 3,

        #[doc = "In force and billed."]
        Active = 4,

        #[doc = "Superseded by a renewal."]
        Renewed = 5,

        #[doc = "Terminated, final."]
        Terminated = 6,
    }
}

impl State {
    /// Returns the [`State`] the provided [`Transition`] leads to from this
    /// one.
    ///
    /// # Errors
    ///
    /// If the [`Transition`] is not allowed from this [`State`].
    pub fn transit(
        self,
        transition: Transition,
    ) -> Result<Self, InvalidTransition> {
        let required = transition.required();
        if !required.contains(&self) {
            return Err(InvalidTransition {
                transition,
                actual: self,
                required,
            });
        }
        Ok(transition.target())
    }
}

define_kind! {
    #[doc = "Allowed change of a [`Contract`] [`State`]."]
    enum Transition {
        #[doc = "`draft` -> `approved`"]
        Approve = 1,

        #[doc = "`draft` -> `draft`, with a reason recorded."]
        Reject = 2,

        #[doc = "`approved` -> `signed`"]
        Sign = 3,

        #[doc = "`signed` -> `active`"]
        Activate = 4,

        #[doc = "`active` -> `renewed`"]
        Renew = 5,

        #[doc = "`approved`, `signed` or `active` -> `terminated`"]
        Terminate = 6,
    }
}

impl Transition {
    /// Returns [`State`]s this [`Transition`] is allowed from.
    #[must_use]
    pub const fn required(self) -> &'static [State] {
        match self {
            Self::Approve | Self::Reject => &[State::Draft],
            Self::Sign => &[State::Approved],
            Self::Activate => &[State::Signed],
            Self::Renew => &[State::Active],
            Self::Terminate => &[State::Approved, State::Signed, State::Active],
        }
    }

    /// Returns the [`State`] this [`Transition`] leads to.
    #[must_use]
    pub const fn target(self) -> State {
        match self {
            Self::Approve => State::Approved,
            Self::Reject => State::Draft,
            Self::Sign => State::Signed,
            Self::Activate => State::Active,
            Self::Renew => State::Renewed,
            Self::Terminate => State::Terminated,
        }
    }
}

/// [`Transition`] is not allowed from the actual [`State`].
#[derive(Clone, Copy, Debug, Display, Error)]
#[display(
    "cannot {transition} in `{actual}` state, required: {}",
    listed(required),
)]
pub struct InvalidTransition {
    /// Attempted [`Transition`].
    pub transition: Transition,

    /// Actual [`State`].
    pub actual: State,

    /// [`State`]s the [`Transition`] is allowed from.
    pub required: &'static [State],
}

/// Lists the provided [`State`]s as "`a` or `b`".
fn listed(states: &[State]) -> String {
    states
        .iter()
        .map(|s| format!("`{s}`"))
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Error of applying a [`Transition`] to a [`Contract`].
#[derive(Clone, Copy, Debug, Display, Error, From)]
pub enum TransitionError {
    /// [`Transition`] is not allowed.
    #[display("{_0}")]
    #[from]
    Invalid(InvalidTransition),

    /// [`Contract`] has no lease to be activated with.
    #[display("contract has no lease start date")]
    LeaseMissing,
}
