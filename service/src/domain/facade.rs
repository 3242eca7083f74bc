//! [`Facade`] definitions.

use common::{define_kind, Date};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    contract::{self, State},
    Contract,
};

/// Number of days before a lease end when a [`Facade`] is considered
/// [`Status::Expiring`].
pub const EXPIRING_WITHIN_DAYS: i64 = 30;

/// Leasable retail unit of a mall.
#[derive(Clone, Copy, Debug)]
pub struct Facade {
    /// ID of this [`Facade`].
    pub id: Id,

    /// Current [`Status`] of this [`Facade`].
    pub status: Status,
}

impl Facade {
    /// Derives the [`Facade`] with the provided ID out of its [`Contract`]s.
    ///
    /// The [`Facade`] is leased while it has an active tenant [`Contract`],
    /// and expiring when that lease ends within [`EXPIRING_WITHIN_DAYS`].
    #[must_use]
    pub fn of<'c>(
        id: Id,
        contracts: impl IntoIterator<Item = &'c Contract>,
        today: Date,
    ) -> Self {
        let days_left = contracts
            .into_iter()
            .filter(|c| {
                c.facade_id == id
                    && c.kind == contract::Kind::Tenant
                    && c.state == State::Active
            })
            .filter_map(|c| c.days_to_expiry(today))
            .filter(|d| *d >= 0)
            .max();

        let status = match days_left {
            None => Status::Vacant,
            Some(d) if d <= EXPIRING_WITHIN_DAYS => Status::Expiring,
            Some(_) => Status::Leased,
        };
        Self { id, status }
    }
}

/// ID of a [`Facade`].
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
    #[doc = "Leasing status of a [`Facade`]."]
    enum Status {
        #[doc = "Not leased to anyone."]
        Vacant = 1,

        #[doc = "Leased to a tenant."]
        Leased = 2,

        #[doc = "Leased to a tenant, but the lease ends soon."]
        Expiring = 3,
    }
}

#[cfg(test)]
mod spec {
    use crate::domain::contract::{
        self,
        spec::{active, contract, date},
    };

    use super::{Facade, Id, Status};

    #[test]
    fn vacant_without_active_contract() {
        let draft = contract("2025-01-15", 1000);
        let id = draft.facade_id;

        let today = date("2025-03-01");

        assert_eq!(Facade::of(id, [&draft], today).status, Status::Vacant);
        assert_eq!(Facade::of(Id::new(), [], today).status, Status::Vacant);
    }

    #[test]
    fn leased_and_expiring() {
        let c = active("2025-01-15", 1000);
        let id = c.facade_id;

        for (today, status) in [
            ("2025-03-01", Status::Leased),
            ("2025-12-15", Status::Expiring),
            ("2026-01-14", Status::Expiring),
            ("2026-01-15", Status::Vacant),
        ] {
            let facade = Facade::of(id, [&c], date(today));
            assert_eq!(facade.status, status, "{today}");
        }
    }

    #[test]
    fn ignores_non_tenant_contracts() {
        let mut c = active("2025-01-15", 1000);
        c.kind = contract::Kind::Landlord;

        assert_eq!(
            Facade::of(c.facade_id, [&c], date("2025-03-01")).status,
            Status::Vacant,
        );
    }
}
