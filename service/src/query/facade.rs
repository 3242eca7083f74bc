//! [`Query`] of a [`Facade`] occupancy.

use common::{
    operations::{By, Select},
    Date,
};
use tracerr::Traced;

use crate::{
    domain::{facade, Contract, Facade},
    infra::{database, Database},
    Service,
};

use super::Query;

/// [`Query`] deriving the current [`facade::Status`] of a [`Facade`].
#[derive(Clone, Copy, Debug)]
pub struct Status {
    /// ID of the queried [`Facade`].
    pub facade_id: facade::Id,

    /// [`Date`] to derive the [`facade::Status`] on.
    pub today: Date,
}

impl<Db, Acc> Query<Status> for Service<Db, Acc>
where
    Db: Database<
        Select<By<Vec<Contract>, facade::Id>>,
        Ok = Vec<Contract>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Facade;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Status { facade_id, today }: Status,
    ) -> Result<Self::Ok, Self::Err> {
        let contracts = self
            .database()
            .execute(Select(By::new(facade_id)))
            .await
            .map_err(tracerr::wrap!())?;
        Ok(Facade::of(facade_id, &contracts, today))
    }
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::{
            contract::spec::{active, contract, date},
            facade,
        },
        infra::{accounting, Memory},
        Config, Query as _, Service,
    };

    use super::Status;

    #[tokio::test]
    async fn derives_status_from_active_tenant_contract() {
        let db = Memory::new();
        let leased = active("2025-01-15", 1000);
        let mut draft = contract("2025-01-15", 1000);
        draft.facade_id = leased.facade_id;
        db.insert(leased.clone()).await;
        db.insert(draft).await;
        let svc =
            Service::new(Config::default(), db, accounting::Memory::new());

        let status = |today| Status {
            facade_id: leased.facade_id,
            today: date(today),
        };
        assert_eq!(
            svc.execute(status("2025-06-01")).await.unwrap().status,
            facade::Status::Leased,
        );
        assert_eq!(
            svc.execute(status("2026-01-01")).await.unwrap().status,
            facade::Status::Expiring,
        );
        assert_eq!(
            svc.execute(status("2026-02-01")).await.unwrap().status,
            facade::Status::Vacant,
        );
    }
}
