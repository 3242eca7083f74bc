//! [`Command`] for amending a [`Contract`].

use common::{
    operations::{
        By, Commit, Insert, Lock, Select, Transact, Transacted, Update,
    },
    Date,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        actor,
        contract::{self, Amendment, AmendmentError},
        Contract,
    },
    infra::{database, Database},
    Service,
};
#[cfg(doc)]
use crate::domain::actor::Actor;

use super::Command;

/// [`Command`] for applying an [`Amendment`] to a [`Contract`].
#[derive(Clone, Debug)]
pub struct UpdateContract {
    /// ID of the [`Contract`] to be amended.
    pub contract_id: contract::Id,

    /// ID of the [`Actor`] who amends the [`Contract`].
    pub initiator_id: actor::Id,

    /// [`Amendment`] to apply.
    pub amendment: Amendment,
}

impl<Db, Acc> Command<UpdateContract> for Service<Db, Acc>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<actor::Grant>, (actor::Id, actor::Role)>>,
            Ok = Option<actor::Grant>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Contract, contract::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Contract>, contract::Id>>,
            Ok = Option<Contract>,
            Err = Traced<database::Error>,
        > + Database<Update<Contract>, Err = Traced<database::Error>>
        + Database<Insert<contract::Version>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Contract;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateContract,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateContract {
            contract_id,
            initiator_id,
            amendment,
        } = cmd;

        self.database()
            .execute(Select(By::<Option<actor::Grant>, _>::new((
                initiator_id,
                actor::Role::Manager,
            ))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::Unauthorized(initiator_id))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent billing of the amended `Contract`.
        tx.execute(Lock(By::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut contract = tx
            .execute(Select(By::<Option<Contract>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ContractNotExists(contract_id))
            .map_err(tracerr::wrap!())?;

        contract
            .amend(amendment)
            .map_err(E::Amendment)
            .map_err(tracerr::wrap!())?;

        tx.execute(Update(contract.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Insert(contract::Version {
            contract: contract.clone(),
            change: contract::Change::Amendment,
            actor_id: initiator_id,
            date: Date::today(),
        }))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
        .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`Contract({})` amended by `Actor({initiator_id})`",
            contract.reference,
        );

        Ok(contract)
    }
}

/// Error of [`UpdateContract`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Amendment`] is not allowed.
    #[display("Cannot amend `Contract`: {_0}")]
    Amendment(AmendmentError),

    /// [`Contract`] with the provided ID does not exist.
    #[display("`Contract(id: {_0})` does not exist")]
    ContractNotExists(#[error(not(source))] contract::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Actor`] is not granted to manage [`Contract`]s.
    #[display("`Actor(id: {_0})` is not a contract manager")]
    Unauthorized(#[error(not(source))] actor::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::{
            actor,
            contract::{
                self,
                spec::{active, cny, contract, lease, terms},
                Amendment, AmendmentError, Change, State,
            },
            Contract,
        },
        infra::{accounting, Memory},
        query, Command as _, Config, Query as _, Service,
    };

    use super::{ExecutionError, UpdateContract};

    async fn service(
        contract: &Contract,
    ) -> (Service<Memory, accounting::Memory>, actor::Id) {
        let db = Memory::new();
        let manager = actor::Id::new();
        db.grant(manager, actor::Role::Manager).await;
        db.insert(contract.clone()).await;
        let acc = accounting::Memory::new();
        (Service::new(Config::default(), db, acc), manager)
    }

    fn update(
        contract_id: contract::Id,
        initiator_id: actor::Id,
        amendment: Amendment,
    ) -> UpdateContract {
        UpdateContract {
            contract_id,
            initiator_id,
            amendment,
        }
    }

    #[tokio::test]
    async fn amends_draft() {
        let c = contract("2025-01-15", 1000);
        let (svc, manager) = service(&c).await;

        let amended = svc
            .execute(update(
                c.id,
                manager,
                Amendment {
                    kind: Some(contract::Kind::Landlord),
                    terms: Some(terms(2000)),
                    lease: Some(lease("2025-03-01", 3)),
                    escalation: None,
                },
            ))
            .await
            .unwrap();

        assert_eq!(amended.kind, contract::Kind::Landlord);
        assert_eq!(amended.terms.rent, cny(2000));
        assert_eq!(amended.lease.map(|l| l.term.get()), Some(3));
        assert_eq!(amended.state, State::Draft);

        let versions = svc
            .execute(query::contract::Versions::by(c.id))
            .await
            .unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].change, Change::Amendment);
        assert_eq!(versions[0].actor_id, manager);
        assert_eq!(versions[0].contract.terms.rent, cny(2000));
    }

    #[tokio::test]
    async fn locks_kind_and_schedule_of_active_contract() {
        let c = active("2025-01-15", 1000);
        let (svc, manager) = service(&c).await;

        let err = svc
            .execute(update(
                c.id,
                manager,
                Amendment {
                    kind: Some(contract::Kind::Landlord),
                    ..Amendment::default()
                },
            ))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::Amendment(AmendmentError::KindLocked(
                State::Active
            )),
        ));

        let err = svc
            .execute(update(
                c.id,
                manager,
                Amendment {
                    lease: Some(lease("2026-01-01", 1)),
                    ..Amendment::default()
                },
            ))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::Amendment(AmendmentError::ScheduleLocked(_)),
        ));

        let versions = svc
            .execute(query::contract::Versions::by(c.id))
            .await
            .unwrap();
        assert!(versions.is_empty());
    }

    #[tokio::test]
    async fn fails_for_unknown_contract() {
        let c = contract("2025-01-15", 1000);
        let (svc, manager) = service(&c).await;
        let unknown = contract::Id::new();

        let err = svc
            .execute(update(unknown, manager, Amendment::default()))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::ContractNotExists(id) if *id == unknown,
        ));
    }
}
