//! [`Command`] for creating a new [`Contract`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    Date,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        actor,
        billing::{Escalation, Schedule},
        contract::{self, Lease, Terms, TermsError},
        facade, party, Contract,
    },
    infra::{database, Database},
    Service,
};
#[cfg(doc)]
use crate::domain::{actor::Actor, Facade};

use super::Command;

/// [`Command`] for creating a new [`Contract`] in the
/// [`contract::State::Draft`].
#[derive(Clone, Debug)]
pub struct CreateContract {
    /// ID of the [`Actor`] who creates the [`Contract`].
    pub initiator_id: actor::Id,

    /// [`contract::Kind`] of a new [`Contract`].
    pub kind: contract::Kind,

    /// ID of the leased [`Facade`].
    pub facade_id: facade::Id,

    /// ID of the mall operator.
    pub operator_id: party::Id,

    /// ID of the counterparty.
    pub counterparty_id: party::Id,

    /// ID of the property-management company, if any.
    pub property_company_id: Option<party::Id>,

    /// ID of the landlord, if it differs from the counterparty.
    pub landlord_id: Option<party::Id>,

    /// Financial [`Terms`] of a new [`Contract`].
    pub terms: Terms,

    /// [`Lease`] of a new [`Contract`], if already agreed.
    pub lease: Option<Lease>,

    /// Rent [`Escalation`] policy, if any.
    pub escalation: Option<Escalation>,
}

impl<Db, Acc> Command<CreateContract> for Service<Db, Acc>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<actor::Grant>, (actor::Id, actor::Role)>>,
            Ok = Option<actor::Grant>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Select<By<contract::Reference, contract::Kind>>,
            Ok = contract::Reference,
            Err = Traced<database::Error>,
        > + Database<Insert<Contract>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Contract;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateContract,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateContract {
            initiator_id,
            kind,
            facade_id,
            operator_id,
            counterparty_id,
            property_company_id,
            landlord_id,
            terms,
            lease,
            escalation,
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

        terms
            .check()
            .map_err(E::InvalidTerms)
            .map_err(tracerr::wrap!())?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let reference = tx
            .execute(Select(By::<contract::Reference, _>::new(kind)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let contract = Contract {
            id: contract::Id::new(),
            reference,
            kind,
            facade_id,
            operator_id,
            counterparty_id,
            property_company_id,
            landlord_id,
            terms,
            lease,
            escalation,
            schedule: Schedule::default(),
            state: contract::State::Draft,
            created_at: Date::today().coerce(),
            terminated_at: None,
        };
        if contract.flow().is_none() {
            return Err(tracerr::new!(E::PartyMissing(kind)));
        }

        tx.execute(Insert(contract.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`Contract({})` drafted by `Actor({initiator_id})`",
            contract.reference,
        );

        Ok(contract)
    }
}

/// Error of [`CreateContract`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Terms`] are inconsistent.
    #[display("Invalid `Terms`: {_0}")]
    InvalidTerms(TermsError),

    /// Party required by the [`contract::Kind`] is not provided.
    #[display("`{_0}` contract requires a party which is not provided")]
    PartyMissing(#[error(not(source))] contract::Kind),

    /// [`Actor`] is not granted to manage [`Contract`]s.
    #[display("`Actor(id: {_0})` is not a contract manager")]
    Unauthorized(#[error(not(source))] actor::Id),
}

#[cfg(test)]
mod spec {
    use common::{money::Currency, Money};

    use crate::{
        domain::{
            actor,
            contract::{self, spec::terms, State},
            facade, party, Contract,
        },
        infra::{accounting, Memory},
        query, Command as _, Config, Query as _, Service,
    };

    use super::{CreateContract, ExecutionError};

    fn command(initiator_id: actor::Id) -> CreateContract {
        CreateContract {
            initiator_id,
            kind: contract::Kind::Tenant,
            facade_id: facade::Id::new(),
            operator_id: party::Id::new(),
            counterparty_id: party::Id::new(),
            property_company_id: None,
            landlord_id: None,
            terms: terms(1000),
            lease: None,
            escalation: None,
        }
    }

    async fn service() -> (Service<Memory, accounting::Memory>, actor::Id) {
        let db = Memory::new();
        let manager = actor::Id::new();
        db.grant(manager, actor::Role::Manager).await;
        let acc = accounting::Memory::new();
        (Service::new(Config::default(), db, acc), manager)
    }

    #[tokio::test]
    async fn creates_draft_with_sequential_references() {
        let (svc, manager) = service().await;

        let first = svc.execute(command(manager)).await.unwrap();
        let second = svc.execute(command(manager)).await.unwrap();

        assert_eq!(first.state, State::Draft);
        assert_eq!(first.reference.to_string(), "TEN-000001");
        assert_eq!(second.reference.to_string(), "TEN-000002");

        let stored = svc
            .execute(query::contract::ById::by(first.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.reference, first.reference);
    }

    #[tokio::test]
    async fn requires_manager_role() {
        let (svc, _) = service().await;
        let stranger = actor::Id::new();

        let err = svc.execute(command(stranger)).await.unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Unauthorized(id) if *id == stranger,
        ));
    }

    #[tokio::test]
    async fn rejects_mixed_currencies() {
        let (svc, manager) = service().await;
        let mut cmd = command(manager);
        cmd.terms.deposit =
            Some(Money::new(1000.into(), Currency::Usd));

        let err = svc.execute(cmd).await.unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::InvalidTerms(_)));
    }

    #[tokio::test]
    async fn property_contract_requires_property_company() {
        let (svc, manager) = service().await;
        let mut cmd = command(manager);
        cmd.kind = contract::Kind::Property;

        let err = svc.execute(cmd.clone()).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::PartyMissing(_)));

        cmd.property_company_id = Some(party::Id::new());
        let c: Contract = svc.execute(cmd).await.unwrap();
        assert_eq!(c.reference.to_string(), "PRO-000001");
    }
}
