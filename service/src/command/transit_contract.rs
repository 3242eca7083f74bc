//! [`Command`] for moving a [`Contract`] through its lifecycle.

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
        contract::{self, Transition, TransitionError},
        Contract, Notification,
    },
    infra::{database, Database},
    Service,
};
#[cfg(doc)]
use crate::domain::{actor::Actor, contract::State};

use super::Command;

/// [`Command`] for applying a [`Transition`] to a [`Contract`].
///
/// [`Transition::Approve`] and [`Transition::Reject`] require the
/// [`actor::Role::Approver`], while the rest require the
/// [`actor::Role::Manager`].
#[derive(Clone, Debug)]
pub struct TransitContract {
    /// ID of the [`Contract`] to be transited.
    pub contract_id: contract::Id,

    /// ID of the [`Actor`] who performs the [`Transition`].
    pub initiator_id: actor::Id,

    /// [`Transition`] to apply.
    pub transition: Transition,

    /// Reason of the [`Transition`], mentioned in the [`Notification`].
    pub reason: Option<String>,
}

impl TransitContract {
    /// Returns the [`actor::Role`] required to perform the [`Transition`].
    #[must_use]
    pub const fn required_role(&self) -> actor::Role {
        match self.transition {
            Transition::Approve | Transition::Reject => actor::Role::Approver,
            Transition::Sign
            | Transition::Activate
            | Transition::Renew
            | Transition::Terminate => actor::Role::Manager,
        }
    }
}

impl<Db, Acc> Command<TransitContract> for Service<Db, Acc>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<actor::Grant>, (actor::Id, actor::Role)>>,
            Ok = Option<actor::Grant>,
            Err = Traced<database::Error>,
        > + Database<Insert<Notification>, Err = Traced<database::Error>>,
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
        cmd: TransitContract,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let role = cmd.required_role();
        let TransitContract {
            contract_id,
            initiator_id,
            transition,
            reason,
        } = cmd;

        self.database()
            .execute(Select(By::<Option<actor::Grant>, _>::new((
                initiator_id,
                role,
            ))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::Unauthorized(initiator_id, role))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let today = Date::today();
        let contract = {
            let tx = self
                .database()
                .execute(Transact)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;

            // Avoid concurrent transitions and billing.
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
                .transit(transition, today)
                .map_err(|e| E::Transition(contract.reference.clone(), e))
                .map_err(tracerr::wrap!())?;

            tx.execute(Update(contract.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            tx.execute(Insert(contract::Version {
                contract: contract.clone(),
                change: contract::Change::Transition(transition),
                actor_id: initiator_id,
                date: today,
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

            tx.execute(Commit)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            contract
        };

        log::info!(
            "`Contract({})` is {} by `Actor({initiator_id})`, now `{}`",
            contract.reference,
            past_tense(transition),
            contract.state,
        );

        let notification = Notification {
            contract_id,
            reference: contract.reference.clone(),
            message: message(&contract.reference, transition, reason),
            date: today,
        };
        _ = self
            .database()
            .execute(Insert(notification))
            .await
            .map_err(|e| {
                log::warn!(
                    "failed to notify about `Contract({})` {transition}: {e}",
                    contract.reference,
                );
            });

        Ok(contract)
    }
}

/// Returns the past tense of the provided [`Transition`].
const fn past_tense(transition: Transition) -> &'static str {
    match transition {
        Transition::Approve => "approved",
        Transition::Reject => "rejected",
        Transition::Sign => "signed",
        Transition::Activate => "activated",
        Transition::Renew => "renewed",
        Transition::Terminate => "terminated",
    }
}

/// Composes the [`Notification`] message about the provided [`Transition`].
fn message(
    reference: &contract::Reference,
    transition: Transition,
    reason: Option<String>,
) -> String {
    let action = past_tense(transition);
    match reason {
        Some(reason) => format!("Contract {reference} is {action}: {reason}"),
        None => format!("Contract {reference} is {action}"),
    }
}

/// Error of [`TransitContract`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Contract`] with the provided ID does not exist.
    #[display("`Contract(id: {_0})` does not exist")]
    ContractNotExists(#[error(not(source))] contract::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Transition`] cannot be applied in the current [`State`].
    #[display("`Contract({_0})`: {_1}")]
    Transition(#[error(not(source))] contract::Reference, TransitionError),

    /// [`Actor`] is not granted the required [`actor::Role`].
    #[display("`Actor(id: {_0})` is not granted the `{_1}` role")]
    Unauthorized(
        #[error(not(source))] actor::Id,
        #[error(not(source))] actor::Role,
    ),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::{
            actor,
            contract::{
                spec::{contract, date},
                Change, InvalidTransition, State, Transition,
                TransitionError,
            },
            Contract,
        },
        infra::{accounting, Memory},
        query, Command as _, Config, Query as _, Service,
    };

    use super::{ExecutionError, TransitContract};

    struct Env {
        svc: Service<Memory, accounting::Memory>,
        manager: actor::Id,
        approver: actor::Id,
    }

    async fn env(contract: &Contract) -> Env {
        let db = Memory::new();
        let manager = actor::Id::new();
        let approver = actor::Id::new();
        db.grant(manager, actor::Role::Manager).await;
        db.grant(approver, actor::Role::Approver).await;
        db.insert(contract.clone()).await;
        let acc = accounting::Memory::new();
        Env {
            svc: Service::new(Config::default(), db, acc),
            manager,
            approver,
        }
    }

    impl Env {
        async fn transit(
            &self,
            contract: &Contract,
            transition: Transition,
        ) -> Result<Contract, tracerr::Traced<ExecutionError>> {
            let initiator_id = match transition {
                Transition::Approve | Transition::Reject => self.approver,
                Transition::Sign
                | Transition::Activate
                | Transition::Renew
                | Transition::Terminate => self.manager,
            };
            self.svc
                .execute(TransitContract {
                    contract_id: contract.id,
                    initiator_id,
                    transition,
                    reason: None,
                })
                .await
        }
    }

    #[tokio::test]
    async fn goes_through_lifecycle() {
        let c = contract("2025-01-15", 1000);
        let env = env(&c).await;

        for (t, s) in [
            (Transition::Approve, State::Approved),
            (Transition::Sign, State::Signed),
            (Transition::Activate, State::Active),
            (Transition::Renew, State::Renewed),
        ] {
            assert_eq!(env.transit(&c, t).await.unwrap().state, s);
        }

        let stored = env
            .svc
            .execute(query::contract::ById::by(c.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.state, State::Renewed);
        assert_eq!(
            stored.schedule.next_period_start,
            Some(date("2025-01-15")),
        );

        let notifications = env
            .svc
            .execute(query::contract::Notifications::by(c.id))
            .await
            .unwrap();
        assert_eq!(notifications.len(), 4);
        assert_eq!(
            notifications[0].message,
            format!("Contract {} is approved", c.reference),
        );

        let versions = env
            .svc
            .execute(query::contract::Versions::by(c.id))
            .await
            .unwrap();
        assert_eq!(
            versions.iter().map(|v| v.change).collect::<Vec<_>>(),
            [
                Change::Transition(Transition::Approve),
                Change::Transition(Transition::Sign),
                Change::Transition(Transition::Activate),
                Change::Transition(Transition::Renew),
            ],
        );
        assert_eq!(versions[0].contract.state, State::Approved);
        assert_eq!(versions[0].actor_id, env.approver);
        assert_eq!(versions[3].contract.state, State::Renewed);
    }

    #[tokio::test]
    async fn rejects_with_reason() {
        let c = contract("2025-01-15", 1000);
        let env = env(&c).await;

        let rejected = env
            .svc
            .execute(TransitContract {
                contract_id: c.id,
                initiator_id: env.approver,
                transition: Transition::Reject,
                reason: Some("wrong facade".into()),
            })
            .await
            .unwrap();
        assert_eq!(rejected.state, State::Draft);

        let notifications = env
            .svc
            .execute(query::contract::Notifications::by(c.id))
            .await
            .unwrap();
        assert_eq!(
            notifications[0].message,
            format!("Contract {} is rejected: wrong facade", c.reference),
        );
    }

    #[tokio::test]
    async fn names_required_state() {
        let c = contract("2025-01-15", 1000);
        let env = env(&c).await;

        let err = env.transit(&c, Transition::Sign).await.unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Transition(
                _,
                TransitionError::Invalid(InvalidTransition {
                    actual: State::Draft,
                    required: [State::Approved],
                    ..
                }),
            ),
        ));
        assert!(err.to_string().contains("required: `approved`"));
    }

    #[tokio::test]
    async fn terminated_is_final() {
        let c = contract("2025-01-15", 1000);
        let env = env(&c).await;

        _ = env.transit(&c, Transition::Approve).await.unwrap();
        let terminated = env.transit(&c, Transition::Terminate).await.unwrap();
        assert_eq!(terminated.state, State::Terminated);
        assert!(terminated.terminated_at.is_some());

        for t in Transition::ALL {
            assert!(env.transit(&c, *t).await.is_err(), "{t} must fail");
        }

        let versions = env
            .svc
            .execute(query::contract::Versions::by(c.id))
            .await
            .unwrap();
        assert_eq!(versions.len(), 2);
    }

    #[tokio::test]
    async fn checks_roles() {
        let c = contract("2025-01-15", 1000);
        let env = env(&c).await;

        let err = env
            .svc
            .execute(TransitContract {
                contract_id: c.id,
                initiator_id: env.manager,
                transition: Transition::Approve,
                reason: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Unauthorized(_, actor::Role::Approver),
        ));
    }
}
