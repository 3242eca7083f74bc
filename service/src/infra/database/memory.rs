//! In-memory [`Database`] implementation.
//!
//! A transaction holds the whole storage exclusively and works on its copy,
//! which replaces the storage on commit.

use std::{collections::HashMap, future::Future, sync::Arc};

use common::operations::{By, Commit, Insert, Lock, Select, Transact, Update};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracerr::Traced;

use crate::{
    domain::{actor, billing, contract, facade, Contract, Notification},
    infra::{database, Database},
    read,
};

/// In-memory [`Database`].
#[derive(Clone, Debug, Default)]
pub struct Memory<T = NonTx>(T);

/// Stored data of a [`Memory`] [`Database`].
#[derive(Clone, Debug, Default)]
pub struct Data {
    /// Stored [`Contract`]s.
    pub contracts: HashMap<contract::Id, Contract>,

    /// Recorded [`contract::Version`]s, in recording order.
    pub versions: Vec<contract::Version>,

    /// Billing ledger.
    pub entries: Vec<billing::Entry>,

    /// Issued [`Notification`]s.
    pub notifications: Vec<Notification>,

    /// Granted [`actor::Role`]s.
    pub grants: Vec<actor::Grant>,

    /// Last used [`contract::Reference`] sequence numbers.
    pub sequences: HashMap<contract::Kind, u32>,
}

/// Non-transactional access to a [`Memory`] [`Database`].
#[derive(Clone, Debug, Default)]
pub struct NonTx {
    /// Shared [`Data`].
    data: Arc<Mutex<Data>>,
}

/// Transactional access to a [`Memory`] [`Database`].
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`Staged`] changes, or [`None`] once committed.
    staged: Arc<Mutex<Option<Staged>>>,
}

/// Changes of a [`Tx`] not committed yet.
#[derive(Debug)]
struct Staged {
    /// Exclusively held [`Data`].
    guard: OwnedMutexGuard<Data>,

    /// Changed copy of the held [`Data`].
    data: Data,
}

/// Access to [`Data`] of a [`Memory`] [`Database`].
pub trait Access {
    /// Runs the provided function over the accessed [`Data`].
    ///
    /// # Errors
    ///
    /// If the [`Data`] cannot be accessed.
    fn access<R>(
        &self,
        f: impl FnOnce(&mut Data) -> R,
    ) -> impl Future<Output = Result<R, Traced<database::Error>>>;
}

impl Access for NonTx {
    async fn access<R>(
        &self,
        f: impl FnOnce(&mut Data) -> R,
    ) -> Result<R, Traced<database::Error>> {
        Ok(f(&mut *self.data.lock().await))
    }
}

impl Access for Tx {
    async fn access<R>(
        &self,
        f: impl FnOnce(&mut Data) -> R,
    ) -> Result<R, Traced<database::Error>> {
        let mut staged = self.staged.lock().await;
        let staged = staged
            .as_mut()
            .ok_or_else(|| tracerr::new!(database::Error::Committed))?;
        Ok(f(&mut staged.data))
    }
}

impl Memory {
    /// Creates a new empty [`Memory`] [`Database`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants the provided [`actor::Role`] to the provided [`actor::Actor`].
    pub async fn grant(&self, actor_id: actor::Id, role: actor::Role) {
        self.0
            .data
            .lock()
            .await
            .grants
            .push(actor::Grant { actor_id, role });
    }

    /// Stores the provided [`Contract`] as is.
    pub async fn insert(&self, contract: Contract) {
        _ = self.0.data.lock().await.contracts.insert(contract.id, contract);
    }
}

impl Database<Transact> for Memory<NonTx> {
    type Ok = Memory<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        let guard = Arc::clone(&self.0.data).lock_owned().await;
        let data = guard.clone();
        Ok(Memory(Tx {
            staged: Arc::new(Mutex::new(Some(Staged { guard, data }))),
        }))
    }
}

impl Database<Transact> for Memory<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        if let Some(Staged { mut guard, data }) =
            self.0.staged.lock().await.take()
        {
            *guard = data;
        }
        Ok(())
    }
}

impl Database<Lock<By<Contract, contract::Id>>> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Contract, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Transaction holds all the data exclusively.
        Ok(())
    }
}

impl<C: Access> Database<Select<By<Option<Contract>, contract::Id>>>
    for Memory<C>
{
    type Ok = Option<Contract>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Contract>, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.0
            .access(|d| d.contracts.get(&id).cloned())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Select<By<Vec<Contract>, facade::Id>>> for Memory<C> {
    type Ok = Vec<Contract>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Contract>, facade::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.0
            .access(|d| {
                d.contracts
                    .values()
                    .filter(|c| c.facade_id == id)
                    .cloned()
                    .collect()
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access>
    Database<Select<By<Vec<read::contract::Due>, read::contract::DueOn>>>
    for Memory<C>
{
    type Ok = Vec<read::contract::Due>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<read::contract::Due>, read::contract::DueOn>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::contract::DueOn(today) = by.into_inner();
        self.0
            .access(|d| {
                let mut due = d
                    .contracts
                    .values()
                    .filter(|c| c.is_due(today))
                    .collect::<Vec<_>>();
                due.sort_by(|a, b| {
                    (a.schedule.next_bill_date, &a.reference)
                        .cmp(&(b.schedule.next_bill_date, &b.reference))
                });
                due.into_iter()
                    .map(|c| read::contract::Due {
                        id: c.id,
                        reference: c.reference.clone(),
                    })
                    .collect()
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Select<By<Vec<Contract>, read::contract::ExpiringOn>>>
    for Memory<C>
{
    type Ok = Vec<Contract>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Contract>, read::contract::ExpiringOn>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::contract::ExpiringOn(date) = by.into_inner();
        self.0
            .access(|d| {
                d.contracts
                    .values()
                    .filter(|c| {
                        c.state == contract::State::Active
                            && c.lease.is_some_and(|l| l.end() == date)
                    })
                    .cloned()
                    .collect()
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Insert<Contract>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(contract): Insert<Contract>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0
            .access(|d| {
                _ = d.contracts.insert(contract.id, contract);
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Update<Contract>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(contract): Update<Contract>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Insert(contract))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Insert<contract::Version>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(version): Insert<contract::Version>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0
            .access(|d| d.versions.push(version))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Select<By<Vec<contract::Version>, contract::Id>>>
    for Memory<C>
{
    type Ok = Vec<contract::Version>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<contract::Version>, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.0
            .access(|d| {
                d.versions
                    .iter()
                    .filter(|v| v.contract.id == id)
                    .cloned()
                    .collect()
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Select<By<contract::Reference, contract::Kind>>>
    for Memory<C>
{
    type Ok = contract::Reference;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<contract::Reference, contract::Kind>>,
    ) -> Result<Self::Ok, Self::Err> {
        let kind = by.into_inner();
        self.0
            .access(|d| {
                let seq = d.sequences.entry(kind).or_default();
                *seq += 1;
                contract::Reference::generate(kind, *seq)
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Insert<billing::Entry>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(entry): Insert<billing::Entry>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0
            .access(|d| {
                if !d.entries.iter().any(|e| e.key == entry.key) {
                    d.entries.push(entry);
                }
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Select<By<Vec<billing::Entry>, contract::Id>>>
    for Memory<C>
{
    type Ok = Vec<billing::Entry>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<billing::Entry>, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.0
            .access(|d| {
                d.entries
                    .iter()
                    .filter(|e| e.contract_id == id)
                    .cloned()
                    .collect()
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Insert<Notification>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(notification): Insert<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0
            .access(|d| d.notifications.push(notification))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Select<By<Vec<Notification>, contract::Id>>>
    for Memory<C>
{
    type Ok = Vec<Notification>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Notification>, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.0
            .access(|d| {
                d.notifications
                    .iter()
                    .filter(|n| n.contract_id == id)
                    .cloned()
                    .collect()
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access>
    Database<Select<By<Option<actor::Grant>, (actor::Id, actor::Role)>>>
    for Memory<C>
{
    type Ok = Option<actor::Grant>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<actor::Grant>, (actor::Id, actor::Role)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (actor_id, role) = by.into_inner();
        self.0
            .access(|d| {
                d.grants
                    .iter()
                    .find(|g| g.actor_id == actor_id && g.role == role)
                    .copied()
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Commit, Insert, Select, Transact};

    use crate::{
        domain::{contract, Contract},
        infra::Database as _,
    };

    use super::Memory;

    #[tokio::test]
    async fn commit_publishes_changes() {
        let db = Memory::new();
        let c = contract::spec::contract("2025-01-15", 1000);

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Insert(c.clone())).await.unwrap();
        tx.execute(Commit).await.unwrap();

        let found = db
            .execute(Select(By::<Option<Contract>, _>::new(c.id)))
            .await
            .unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn dropped_transaction_is_discarded() {
        let db = Memory::new();
        let c = contract::spec::contract("2025-01-15", 1000);

        {
            let tx = db.execute(Transact).await.unwrap();
            tx.execute(Insert(c.clone())).await.unwrap();
        }

        let found = db
            .execute(Select(By::<Option<Contract>, _>::new(c.id)))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn generates_sequential_references() {
        let db = Memory::new();

        for expected in ["TEN-000001", "TEN-000002"] {
            let r = db
                .execute(Select(By::<contract::Reference, _>::new(
                    contract::Kind::Tenant,
                )))
                .await
                .unwrap();
            assert_eq!(r.to_string(), expected);
        }
        let r = db
            .execute(Select(By::<contract::Reference, _>::new(
                contract::Kind::Landlord,
            )))
            .await
            .unwrap();
        assert_eq!(r.to_string(), "LAN-000001");
    }
}
