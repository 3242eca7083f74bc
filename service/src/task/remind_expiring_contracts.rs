//! [`RemindExpiringContracts`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::{
    operations::{By, Insert, Perform, Select, Start},
    Date,
};
use smart_default::SmartDefault;
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{Contract, Notification},
    infra::{database, Database},
    read::contract::ExpiringOn,
    Service,
};

use super::Task;

/// Configuration for [`RemindExpiringContracts`] [`Task`].
#[derive(Clone, Debug, SmartDefault)]
pub struct Config {
    /// Interval between reminding passes.
    #[default(time::Duration::from_secs(24 * 60 * 60))]
    pub interval: time::Duration,

    /// Numbers of days before a lease end to remind about it on.
    #[default(vec![30, 15, 7])]
    pub days: Vec<u16>,
}

/// [`Task`] for reminding about active [`Contract`]s whose leases end soon.
#[derive(Clone, Debug)]
pub struct RemindExpiringContracts<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<S> RemindExpiringContracts<S> {
    /// Creates a new [`RemindExpiringContracts`] [`Task`] for a single pass.
    #[must_use]
    pub const fn new(config: Config, service: S) -> Self {
        Self { config, service }
    }
}

impl<Db, Acc> Task<Start<By<RemindExpiringContracts<Self>, Config>>>
    for Service<Db, Acc>
where
    RemindExpiringContracts<Self>: Task<Perform<Date>, Err: Error>,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<RemindExpiringContracts<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let task = RemindExpiringContracts::new(by.into_inner(), self.clone());

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            _ = task.execute(Perform(Date::today())).await.map_err(|e| {
                log::error!("`task::RemindExpiringContracts` failed: {e}");
            });
        }
    }
}

impl<Db, Acc> Task<Perform<Date>>
    for RemindExpiringContracts<Service<Db, Acc>>
where
    Db: Database<
            Select<By<Vec<Contract>, ExpiringOn>>,
            Ok = Vec<Contract>,
            Err = Traced<database::Error>,
        > + Database<Insert<Notification>, Err = Traced<database::Error>>,
{
    /// Number of issued [`Notification`]s.
    type Ok = usize;
    type Err = ExecutionError;

    async fn execute(
        &self,
        Perform(today): Perform<Date>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut issued = 0;
        for days in &self.config.days {
            let end = today.add_days(i64::from(*days));
            let expiring = self
                .service
                .database()
                .execute(Select(By::<Vec<Contract>, _>::new(ExpiringOn(end))))
                .await
                .map_err(tracerr::wrap!())?;

            for contract in expiring {
                log::info!(
                    "`Contract({})` lease ends in {days} days",
                    contract.reference,
                );
                self.service
                    .database()
                    .execute(Insert(Notification {
                        contract_id: contract.id,
                        message: format!(
                            "Lease of contract {} ends on {end}, {days} days \
                             left",
                            contract.reference,
                        ),
                        reference: contract.reference,
                        date: today,
                    }))
                    .await
                    .map_err(tracerr::wrap!())
                    .map(drop)?;
                issued += 1;
            }
        }
        Ok(issued)
    }
}

/// Error of [`RemindExpiringContracts`] execution.
pub type ExecutionError = Traced<database::Error>;

#[cfg(test)]
mod spec {
    use common::operations::Perform;

    use crate::{
        domain::contract::spec::{active, date},
        infra::{accounting, Memory},
        query, Config, Query as _, Service,
    };

    use super::{Config as TaskConfig, RemindExpiringContracts, Task as _};

    #[tokio::test]
    async fn reminds_on_configured_days_only() {
        let db = Memory::new();
        let c = active("2025-01-15", 1000);
        db.insert(c.clone()).await;
        let svc =
            Service::new(Config::default(), db, accounting::Memory::new());
        let task = RemindExpiringContracts::new(TaskConfig::default(), svc);

        for (today, issued) in [
            ("2025-12-15", 1),
            ("2025-12-16", 0),
            ("2025-12-30", 1),
            ("2026-01-07", 1),
            ("2026-01-08", 0),
        ] {
            let n = task.execute(Perform(date(today))).await.unwrap();
            assert_eq!(n, issued, "{today}");
        }

        let notifications = task
            .service
            .execute(query::contract::Notifications::by(c.id))
            .await
            .unwrap();
        assert_eq!(notifications.len(), 3);
        assert_eq!(
            notifications[0].message,
            format!(
                "Lease of contract {} ends on 2026-01-14, 30 days left",
                c.reference,
            ),
        );
    }
}
