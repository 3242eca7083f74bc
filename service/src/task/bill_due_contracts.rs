//! [`BillDueContracts`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::{
    operations::{By, Perform, Select, Start},
    Date,
};
use futures::{stream, StreamExt as _};
use smart_default::SmartDefault;
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    command::{generate_bill, GenerateBill},
    domain::{billing::DocumentRef, contract},
    infra::{database, Database},
    read::contract::{Due, DueOn},
    Command, Service,
};
#[cfg(doc)]
use crate::domain::Contract;

use super::Task;

/// Configuration for [`BillDueContracts`] [`Task`].
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Interval between billing passes.
    #[default(time::Duration::from_secs(60 * 60))]
    pub interval: time::Duration,

    /// Maximum number of [`Contract`]s billed concurrently.
    #[default(4)]
    pub concurrency: usize,
}

/// [`Task`] for billing all the [`Contract`]s whose bills are due.
#[derive(Clone, Copy, Debug)]
pub struct BillDueContracts<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<S> BillDueContracts<S> {
    /// Creates a new [`BillDueContracts`] [`Task`] for a single pass.
    #[must_use]
    pub const fn new(config: Config, service: S) -> Self {
        Self { config, service }
    }
}

/// Result of a single [`BillDueContracts`] pass.
#[derive(Clone, Debug, Default)]
pub struct Report {
    /// Billed [`Contract`]s with their posted documents.
    pub billed: Vec<(contract::Reference, DocumentRef)>,

    /// [`Contract`]s whose rent-free period has been skipped.
    pub skipped: Vec<contract::Reference>,

    /// Due [`Contract`]s without any positive amount to bill.
    pub nothing_to_bill: Vec<contract::Reference>,

    /// [`Contract`]s failed to be billed, with the failure description.
    pub failed: Vec<(contract::Reference, String)>,
}

impl<Db, Acc> Task<Start<By<BillDueContracts<Self>, Config>>>
    for Service<Db, Acc>
where
    BillDueContracts<Self>: Task<Perform<Date>, Ok = Report, Err: Error>,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<BillDueContracts<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let task = BillDueContracts::new(by.into_inner(), self.clone());

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            _ = task.execute(Perform(Date::today())).await.map_err(|e| {
                log::error!("`task::BillDueContracts` failed: {e}");
            });
        }
    }
}

impl<Db, Acc> Task<Perform<Date>> for BillDueContracts<Service<Db, Acc>>
where
    Db: Database<
        Select<By<Vec<Due>, DueOn>>,
        Ok = Vec<Due>,
        Err = Traced<database::Error>,
    >,
    Service<Db, Acc>: Command<
        GenerateBill,
        Ok = generate_bill::Outcome,
        Err = Traced<generate_bill::ExecutionError>,
    >,
{
    type Ok = Report;
    type Err = ExecutionError;

    async fn execute(
        &self,
        Perform(today): Perform<Date>,
    ) -> Result<Self::Ok, Self::Err> {
        let due = self
            .service
            .database()
            .execute(Select(By::<Vec<Due>, _>::new(DueOn(today))))
            .await
            .map_err(tracerr::wrap!())?;
        log::debug!("{} contracts are due for billing on {today}", due.len());

        let results = stream::iter(due)
            .map(|Due { id, reference }| async move {
                let res = self
                    .service
                    .execute(GenerateBill {
                        contract_id: id,
                        today,
                    })
                    .await;
                (reference, res)
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        let mut report = Report::default();
        for (reference, res) in results {
            match res {
                Ok(generate_bill::Outcome::Billed { document, .. }) => {
                    report.billed.push((reference, document));
                }
                Ok(generate_bill::Outcome::Skipped { .. }) => {
                    report.skipped.push(reference);
                }
                Err(e) if matches!(
                    e.as_ref(),
                    generate_bill::ExecutionError::NothingToBill(_),
                ) =>
                {
                    log::info!("`Contract({reference})` has nothing to bill");
                    report.nothing_to_bill.push(reference);
                }
                Err(e) => {
                    log::error!("failed to bill `Contract({reference})`: {e}");
                    report.failed.push((reference, e.to_string()));
                }
            }
        }

        log::info!(
            "billing pass on {today}: {} billed, {} skipped, {} empty, \
             {} failed",
            report.billed.len(),
            report.skipped.len(),
            report.nothing_to_bill.len(),
            report.failed.len(),
        );
        Ok(report)
    }
}

/// Error of [`BillDueContracts`] execution.
pub type ExecutionError = Traced<database::Error>;

#[cfg(test)]
mod spec {
    use common::operations::Perform;

    use crate::{
        domain::contract::{
            spec::{active, cny, contract, date},
            Kind, Reference,
        },
        infra::{accounting, Memory},
        Config, Service,
    };

    use super::{BillDueContracts, Config as TaskConfig, Task as _};

    #[tokio::test]
    async fn bills_due_contracts_and_reports_failures() {
        let db = Memory::new();
        let early = active("2025-01-01", 1000);
        let mut late = active("2025-01-10", 2000);
        late.reference = Reference::generate(Kind::Tenant, 2);
        late.terms.deposit = Some(cny(500));
        let future = active("2025-03-01", 3000);
        let draft = contract("2025-01-01", 4000);
        for c in [&early, &late, &future, &draft] {
            db.insert(c.clone()).await;
        }
        let mut config = Config::default();
        config.billing.receivable_journal = Some("SALES".into());
        let acc = accounting::Memory::new();
        let svc = Service::new(config, db, acc.clone());
        let task = BillDueContracts::new(TaskConfig::default(), svc);

        let report = task.execute(Perform(date("2025-01-15"))).await.unwrap();

        let mut billed = report
            .billed
            .iter()
            .map(|(r, _)| r.clone())
            .collect::<Vec<_>>();
        billed.sort();
        let mut expected = vec![early.reference, late.reference];
        expected.sort();
        assert_eq!(billed, expected);
        assert!(report.failed.is_empty());
        assert_eq!(acc.documents().await.len(), 2);

        let again = task.execute(Perform(date("2025-01-15"))).await.unwrap();
        assert!(again.billed.is_empty());
        assert_eq!(acc.documents().await.len(), 2);
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_pass() {
        let db = Memory::new();
        let ok = active("2025-01-01", 1000);
        let mut broken = active("2025-01-01", 1000);
        broken.kind = Kind::Landlord;
        broken.reference = Reference::generate(Kind::Landlord, 1);
        db.insert(ok.clone()).await;
        db.insert(broken.clone()).await;
        let mut config = Config::default();
        config.billing.receivable_journal = Some("SALES".into());
        let svc = Service::new(config, db, accounting::Memory::new());
        let task = BillDueContracts::new(TaskConfig::default(), svc);

        let report = task.execute(Perform(date("2025-01-01"))).await.unwrap();

        assert_eq!(report.billed.len(), 1);
        assert_eq!(report.billed[0].0, ok.reference);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, broken.reference);
        assert!(report.failed[0].1.contains("payable journal"));
    }

    #[tokio::test]
    async fn reports_nothing_to_bill_apart_from_failures() {
        let db = Memory::new();
        let empty = active("2025-01-01", 0);
        db.insert(empty.clone()).await;
        let mut config = Config::default();
        config.billing.receivable_journal = Some("SALES".into());
        let svc = Service::new(config, db, accounting::Memory::new());
        let task = BillDueContracts::new(TaskConfig::default(), svc);

        let report = task.execute(Perform(date("2025-01-01"))).await.unwrap();

        assert!(report.billed.is_empty());
        assert!(report.failed.is_empty());
        assert_eq!(report.nothing_to_bill, [empty.reference]);
    }
}
