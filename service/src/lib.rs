//! Service contains the business logic of the application.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod read;
pub mod task;

use std::error::Error;

use common::operations::{By, Start};

#[cfg(doc)]
use infra::{Accounting, Database};

pub use self::{command::Command, query::Query, task::Task};

/// [`Service`] configuration.
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Billing configuration.
    pub billing: domain::billing::Config,

    /// [`task::BillDueContracts`] configuration.
    pub bill_due_contracts: task::bill_due_contracts::Config,

    /// [`task::RemindExpiringContracts`] configuration.
    pub remind_expiring_contracts: task::remind_expiring_contracts::Config,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db, Acc> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,

    /// [`Accounting`] system of this [`Service`].
    accounting: Acc,
}

impl<Db, Acc> Service<Db, Acc> {
    /// Creates a new [`Service`] with the provided parameters.
    #[must_use]
    pub fn new(config: Config, database: Db, accounting: Acc) -> Self {
        Self {
            config,
            database,
            accounting,
        }
    }

    /// Spawns the periodic [`Task`]s of this [`Service`] into a new
    /// [`task::Background`] environment.
    #[must_use]
    pub fn spawn_tasks(&self) -> task::Background
    where
        Self: Task<
                Start<
                    By<
                        task::BillDueContracts<Self>,
                        task::bill_due_contracts::Config,
                    >,
                >,
                Ok = (),
                Err: Error,
            > + Task<
                Start<
                    By<
                        task::RemindExpiringContracts<Self>,
                        task::remind_expiring_contracts::Config,
                    >,
                >,
                Ok = (),
                Err: Error,
            > + Clone
            + 'static,
    {
        let mut bg = task::Background::default();

        let svc = self.clone();
        bg.spawn("BillDueContracts", async move {
            svc.execute(Start(By::<task::BillDueContracts<Self>, _>::new(
                svc.config().bill_due_contracts,
            )))
            .await
        });

        let svc = self.clone();
        bg.spawn("RemindExpiringContracts", async move {
            svc.execute(Start(
                By::<task::RemindExpiringContracts<Self>, _>::new(
                    svc.config().remind_expiring_contracts.clone(),
                ),
            ))
            .await
        });

        bg
    }

    /// Returns [`Config`] of this [`Service`].
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Returns [`Accounting`] system of this [`Service`].
    #[must_use]
    pub fn accounting(&self) -> &Acc {
        &self.accounting
    }
}
