//! [`Config`]-related definitions.

use std::time;

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use serde::Deserialize;
use service::domain::billing::{self, CleanupFeePolicy};
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service configuration.
    pub service: Service,

    /// Postgres configuration.
    pub postgres: Postgres,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Service configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Service {
    /// Billing configuration.
    pub billing: Billing,

    /// Service tasks configuration.
    pub tasks: Tasks,
}

impl From<Service> for service::Config {
    fn from(value: Service) -> Self {
        let Service {
            billing:
                Billing {
                    receivable_journal,
                    payable_journal,
                    cleanup_fee,
                },
            tasks:
                Tasks {
                    bill_due_contracts,
                    remind_expiring_contracts,
                },
        } = value;
        Self {
            billing: billing::Config {
                receivable_journal: receivable_journal.map(Into::into),
                payable_journal: payable_journal.map(Into::into),
                cleanup_fee,
            },
            bill_due_contracts: service::task::bill_due_contracts::Config {
                interval: bill_due_contracts.interval,
                concurrency: bill_due_contracts.concurrency,
            },
            remind_expiring_contracts:
                service::task::remind_expiring_contracts::Config {
                    interval: remind_expiring_contracts.interval,
                    days: remind_expiring_contracts.days,
                },
        }
    }
}

/// Billing configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Billing {
    /// Accounting journal code receivable bills are posted to.
    pub receivable_journal: Option<String>,

    /// Accounting journal code payable bills are posted to.
    pub payable_journal: Option<String>,

    /// Policy of billing cleanup fees.
    pub cleanup_fee: CleanupFeePolicy,
}

/// Service tasks configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Tasks {
    /// `BillDueContracts` task configuration.
    pub bill_due_contracts: BillDueContracts,

    /// `RemindExpiringContracts` task configuration.
    pub remind_expiring_contracts: RemindExpiringContracts,
}

/// `BillDueContracts` task configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct BillDueContracts {
    /// Task execution interval.
    #[default(time::Duration::from_secs(60 * 60))]
    #[serde(with = "humantime_serde")]
    pub interval: time::Duration,

    /// Maximum number of contracts billed concurrently.
    #[default(4)]
    pub concurrency: usize,
}

/// `RemindExpiringContracts` task configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct RemindExpiringContracts {
    /// Task execution interval.
    #[default(time::Duration::from_secs(60 * 60 * 24))]
    #[serde(with = "humantime_serde")]
    pub interval: time::Duration,

    /// Numbers of days before a lease end to remind about it on.
    #[default(vec![30, 15, 7])]
    pub days: Vec<u16>,
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("postgres".to_owned())]
    pub dbname: String,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}
