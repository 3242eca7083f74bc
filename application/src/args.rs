//! [`Args`] definitions.

use clap::{Parser, Subcommand};
use common::Date;

/// Leasing contracts lifecycle and billing engine of mall facades.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,

    /// [`Command`] to execute.
    ///
    /// [`Command::Run`] is executed if omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Args {
    /// Parses command line arguments.
    ///
    /// # Errors
    ///
    /// Errors if failed to parse command line arguments.
    pub fn parse() -> Result<Self, clap::Error> {
        <Self as Parser>::try_parse()
    }
}

/// Command to execute.
#[derive(Clone, Copy, Debug, Default, Subcommand)]
pub enum Command {
    /// Runs the background tasks until any of them fails.
    #[default]
    Run,

    /// Performs a single billing pass over the due contracts.
    Bill {
        /// Date to bill on (`YYYY-MM-DD`), today if omitted.
        #[arg(long)]
        date: Option<Date>,
    },

    /// Performs a single reminding pass over the expiring contracts.
    Remind {
        /// Date to remind on (`YYYY-MM-DD`), today if omitted.
        #[arg(long)]
        date: Option<Date>,
    },
}

#[cfg(test)]
mod spec {
    use clap::Parser as _;

    use super::{Args, Command};

    #[test]
    fn runs_by_default() {
        let args = Args::try_parse_from(["app"]).unwrap();
        assert_eq!(args.config, "config.toml");
        assert!(args.command.is_none());
    }

    #[test]
    fn parses_billing_date() {
        let args = Args::try_parse_from([
            "app",
            "-c",
            "x.toml",
            "bill",
            "--date",
            "2025-02-01",
        ])
        .unwrap();
        assert_eq!(args.config, "x.toml");
        let Some(Command::Bill { date: Some(date) }) = args.command else {
            panic!("expected `bill` command with date");
        };
        assert_eq!(date.to_string(), "2025-02-01");

        assert!(
            Args::try_parse_from(["app", "remind", "--date", "02/01/2025"])
                .is_err()
        );
    }
}
