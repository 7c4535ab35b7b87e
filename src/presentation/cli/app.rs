use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// service-doctor: keeps systemd services alive
///
/// Periodically checks the configured services, restarts the ones that are
/// down, and alerts when restarts keep failing.
#[derive(Parser, Debug)]
#[command(name = "service-doctor")]
#[command(version, about, long_about)]
pub struct Cli {
    /// Subcommand to execute (defaults to `daemon`)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to custom config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Run the scan and cleanup schedule until interrupted
    #[command(alias = "d")]
    Daemon,

    /// Run a single scan cycle
    #[command(alias = "sc")]
    Scan {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete persisted events older than the retention period
    Cleanup {
        /// Retention in hours (default: config)
        #[arg(long)]
        hours: Option<f64>,
    },

    /// List recorded failures of one service
    #[command(alias = "f")]
    Failures {
        /// Service unit name
        service: String,

        /// Look-back window in hours (default: alert window)
        #[arg(long)]
        hours: Option<f64>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the default configuration file if it does not exist
    Init,
}
