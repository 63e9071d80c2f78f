//! CLI command definitions
//!
//! Defines the clap commands for the test bench CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run test cases against a data master
    Run {
        /// YAML test case files, run in the given order
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Data master address (overrides [data_master] address)
        #[arg(long, short = 'd')]
        data_master: Option<String>,

        /// Per-command timeout in seconds (overrides [timeouts] command_secs)
        #[arg(long)]
        timeout: Option<u64>,

        /// Configuration file to use instead of the default location
        #[arg(long)]
        config: Option<PathBuf>,

        /// Echo command lines and raw responses
        #[arg(long, short)]
        verbose: bool,
    },

    /// Load and validate test case files without contacting the DUT
    Check {
        /// YAML test case files
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// List the commands the harness knows how to send
    Verbs,
}

impl Commands {
    pub fn verbose(&self) -> bool {
        matches!(self, Commands::Run { verbose: true, .. })
    }
}
