//! Data Master test bench
//!
//! Replays declarative test cases against a data master through its
//! command-line tools and reports a pass/fail outcome per test case.

use clap::Parser;
use dm_testbench::cli;
use dm_testbench::commands::Commands;
use dm_testbench::common::logging;

#[derive(Parser)]
#[command(name = "dm-testbench", about = "Declarative test harness for the data master")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init_cli(cli.command.verbose());

    match cli::dispatch(cli.command).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(cli::error_exit_code(&e));
        }
    }
}
