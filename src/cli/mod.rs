//! CLI command handling
//!
//! Loads test cases, builds the data master handle and prints results.

use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::dut::{Arity, CommandRegistry, DataMaster};
use crate::testing::{CaseReport, Engine, SuiteReport, TestCase};

/// Dispatch a CLI command, returning the process exit code
pub async fn dispatch(command: Commands) -> Result<i32> {
    let registry = CommandRegistry::data_master();

    match command {
        Commands::Run {
            paths,
            data_master,
            timeout,
            config,
            verbose,
        } => {
            let config = match config {
                Some(path) => Config::load_from(&path)?,
                None => Config::load()?,
            };
            let mut dut = DataMaster::from_config(&config, data_master, timeout)?;
            let engine = Engine::new(&registry).verbose(verbose);

            // A file that fails to load is a failed case; the rest still run
            let mut suite = SuiteReport::default();
            for path in &paths {
                match TestCase::load(path, &registry) {
                    Ok(case) => suite.cases.push(engine.run_case(&case, &mut dut).await),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Skipping invalid test case");
                        let report = CaseReport::invalid(path.display().to_string(), &e);
                        if let Some(failure) = &report.failure {
                            println!("\n{} {}", "✗".red(), failure);
                        }
                        suite.cases.push(report);
                    }
                }
            }
            print_summary(&suite);

            Ok(suite.exit_code())
        }

        Commands::Check { paths } => {
            let cases = load_cases(&paths, &registry)?;
            for (path, case) in paths.iter().zip(&cases) {
                print_plan(path, case);
            }
            println!(
                "\n{} {} test case(s) valid",
                "✓".green().bold(),
                cases.len()
            );
            Ok(0)
        }

        Commands::Verbs => {
            for (domain, verb, spec) in registry.iter() {
                println!(
                    "{:<6} {:<13} {:<10} {:<10} {}",
                    domain.as_str(),
                    verb,
                    format!("target:{}", arity_tag(spec.target)),
                    format!("input:{}", arity_tag(spec.input)),
                    spec.summary.dimmed()
                );
            }
            Ok(0)
        }
    }
}

/// Load every test case, failing on the first malformed one
fn load_cases(paths: &[PathBuf], registry: &CommandRegistry) -> Result<Vec<TestCase>> {
    paths
        .iter()
        .map(|path| TestCase::load(path, registry))
        .collect()
}

fn arity_tag(arity: Arity) -> &'static str {
    match arity {
        Arity::Required => "required",
        Arity::Optional => "optional",
        Arity::Forbidden => "-",
    }
}

fn print_plan(path: &Path, case: &TestCase) {
    println!(
        "\n{} {} ({:?})",
        case.name().white().bold(),
        path.display().to_string().dimmed(),
        case.mode()
    );
    for (i, op) in case.operations().iter().enumerate() {
        let check = if let Some(golden) = op.expected_artifact() {
            format!(" => {}", golden.display())
        } else if let Some(pattern) = op.expected_failure() {
            format!(" !! /{}/", pattern.as_str())
        } else {
            String::new()
        };
        println!(
            "  {:>3}. {:<20} {}{}",
            i + 1,
            op.label(),
            op.summary(),
            check.dimmed()
        );
    }
}

fn print_summary(suite: &SuiteReport) {
    println!("\n{}", "Summary:".cyan());
    for case in &suite.cases {
        if case.passed() {
            println!("  {} {}", "✓".green(), case.name);
        } else {
            println!(
                "  {} {} ({}/{} operations)",
                "✗".red(),
                case.name,
                case.operations_run,
                case.operations_total
            );
            if let Some(failure) = &case.failure {
                println!("      {}", failure);
            }
        }
    }

    let line = format!("{} passed, {} failed", suite.passed(), suite.failed());
    if suite.all_passed() {
        println!("\n{}\n", line.green().bold());
    } else {
        println!("\n{}\n", line.red().bold());
    }
}

/// Exit code for harness errors; malformed test cases only end `check` this way
pub fn error_exit_code(error: &Error) -> i32 {
    if error.is_construction_error() {
        3
    } else {
        2
    }
}
