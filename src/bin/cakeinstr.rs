//! Cakeinstr CLI Binary
//!
//! Thin command-line wrapper over the instrumentation orchestrator.

use cakeinstr::logging::{init_logging, LoggingConfig};
use cakeinstr::orchestrator::{InstrumentationReport, Instrumentator, StatusReport};
use cakeinstr::set::GroupKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing::error;

#[derive(Parser)]
#[command(name = "cakeinstr", version, about = "Reversible CakePHP tree instrumentation")]
struct Cli {
    /// Webroot directory of the target application
    #[arg(long)]
    webroot: PathBuf,

    /// Instrumentation settings file (TOML)
    #[arg(long, default_value = "instrumentation.toml")]
    settings: PathBuf,

    /// Emit the report as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply all missing instrumentations
    Apply,
    /// Revert all applied instrumentations
    Revert,
    /// Report applied/unapplied counts per group
    Status,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::default();
    if !cli.verbose {
        logging.level = "warn".to_string();
    }
    if let Err(e) = init_logging(Some(&logging)) {
        eprintln!("Failed to initialize logging: {e}");
        process::exit(1);
    }

    let instrumentator = match Instrumentator::from_webroot(&cli.webroot, &cli.settings) {
        Ok(i) => i,
        Err(e) => {
            error!("Initialization failed: {e}");
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Apply => instrumentator
            .apply()
            .await
            .map(|r| render_run(&r, "applied", cli.json)),
        Command::Revert => instrumentator
            .revert()
            .await
            .map(|r| render_run(&r, "reverted", cli.json)),
        Command::Status => instrumentator
            .status()
            .await
            .map(|r| render_status(&r, cli.json)),
    };

    match result {
        Ok((output, clean)) => {
            println!("{output}");
            if !clean {
                process::exit(2);
            }
        }
        Err(e) => {
            error!("Command failed: {e}");
            eprintln!("{e}");
            process::exit(1);
        }
    }
}

/// Render an apply/revert report. Returns the text and whether the run was
/// free of failures.
fn render_run(report: &InstrumentationReport, verb: &str, json: bool) -> (String, bool) {
    if json {
        return (
            serde_json::to_string_pretty(report).unwrap_or_default(),
            report.is_clean(),
        );
    }

    let mut out = String::new();
    for group in &report.groups {
        out.push_str(&format!("{}: {} {}\n", group.group, group.changed, verb));
    }
    if !report.rejected_resources.is_empty() {
        out.push_str(&format!(
            "rejected resources: {}\n",
            report.rejected_resources.len()
        ));
    }
    for failure in &report.failures {
        out.push_str(&format!(
            "FAILED [{}] {}: {}\n",
            failure.group, failure.operation, failure.error
        ));
    }
    (out.trim_end().to_string(), report.is_clean())
}

fn render_status(report: &StatusReport, json: bool) -> (String, bool) {
    if json {
        return (
            serde_json::to_string_pretty(report).unwrap_or_default(),
            report.failures.is_empty(),
        );
    }

    let mut out = String::from("Applied / Unapplied\n");
    for kind in GroupKind::ALL {
        let (applied, unapplied) = report.status(kind);
        out.push_str(&format!("{kind}: {applied}/{unapplied}\n"));
    }
    for failure in &report.failures {
        out.push_str(&format!(
            "CHECK FAILED [{}] {}: {}\n",
            failure.group, failure.operation, failure.error
        ));
    }
    (out.trim_end().to_string(), report.failures.is_empty())
}
