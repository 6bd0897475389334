//! `milestone-rollover` entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration** — read options from the command line or the
//!    GitHub Actions environment and validate them before any remote call.
//! 2. **Wire observability** — configure `tracing-subscriber` (text or JSON on
//!    stderr) and, when an OTLP endpoint is configured, an OpenTelemetry span
//!    exporter.
//! 3. **Construct infrastructure** — build the [`github::GithubClient`] and
//!    inject it, with the resolved repository, into the [`rollover::Reconciler`].
//! 4. **Report the outcome** — exit `0` silently on success; on failure print
//!    the error (as a workflow annotation under Actions) and exit `1`.

mod config;
mod report;
mod telemetry;

use std::process::ExitCode;

use clap::Parser;
use github::GithubClient;
use rollover::{ReconcileReport, Reconciler, RolloverError, RunId};
use tracing::{error, info_span, Instrument};

use crate::config::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let telemetry = match telemetry::init(cli.log_format) {
        Ok(telemetry) => telemetry,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let run_id = RunId::new_random();
    let outcome = run(&cli)
        .instrument(info_span!("rollover_run", run_id = %run_id))
        .await;

    let code = match outcome {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(run_id = %run_id, error = %e, "Milestone rollover failed");
            report::report_failure(&e);
            ExitCode::FAILURE
        }
    };

    telemetry.shutdown();
    code
}

async fn run(cli: &Cli) -> Result<ReconcileReport, RolloverError> {
    let config = cli.run_config()?;

    let client = GithubClient::new(config.github).map_err(|e| RolloverError::Configuration {
        message: e.to_string(),
    })?;

    Reconciler::new(client)
        .reconcile(&config.repository, config.milestone, config.limit)
        .await
}
