//! `tornread` command line
//!
//! Runs every selected read strategy against a latency-modelled memory store
//! and reports which ones observed a torn read.

mod cli;

use anyhow::Context;
use cli::Options;
use std::sync::Arc;
use tornread_core::{RunReport, ScenarioRunner, StorageGateway};
use tornread_memstore::MemoryStore;
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli::command().get_matches();
    let options = Options::from_matches(&matches);
    init_tracing(options.log_json);

    let store = MemoryStore::with_latency(options.latency);
    tracing::debug!(latency = ?store.latency(), "memory store ready");
    let gateway: Arc<dyn StorageGateway> = Arc::new(store);
    let runner = ScenarioRunner::new(gateway, options.config.clone());

    // JSON mode keeps stdout machine readable.
    if options.json {
        let report = runner.run_all().await;
        println!("{}", report.to_json().context("serializing run report")?);
        return finish(&report, options.allow_failures);
    }

    println!("Running for {}", options.config.run_for);
    let report = runner.run_all().await;
    for scenario in &report.scenarios {
        println!("{}", scenario.line());
    }
    println!("Done");
    finish(&report, options.allow_failures)
}

fn finish(report: &RunReport, allow_failures: bool) -> anyhow::Result<()> {
    tracing::info!(
        passed = report.passed(),
        failures = report.failures().len(),
        elapsed_ms = report.elapsed_ms,
        "run complete"
    );

    if !report.passed() && !allow_failures {
        std::process::exit(1);
    }
    Ok(())
}
