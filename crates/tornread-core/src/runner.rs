//! Scenario runner
//!
//! One scenario = reset the pair, then a writer task and a reader task run
//! concurrently against the same store with no coordination beyond what the
//! store provides. Both tasks are always awaited to completion; a failure on
//! one side never cancels the other.

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::gateway::StorageGateway;
use crate::loops::{run_reads, run_writes, LoopFailure, LoopSide};
use crate::report::{LoopSummary, Outcome, RunReport, ScenarioReport};
use crate::strategy::ReadStrategy;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinError;
use tracing::Instrument;

/// Drives scenarios against one gateway
pub struct ScenarioRunner {
    gateway: Arc<dyn StorageGateway>,
    config: HarnessConfig,
}

impl std::fmt::Debug for ScenarioRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioRunner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ScenarioRunner {
    /// Create a runner
    #[inline]
    #[must_use]
    pub fn new(gateway: Arc<dyn StorageGateway>, config: HarnessConfig) -> Self {
        Self { gateway, config }
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run one scenario for `strategy`
    ///
    /// Never fails: every error ends up in the report. Everything the
    /// scenario logs, both loops included, is inside a `scenario` span
    /// carrying the strategy.
    pub async fn run_scenario(&self, strategy: ReadStrategy) -> ScenarioReport {
        let span = tracing::info_span!("scenario", %strategy);
        self.scenario(strategy).instrument(span).await
    }

    async fn scenario(&self, strategy: ReadStrategy) -> ScenarioReport {
        let config = &self.config;
        let start = Instant::now();
        tracing::info!(%strategy, run_for = config.run_for, isolation = %config.isolation, "scenario start");

        if let Err(e) = self
            .gateway
            .reset_pair(&config.pair_name, config.initial_value)
            .await
        {
            tracing::error!(%strategy, error = %e, "reset failed");
            let error = HarnessError::from(e);
            return ScenarioReport {
                strategy,
                isolation: config.isolation,
                run_for: config.run_for,
                outcome: Outcome::Failure,
                writer: LoopSummary::skipped(LoopSide::Writer),
                reader: LoopSummary::skipped(LoopSide::Reader),
                reason: Some(format!("reset failed: {error}")),
                reason_kind: Some(error.kind()),
                anomaly: None,
                elapsed_ms: elapsed_ms(start),
            };
        }
        tracing::info!(name = %config.pair_name, value = config.initial_value, "create");

        let writer = {
            let gateway = Arc::clone(&self.gateway);
            let name = config.pair_name.clone();
            let count = config.run_for;
            tokio::spawn(
                async move { run_writes(gateway.as_ref(), &name, count).await }
                    .in_current_span(),
            )
        };
        let reader = {
            let gateway = Arc::clone(&self.gateway);
            let name = config.pair_name.clone();
            let count = config.run_for;
            let isolation = config.isolation;
            tokio::spawn(
                async move {
                    run_reads(gateway.as_ref(), &name, count, strategy, isolation).await
                }
                .in_current_span(),
            )
        };

        let (writer, reader) = tokio::join!(writer, reader);
        let writer = settle(LoopSide::Writer, writer);
        let reader = settle(LoopSide::Reader, reader);

        let report = classify(strategy, config, &writer, &reader, elapsed_ms(start));
        if report.passed() {
            tracing::info!(%strategy, elapsed_ms = report.elapsed_ms, "scenario passed");
        } else {
            tracing::warn!(
                %strategy,
                reason = report.reason.as_deref().unwrap_or_default(),
                "scenario failed"
            );
        }
        report
    }

    /// Run every configured strategy in order, pausing between scenarios
    pub async fn run_all(&self) -> RunReport {
        let start = Instant::now();
        let mut scenarios = Vec::with_capacity(self.config.strategies.len());

        for (i, strategy) in self.config.strategies.iter().copied().enumerate() {
            if i > 0 && !self.config.settle_delay.is_zero() {
                tokio::time::sleep(self.config.settle_delay).await;
            }
            scenarios.push(self.run_scenario(strategy).await);
        }

        RunReport {
            run_for: self.config.run_for,
            isolation: self.config.isolation,
            scenarios,
            elapsed_ms: elapsed_ms(start),
        }
    }
}

/// Fold a join failure into the loop result
fn settle(
    side: LoopSide,
    joined: Result<Result<u64, LoopFailure>, JoinError>,
) -> Result<u64, LoopFailure> {
    joined.unwrap_or_else(|e| {
        Err(LoopFailure {
            side,
            iteration: 0,
            error: HarnessError::TaskAborted {
                task: side.as_str(),
                reason: e.to_string(),
            },
        })
    })
}

fn classify(
    strategy: ReadStrategy,
    config: &HarnessConfig,
    writer: &Result<u64, LoopFailure>,
    reader: &Result<u64, LoopFailure>,
    elapsed_ms: u64,
) -> ScenarioReport {
    // Reader failures first: an anomaly is the signal the scenario exists for.
    let failure = reader.as_ref().err().or(writer.as_ref().err());
    let anomaly = reader
        .as_ref()
        .err()
        .and_then(|f| f.error.anomaly())
        .cloned();

    ScenarioReport {
        strategy,
        isolation: config.isolation,
        run_for: config.run_for,
        outcome: if failure.is_some() {
            Outcome::Failure
        } else {
            Outcome::Success
        },
        writer: LoopSummary::from_result(LoopSide::Writer, writer),
        reader: LoopSummary::from_result(LoopSide::Reader, reader),
        reason: failure.map(ToString::to_string),
        reason_kind: failure.map(|f| f.error.kind()),
        anomaly,
        elapsed_ms,
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
