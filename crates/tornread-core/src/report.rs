//! Scenario and run reports

use crate::error::{AnomalyError, ErrorKind};
use crate::gateway::IsolationLevel;
use crate::loops::{LoopFailure, LoopSide};
use crate::strategy::ReadStrategy;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Scenario verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// Both loops completed without error
    Success,
    /// Reset, writer or reader failed
    Failure,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
        })
    }
}

/// What one loop did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopSummary {
    pub side: LoopSide,
    /// Iterations started, including a failed one
    pub attempted: u64,
    /// Iterations finished cleanly
    pub completed: u64,
    pub error_kind: Option<ErrorKind>,
    pub error: Option<String>,
}

impl LoopSummary {
    /// A loop that never ran
    #[must_use]
    pub fn skipped(side: LoopSide) -> Self {
        Self {
            side,
            attempted: 0,
            completed: 0,
            error_kind: None,
            error: None,
        }
    }

    /// Summarize a finished loop
    #[must_use]
    pub fn from_result(side: LoopSide, result: &Result<u64, LoopFailure>) -> Self {
        match result {
            Ok(completed) => Self {
                side,
                attempted: *completed,
                completed: *completed,
                error_kind: None,
                error: None,
            },
            Err(failure) => Self {
                side,
                attempted: failure.attempted(),
                completed: failure.iteration,
                error_kind: Some(failure.error.kind()),
                error: Some(failure.error.to_string()),
            },
        }
    }

    /// True when the loop finished every iteration
    #[inline]
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.error_kind.is_none()
    }
}

/// Result of one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub strategy: ReadStrategy,
    pub isolation: IsolationLevel,
    pub run_for: u64,
    pub outcome: Outcome,
    pub writer: LoopSummary,
    pub reader: LoopSummary,
    /// Failure reason, reset failures included
    pub reason: Option<String>,
    pub reason_kind: Option<ErrorKind>,
    /// Anomaly observed by the reader
    pub anomaly: Option<AnomalyError>,
    pub elapsed_ms: u64,
}

impl ScenarioReport {
    /// True for `SUCCESS`
    #[inline]
    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Success
    }

    /// True when the scenario failed on an anomaly rather than an error
    #[inline]
    #[must_use]
    pub fn is_anomaly(&self) -> bool {
        self.reason_kind == Some(ErrorKind::Anomaly)
    }

    /// One console line
    #[must_use]
    pub fn line(&self) -> String {
        match (self.outcome, &self.anomaly, &self.reason) {
            (Outcome::Success, _, _) => format!(
                "SUCCESS -> Finished without mismatches for mode '{}'",
                self.strategy
            ),
            (Outcome::Failure, Some(anomaly), _) => format!(
                "FAILURE -> Detected mismatch for mode '{}': {anomaly}",
                self.strategy
            ),
            (Outcome::Failure, None, reason) => format!(
                "FAILURE -> {} for mode '{}': {}",
                self.reason_kind.map_or("error".to_string(), |k| k.to_string()),
                self.strategy,
                reason.as_deref().unwrap_or("unknown")
            ),
        }
    }
}

/// Result of a full run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_for: u64,
    pub isolation: IsolationLevel,
    pub scenarios: Vec<ScenarioReport>,
    pub elapsed_ms: u64,
}

impl RunReport {
    /// True when every scenario succeeded
    #[must_use]
    pub fn passed(&self) -> bool {
        self.scenarios.iter().all(ScenarioReport::passed)
    }

    /// Scenario for `strategy`, if it ran
    #[must_use]
    pub fn scenario(&self, strategy: ReadStrategy) -> Option<&ScenarioReport> {
        self.scenarios.iter().find(|s| s.strategy == strategy)
    }

    /// Strategies that failed
    #[must_use]
    pub fn failures(&self) -> Vec<ReadStrategy> {
        self.scenarios
            .iter()
            .filter(|s| !s.passed())
            .map(|s| s.strategy)
            .collect()
    }

    /// Generate text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        let _ = writeln!(report, "=== Torn Read Report ===");
        let _ = writeln!(report, "Iterations: {}", self.run_for);
        let _ = writeln!(report, "Isolation: {}", self.isolation);
        let _ = writeln!(report);

        for scenario in &self.scenarios {
            let _ = writeln!(report, "{}", scenario.line());
            let _ = writeln!(
                report,
                "  writer {}/{}  reader {}/{}  ({} ms)",
                scenario.writer.completed,
                scenario.run_for,
                scenario.reader.completed,
                scenario.run_for,
                scenario.elapsed_ms
            );
        }

        let _ = writeln!(
            report,
            "\n=== Result: {} ({}/{} clean) ===",
            if self.passed() { "PASS" } else { "FAIL" },
            self.scenarios.iter().filter(|s| s.passed()).count(),
            self.scenarios.len()
        );

        report
    }

    /// JSON rendering
    ///
    /// # Errors
    /// Serialization failure.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
