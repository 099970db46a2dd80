//! Harness configuration

use crate::gateway::IsolationLevel;
use crate::strategy::ReadStrategy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Logical key of the pair under test
pub const DEFAULT_PAIR_NAME: &str = "Python";

/// Baseline value written by every reset
pub const DEFAULT_INITIAL_VALUE: i64 = 999;

/// Iterations per loop
pub const DEFAULT_RUN_FOR: u64 = 100;

/// Pause between scenarios
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Scenario configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Unique name of the head under test
    pub pair_name: String,
    /// Value both records get on reset
    pub initial_value: i64,
    /// Writer and reader iterations
    pub run_for: u64,
    /// Isolation level for transactional strategies
    pub isolation: IsolationLevel,
    /// Strategies to run, in order
    pub strategies: Vec<ReadStrategy>,
    /// Pause between consecutive scenarios
    pub settle_delay: Duration,
}

impl HarnessConfig {
    /// Configuration with defaults
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set iteration count
    #[inline]
    #[must_use]
    pub fn with_run_for(mut self, run_for: u64) -> Self {
        self.run_for = run_for;
        self
    }

    /// Set isolation level
    #[inline]
    #[must_use]
    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    /// Restrict and order the strategies
    #[inline]
    #[must_use]
    pub fn with_strategies(mut self, strategies: impl IntoIterator<Item = ReadStrategy>) -> Self {
        self.strategies = strategies.into_iter().collect();
        self
    }

    /// Set settle delay
    #[inline]
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Set pair name
    #[inline]
    #[must_use]
    pub fn with_pair_name(mut self, name: impl Into<String>) -> Self {
        self.pair_name = name.into();
        self
    }

    /// Set reset value
    #[inline]
    #[must_use]
    pub fn with_initial_value(mut self, value: i64) -> Self {
        self.initial_value = value;
        self
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            pair_name: DEFAULT_PAIR_NAME.to_string(),
            initial_value: DEFAULT_INITIAL_VALUE,
            run_for: DEFAULT_RUN_FOR,
            isolation: IsolationLevel::RepeatableRead,
            strategies: ReadStrategy::ALL.to_vec(),
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}
