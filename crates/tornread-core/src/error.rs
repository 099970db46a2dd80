//! Error types for the harness
//!
//! Four failure kinds flow through the loops up to the scenario runner:
//! - Store failures (connectivity, constraints, anything unexpected)
//! - Missing rows
//! - Transaction failures (unsupported isolation, aborts)
//! - Anomalies, the harness's own positive signal
//!
//! None of them is retried.

use crate::gateway::IsolationLevel;
use serde::{Deserialize, Serialize};

/// Failure kind, used for classification in reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Connectivity, constraint or unexpected store failure
    Store,
    /// Expected row missing
    NotFound,
    /// Isolation unsupported or transaction aborted
    Transaction,
    /// Head and segment diverged
    Anomaly,
    /// Loop task panicked or was cancelled
    Task,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Store => "store",
            Self::NotFound => "not-found",
            Self::Transaction => "transaction",
            Self::Anomaly => "anomaly",
            Self::Task => "task",
        };
        f.write_str(name)
    }
}

/// Store-level failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Store unreachable
    #[error("connectivity failure: {0}")]
    Connectivity(String),

    /// Constraint rejected the statement
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Anything else the driver reported
    #[error("unexpected store failure: {0}")]
    Unexpected(String),
}

/// Transaction failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    /// Store cannot open a transaction at this level
    #[error("isolation level {0} is not supported")]
    UnsupportedIsolation(IsolationLevel),

    /// Store aborted the transaction (serialization conflict, deadlock, ...)
    #[error("transaction aborted: {0}")]
    Aborted(String),

    /// Transaction used after commit or rollback
    #[error("transaction is no longer active")]
    Inactive,
}

/// Errors surfaced by a storage gateway
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Expected row missing
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Entity kind ("head", "segment", "joined row")
        entity: &'static str,
        /// Lookup key
        key: String,
    },

    /// Transaction failure
    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),
}

impl GatewayError {
    /// Build a not-found error
    #[inline]
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Classification
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Store(_) => ErrorKind::Store,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Transaction(_) => ErrorKind::Transaction,
        }
    }
}

/// A torn read: the reader saw head and segment at different values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error(
    "head value {expected_head_value} but segment value {} at iteration {iteration}",
    display_segment(.observed_segment_value)
)]
pub struct AnomalyError {
    /// Value the head carried
    pub expected_head_value: i64,
    /// Value the segment carried, `None` when the segment was absent
    pub observed_segment_value: Option<i64>,
    /// Reader iteration that observed it
    pub iteration: u64,
}

fn display_segment(value: &Option<i64>) -> String {
    value.map_or_else(|| "<absent>".to_string(), |v| v.to_string())
}

/// Errors that end a write or read loop
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HarnessError {
    /// Gateway call failed
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Consistency check failed
    #[error("anomaly detected: {0}")]
    Anomaly(#[from] AnomalyError),

    /// Loop task panicked or was cancelled
    #[error("{task} task aborted: {reason}")]
    TaskAborted {
        /// Which loop
        task: &'static str,
        /// Join failure description
        reason: String,
    },
}

impl HarnessError {
    /// Classification
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Gateway(e) => e.kind(),
            Self::Anomaly(_) => ErrorKind::Anomaly,
            Self::TaskAborted { .. } => ErrorKind::Task,
        }
    }

    /// The anomaly, if this is one
    #[inline]
    #[must_use]
    pub fn anomaly(&self) -> Option<&AnomalyError> {
        match self {
            Self::Anomaly(a) => Some(a),
            _ => None,
        }
    }
}
