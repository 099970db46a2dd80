//! Read strategies
//!
//! Each strategy builds a [`PairView`] with a different atomicity contract:
//!
//! | strategy | statements | snapshot boundary |
//! |---|---|---|
//! | `raw` | 1 joined | the statement itself |
//! | `nested` | store-defined | none declared by the caller |
//! | `nested-with-transaction` | nested, 1 declared tx | transaction start |
//! | `nested-with-interactive-transaction` | nested, scoped tx | transaction start |
//! | `independent` | 2 separate, 1 tx | transaction start |
//!
//! Whether a snapshot boundary actually holds depends on the isolation level
//! the store grants.

use crate::error::GatewayError;
use crate::gateway::{IsolationLevel, StorageGateway};
use crate::model::PairView;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Closed set of read strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadStrategy {
    /// One raw joined query; view rebuilt from the flattened row
    Raw,
    /// Store-level nested fetch without a caller transaction
    Nested,
    /// Nested fetch wrapped in a declared transaction
    NestedWithTransaction,
    /// Nested fetch inside a scoped unit of work
    NestedWithInteractiveTransaction,
    /// Head and segment fetched by two statements in one transaction
    Independent,
}

impl ReadStrategy {
    /// Every strategy, in scenario order
    pub const ALL: [Self; 5] = [
        Self::Raw,
        Self::Nested,
        Self::NestedWithTransaction,
        Self::NestedWithInteractiveTransaction,
        Self::Independent,
    ];

    /// Scenario name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Nested => "nested",
            Self::NestedWithTransaction => "nested-with-transaction",
            Self::NestedWithInteractiveTransaction => "nested-with-interactive-transaction",
            Self::Independent => "independent",
        }
    }

    /// Whether the caller opens a transaction around the reads
    #[must_use]
    pub const fn is_transactional(self) -> bool {
        matches!(
            self,
            Self::NestedWithTransaction
                | Self::NestedWithInteractiveTransaction
                | Self::Independent
        )
    }

    /// Produce one view of the pair named `name`
    ///
    /// `isolation` only applies to transactional strategies.
    ///
    /// # Errors
    /// Gateway errors propagate unchanged; an empty raw result is
    /// `GatewayError::NotFound`.
    pub async fn read<G>(
        self,
        gateway: &G,
        name: &str,
        isolation: IsolationLevel,
    ) -> Result<PairView, GatewayError>
    where
        G: StorageGateway + ?Sized,
    {
        match self {
            Self::Raw => {
                let row = gateway
                    .raw_joined_fetch(name)
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| GatewayError::not_found("joined row", name))?;
                Ok(PairView::from(row))
            }
            Self::Nested => gateway.nested_fetch(name).await,
            Self::NestedWithTransaction => {
                gateway
                    .nested_fetch_in_declared_transaction(name, isolation)
                    .await
            }
            Self::NestedWithInteractiveTransaction => {
                gateway
                    .nested_fetch_in_interactive_transaction(name, isolation)
                    .await
            }
            Self::Independent => {
                let (head, segment) = gateway.independent_fetch(name, isolation).await?;
                Ok(PairView::new(head, segment))
            }
        }
    }
}

impl std::fmt::Display for ReadStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReadStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == trimmed)
            .ok_or_else(|| format!("unknown read strategy: {s}"))
    }
}
