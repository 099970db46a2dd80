//! Storage gateway contract
//!
//! The store of record is external. Drivers implement [`StorageGateway`] and
//! [`Transaction`]; the harness only ever reaches the shared pair through
//! these traits, by logical name.
//!
//! The three transactional fetches are provided methods built on
//! [`StorageGateway::begin`]. A driver whose client exposes them natively
//! (batch transactions, callback transactions) can override them.

use crate::error::{GatewayError, TransactionError};
use crate::model::{Head, HeadId, JoinedRow, PairView, Segment};
use crate::transaction::interactive;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Transaction isolation level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IsolationLevel {
    /// May observe uncommitted writes
    ReadUncommitted,
    /// Every statement sees the latest committed state
    ReadCommitted,
    /// Every statement sees the state as of transaction start
    #[default]
    RepeatableRead,
    /// Row-versioned snapshot (SQL Server flavour)
    Snapshot,
    /// Equivalent to some serial order
    Serializable,
}

impl IsolationLevel {
    /// All levels, weakest first
    pub const ALL: [Self; 5] = [
        Self::ReadUncommitted,
        Self::ReadCommitted,
        Self::RepeatableRead,
        Self::Snapshot,
        Self::Serializable,
    ];

    /// Kebab-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReadUncommitted => "read-uncommitted",
            Self::ReadCommitted => "read-committed",
            Self::RepeatableRead => "repeatable-read",
            Self::Snapshot => "snapshot",
            Self::Serializable => "serializable",
        }
    }
}

impl std::fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IsolationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == normalized)
            .ok_or_else(|| format!("unknown isolation level: {s}"))
    }
}

/// An open store transaction
///
/// Dropping a transaction without committing must release it as a rollback
/// would.
#[async_trait]
pub trait Transaction: Send {
    /// Isolation level the transaction was opened with
    fn isolation(&self) -> IsolationLevel;

    /// Fetch a head by unique name
    ///
    /// # Errors
    /// `GatewayError::NotFound` when no such head is visible.
    async fn find_head(&mut self, name: &str) -> Result<Head, GatewayError>;

    /// Fetch the segment owned by `head_id`
    async fn find_segment_for(&mut self, head_id: HeadId) -> Result<Option<Segment>, GatewayError>;

    /// Fetch a head together with its segment
    async fn find_nested(&mut self, name: &str) -> Result<PairView, GatewayError> {
        let head = self.find_head(name).await?;
        let segment = self.find_segment_for(head.id).await?;
        Ok(PairView::new(head, segment))
    }

    /// Commit
    async fn commit(self: Box<Self>) -> Result<(), GatewayError>;

    /// Roll back
    async fn rollback(self: Box<Self>) -> Result<(), GatewayError>;
}

/// Access to the store of record
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Delete every head and segment, then create one head named `name`
    /// with one segment, both at `initial`
    ///
    /// # Errors
    /// `GatewayError::Store` on connectivity or constraint failure.
    async fn reset_pair(&self, name: &str, initial: i64) -> Result<PairView, GatewayError>;

    /// Set head and segment values to `value` in one commit
    ///
    /// # Errors
    /// `GatewayError::NotFound` when no head (or its segment) exists.
    async fn update_pair(&self, name: &str, value: i64) -> Result<(), GatewayError>;

    /// Single raw statement joining head and segment
    ///
    /// # Errors
    /// `GatewayError::NotFound` when no row matches. `ReadStrategy::Raw`
    /// also maps an empty result to `NotFound`.
    async fn raw_joined_fetch(&self, name: &str) -> Result<Vec<JoinedRow>, GatewayError>;

    /// Head with its segment as one nested read, outside any caller transaction
    async fn nested_fetch(&self, name: &str) -> Result<PairView, GatewayError>;

    /// Open a transaction
    ///
    /// # Errors
    /// `TransactionError::UnsupportedIsolation` when the store cannot honour
    /// `isolation`.
    async fn begin(&self, isolation: IsolationLevel) -> Result<Box<dyn Transaction>, GatewayError>;

    /// Nested fetch as the only operation of a declared transaction
    async fn nested_fetch_in_declared_transaction(
        &self,
        name: &str,
        isolation: IsolationLevel,
    ) -> Result<PairView, GatewayError> {
        let mut tx = self.begin(isolation).await?;
        match tx.find_nested(name).await {
            Ok(view) => {
                tx.commit().await?;
                Ok(view)
            }
            Err(e) => {
                release(tx).await;
                Err(e)
            }
        }
    }

    /// Nested fetch inside a caller-supplied unit of work
    async fn nested_fetch_in_interactive_transaction(
        &self,
        name: &str,
        isolation: IsolationLevel,
    ) -> Result<PairView, GatewayError> {
        let name = name.to_owned();
        interactive(self, isolation, move |tx| {
            Box::pin(async move { tx.find_nested(&name).await })
        })
        .await
    }

    /// Head by name, then segment by head id, as two statements of one
    /// transaction
    async fn independent_fetch(
        &self,
        name: &str,
        isolation: IsolationLevel,
    ) -> Result<(Head, Option<Segment>), GatewayError> {
        let mut tx = self.begin(isolation).await?;
        let head = match tx.find_head(name).await {
            Ok(head) => head,
            Err(e) => {
                release(tx).await;
                return Err(e);
            }
        };
        let segment = match tx.find_segment_for(head.id).await {
            Ok(segment) => segment,
            Err(e) => {
                release(tx).await;
                return Err(e);
            }
        };
        tx.commit().await?;
        Ok((head, segment))
    }
}

/// Roll back after a failed statement; the statement's error wins
pub(crate) async fn release(tx: Box<dyn Transaction>) {
    if let Err(e) = tx.rollback().await {
        if e != GatewayError::Transaction(TransactionError::Inactive) {
            tracing::warn!(error = %e, "rollback failed");
        }
    }
}
