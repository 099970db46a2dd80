//! Copy-on-write in-memory store
//!
//! Committed state is an `Arc<Tables>`. Writers clone-and-swap it under a
//! short write lock, so a single write commits both records at once.
//! Snapshot transactions keep the `Arc` they saw at `begin`; statement-level
//! reads take whatever is current when the statement runs.
//!
//! The lock is never held across an await.

use crate::latency::{Latency, LatencyModel, StatementKind};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tornread_core::{
    GatewayError, Head, HeadId, IsolationLevel, JoinedRow, PairView, Segment, SegmentId,
    StorageGateway, StoreError, Transaction, TransactionError,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    heads: BTreeMap<HeadId, Head>,
    segments: BTreeMap<SegmentId, Segment>,
}

impl Tables {
    fn head_by_name(&self, name: &str) -> Option<&Head> {
        self.heads.values().find(|h| h.name == name)
    }

    fn segment_for(&self, head_id: HeadId) -> Option<&Segment> {
        self.segments.values().find(|s| s.head_id == head_id)
    }

    fn joined(&self, name: &str) -> Vec<JoinedRow> {
        self.head_by_name(name)
            .into_iter()
            .flat_map(|head| {
                self.segments
                    .values()
                    .filter(move |s| s.head_id == head.id)
                    .map(move |s| JoinedRow {
                        id: head.id,
                        name: head.name.clone(),
                        value: head.value,
                        segment_id: s.id,
                        segment_value: s.value,
                        head_id: s.head_id,
                    })
            })
            .collect()
    }
}

#[derive(Debug, Default)]
struct State {
    tables: Arc<Tables>,
    version: u64,
    next_head: u64,
    next_segment: u64,
}

#[derive(Debug, Default)]
struct Counters {
    statements: AtomicU64,
    begun: AtomicU64,
    commits: AtomicU64,
    rollbacks: AtomicU64,
    open: AtomicU64,
}

#[derive(Debug)]
struct Shared {
    state: RwLock<State>,
    latency: Latency,
    unsupported: RwLock<Vec<IsolationLevel>>,
    available: AtomicBool,
    counters: Counters,
}

impl Shared {
    /// Wait out the statement latency, then check the store is reachable
    async fn statement(&self, kind: StatementKind) -> Result<(), GatewayError> {
        self.latency.pause(kind).await;
        self.counters.statements.fetch_add(1, Ordering::Relaxed);
        if self.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StoreError::Connectivity("store unavailable".to_string()).into())
        }
    }

    fn current(&self) -> Arc<Tables> {
        Arc::clone(&self.state.read().tables)
    }
}

/// Statistics snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreStats {
    /// Statements executed, control statements included
    pub statements: u64,
    /// Transactions opened
    pub transactions_begun: u64,
    /// Transactions committed
    pub commits: u64,
    /// Transactions rolled back, explicitly or by drop
    pub rollbacks: u64,
    /// Transactions currently open
    pub open_transactions: u64,
    /// Committed write count
    pub version: u64,
}

/// Row counts, for reset checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowCounts {
    /// Heads
    pub heads: usize,
    /// Segments
    pub segments: usize,
    /// Segments whose head does not exist
    pub orphans: usize,
}

/// In-memory store of record
#[derive(Debug, Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    /// Store without latency that rejects `Snapshot` isolation
    #[must_use]
    pub fn new() -> Self {
        Self::with_latency(LatencyModel::instant())
    }

    /// Store with the given latency model
    #[must_use]
    pub fn with_latency(latency: LatencyModel) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(State::default()),
                latency: Latency::new(latency),
                unsupported: RwLock::new(vec![IsolationLevel::Snapshot]),
                available: AtomicBool::new(true),
                counters: Counters::default(),
            }),
        }
    }

    /// Replace the set of isolation levels `begin` rejects
    ///
    /// Tables, statistics and latency state are kept.
    #[must_use]
    pub fn with_unsupported(self, levels: impl IntoIterator<Item = IsolationLevel>) -> Self {
        self.set_unsupported(levels);
        self
    }

    /// Replace the set of isolation levels `begin` rejects; affects later `begin` calls only
    pub fn set_unsupported(&self, levels: impl IntoIterator<Item = IsolationLevel>) {
        *self.shared.unsupported.write() = levels.into_iter().collect();
    }

    /// Simulate losing or regaining the connection
    pub fn set_available(&self, available: bool) {
        self.shared.available.store(available, Ordering::Release);
    }

    /// Latency model in use
    #[must_use]
    pub fn latency(&self) -> LatencyModel {
        self.shared.latency.model()
    }

    /// Statistics snapshot
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let c = &self.shared.counters;
        StoreStats {
            statements: c.statements.load(Ordering::Relaxed),
            transactions_begun: c.begun.load(Ordering::Relaxed),
            commits: c.commits.load(Ordering::Relaxed),
            rollbacks: c.rollbacks.load(Ordering::Relaxed),
            open_transactions: c.open.load(Ordering::Relaxed),
            version: self.shared.state.read().version,
        }
    }

    /// Current row counts
    #[must_use]
    pub fn counts(&self) -> RowCounts {
        let tables = self.shared.current();
        RowCounts {
            heads: tables.heads.len(),
            segments: tables.segments.len(),
            orphans: tables
                .segments
                .values()
                .filter(|s| !tables.heads.contains_key(&s.head_id))
                .count(),
        }
    }

    /// Committed pair, read without latency or statement accounting
    #[must_use]
    pub fn peek(&self, name: &str) -> Option<PairView> {
        let tables = self.shared.current();
        let head = tables.head_by_name(name)?.clone();
        let segment = tables.segment_for(head.id).cloned();
        Some(PairView::new(head, segment))
    }

    /// Insert a head without a segment
    ///
    /// # Errors
    /// `StoreError::Constraint` when the name is taken.
    pub async fn insert_head(&self, name: &str, value: i64) -> Result<Head, GatewayError> {
        self.shared.statement(StatementKind::Write).await?;
        let mut state = self.shared.state.write();
        if state.tables.head_by_name(name).is_some() {
            return Err(StoreError::Constraint(format!("duplicate head name {name:?}")).into());
        }
        state.next_head += 1;
        let head = Head {
            id: HeadId(state.next_head),
            name: name.to_string(),
            value,
        };
        Arc::make_mut(&mut state.tables)
            .heads
            .insert(head.id, head.clone());
        state.version += 1;
        Ok(head)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageGateway for MemoryStore {
    async fn reset_pair(&self, name: &str, initial: i64) -> Result<PairView, GatewayError> {
        self.shared.statement(StatementKind::Write).await?;
        let mut state = self.shared.state.write();
        state.next_head += 1;
        state.next_segment += 1;
        let head = Head {
            id: HeadId(state.next_head),
            name: name.to_string(),
            value: initial,
        };
        let segment = Segment {
            id: SegmentId(state.next_segment),
            value: initial,
            head_id: head.id,
        };

        let mut tables = Tables::default();
        tables.heads.insert(head.id, head.clone());
        tables.segments.insert(segment.id, segment.clone());
        state.tables = Arc::new(tables);
        state.version += 1;

        tracing::trace!(name, initial, version = state.version, "reset");
        Ok(PairView::new(head, Some(segment)))
    }

    async fn update_pair(&self, name: &str, value: i64) -> Result<(), GatewayError> {
        self.shared.statement(StatementKind::Write).await?;
        let mut state = self.shared.state.write();
        let head_id = state
            .tables
            .head_by_name(name)
            .map(|h| h.id)
            .ok_or_else(|| GatewayError::not_found("head", name))?;
        let segment_id = state
            .tables
            .segment_for(head_id)
            .map(|s| s.id)
            .ok_or_else(|| GatewayError::not_found("segment", head_id.to_string()))?;

        let tables = Arc::make_mut(&mut state.tables);
        if let Some(head) = tables.heads.get_mut(&head_id) {
            head.value = value;
        }
        if let Some(segment) = tables.segments.get_mut(&segment_id) {
            segment.value = value;
        }
        state.version += 1;

        tracing::trace!(name, value, version = state.version, "update");
        Ok(())
    }

    async fn raw_joined_fetch(&self, name: &str) -> Result<Vec<JoinedRow>, GatewayError> {
        self.shared.statement(StatementKind::Read).await?;
        let rows = self.shared.current().joined(name);
        if rows.is_empty() {
            return Err(GatewayError::not_found("joined row", name));
        }
        Ok(rows)
    }

    async fn nested_fetch(&self, name: &str) -> Result<PairView, GatewayError> {
        // The nested read is two statements with no snapshot between them.
        self.shared.statement(StatementKind::Read).await?;
        let head = self
            .shared
            .current()
            .head_by_name(name)
            .cloned()
            .ok_or_else(|| GatewayError::not_found("head", name))?;

        self.shared.statement(StatementKind::Read).await?;
        let segment = self.shared.current().segment_for(head.id).cloned();
        Ok(PairView::new(head, segment))
    }

    async fn begin(&self, isolation: IsolationLevel) -> Result<Box<dyn Transaction>, GatewayError> {
        if self.shared.unsupported.read().contains(&isolation) {
            return Err(TransactionError::UnsupportedIsolation(isolation).into());
        }
        self.shared.statement(StatementKind::Control).await?;

        let snapshot = match isolation {
            IsolationLevel::ReadUncommitted | IsolationLevel::ReadCommitted => None,
            IsolationLevel::RepeatableRead
            | IsolationLevel::Snapshot
            | IsolationLevel::Serializable => Some(self.shared.current()),
        };
        self.shared.counters.begun.fetch_add(1, Ordering::Relaxed);
        self.shared.counters.open.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(MemoryTransaction {
            shared: Arc::clone(&self.shared),
            isolation,
            snapshot,
            settled: false,
        }))
    }
}

/// Read transaction over a [`MemoryStore`]
#[derive(Debug)]
pub struct MemoryTransaction {
    shared: Arc<Shared>,
    isolation: IsolationLevel,
    snapshot: Option<Arc<Tables>>,
    settled: bool,
}

impl MemoryTransaction {
    fn view(&self) -> Arc<Tables> {
        match &self.snapshot {
            Some(tables) => Arc::clone(tables),
            None => self.shared.current(),
        }
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    async fn find_head(&mut self, name: &str) -> Result<Head, GatewayError> {
        self.shared.statement(StatementKind::Read).await?;
        self.view()
            .head_by_name(name)
            .cloned()
            .ok_or_else(|| GatewayError::not_found("head", name))
    }

    async fn find_segment_for(&mut self, head_id: HeadId) -> Result<Option<Segment>, GatewayError> {
        self.shared.statement(StatementKind::Read).await?;
        Ok(self.view().segment_for(head_id).cloned())
    }

    async fn commit(self: Box<Self>) -> Result<(), GatewayError> {
        let mut tx = self;
        tx.shared.statement(StatementKind::Control).await?;
        tx.settled = true;
        tx.shared.counters.commits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), GatewayError> {
        let mut tx = self;
        tx.settled = true;
        tx.shared.counters.rollbacks.fetch_add(1, Ordering::Relaxed);
        tx.shared.statement(StatementKind::Control).await
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if !self.settled {
            self.shared.counters.rollbacks.fetch_add(1, Ordering::Relaxed);
        }
        self.shared.counters.open.fetch_sub(1, Ordering::Relaxed);
    }
}
