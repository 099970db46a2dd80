//! Write and read loops
//!
//! Both loops are strictly sequential and fail fast: the first error ends the
//! loop and no further iteration is attempted. Neither loop holds any state
//! about the pair between iterations.

use crate::checker::check;
use crate::error::HarnessError;
use crate::gateway::{IsolationLevel, StorageGateway};
use crate::strategy::ReadStrategy;

/// Which side of a scenario a loop drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoopSide {
    /// Mutates the pair
    Writer,
    /// Reads and checks the pair
    Reader,
}

impl LoopSide {
    /// Lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Writer => "writer",
            Self::Reader => "reader",
        }
    }
}

/// A loop stopped at `iteration`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} failed at iteration {iteration}: {error}", .side.as_str())]
pub struct LoopFailure {
    /// Which loop
    pub side: LoopSide,
    /// Zero-based iteration that failed
    pub iteration: u64,
    /// Cause
    pub error: HarnessError,
}

impl LoopFailure {
    /// Iterations the loop started, including the failed one
    #[inline]
    #[must_use]
    pub fn attempted(&self) -> u64 {
        self.iteration + 1
    }
}

/// Run `count` sequential updates, setting the pair to `0..count`
///
/// Returns the number of completed updates.
///
/// # Errors
/// The first failed update.
pub async fn run_writes<G>(gateway: &G, name: &str, count: u64) -> Result<u64, LoopFailure>
where
    G: StorageGateway + ?Sized,
{
    for i in 0..count {
        let value = i64::try_from(i).unwrap_or(i64::MAX);
        if let Err(e) = gateway.update_pair(name, value).await {
            tracing::warn!(iteration = i, error = %e, "write failed");
            return Err(LoopFailure {
                side: LoopSide::Writer,
                iteration: i,
                error: e.into(),
            });
        }
        tracing::info!(iteration = i, value, "write");
    }
    Ok(count)
}

/// Run `count` sequential reads through `strategy`, checking each view
///
/// Returns the number of completed, consistent reads.
///
/// # Errors
/// The first failed read or the first anomaly.
pub async fn run_reads<G>(
    gateway: &G,
    name: &str,
    count: u64,
    strategy: ReadStrategy,
    isolation: IsolationLevel,
) -> Result<u64, LoopFailure>
where
    G: StorageGateway + ?Sized,
{
    for i in 0..count {
        let fail = |error: HarnessError| LoopFailure {
            side: LoopSide::Reader,
            iteration: i,
            error,
        };

        let view = strategy
            .read(gateway, name, isolation)
            .await
            .map_err(|e| fail(e.into()))?;

        tracing::info!(
            iteration = i,
            %strategy,
            head = view.head.value,
            segment = ?view.segment_value(),
            "read"
        );

        if let Err(anomaly) = check(&view, i) {
            tracing::warn!(
                iteration = i,
                %strategy,
                head = view.head.value,
                segment = ?view.segment_value(),
                "mismatch"
            );
            return Err(fail(anomaly.into()));
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, GatewayError, StoreError};
    use crate::gateway::Transaction;
    use crate::model::{Head, HeadId, JoinedRow, PairView, Segment, SegmentId};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Serves scripted segment values for nested fetches and fails writes
    /// from a chosen iteration on
    struct Scripted {
        segment_values: Vec<i64>,
        reads: AtomicU64,
        writes: AtomicU64,
        fail_writes_from: u64,
    }

    impl Scripted {
        fn new(segment_values: Vec<i64>) -> Self {
            Self {
                segment_values,
                reads: AtomicU64::new(0),
                writes: AtomicU64::new(0),
                fail_writes_from: u64::MAX,
            }
        }
    }

    #[async_trait]
    impl StorageGateway for Scripted {
        async fn reset_pair(&self, name: &str, initial: i64) -> Result<PairView, GatewayError> {
            self.nested_fetch(name).await.map(|mut v| {
                v.head.value = initial;
                v
            })
        }

        async fn update_pair(&self, _name: &str, _value: i64) -> Result<(), GatewayError> {
            let n = self.writes.fetch_add(1, Ordering::SeqCst);
            if n >= self.fail_writes_from {
                return Err(StoreError::Connectivity("connection reset".to_string()).into());
            }
            Ok(())
        }

        async fn raw_joined_fetch(&self, _name: &str) -> Result<Vec<JoinedRow>, GatewayError> {
            Ok(Vec::new())
        }

        async fn nested_fetch(&self, name: &str) -> Result<PairView, GatewayError> {
            let n = self.reads.fetch_add(1, Ordering::SeqCst);
            let idx = usize::try_from(n).unwrap();
            let segment = self.segment_values.get(idx).copied().unwrap_or(0);
            Ok(PairView::new(
                Head {
                    id: HeadId(1),
                    name: name.to_string(),
                    value: 0,
                },
                Some(Segment {
                    id: SegmentId(1),
                    value: segment,
                    head_id: HeadId(1),
                }),
            ))
        }

        async fn begin(
            &self,
            _isolation: IsolationLevel,
        ) -> Result<Box<dyn Transaction>, GatewayError> {
            Err(StoreError::Unexpected("no transactions".to_string()).into())
        }
    }

    #[tokio::test]
    async fn reader_stops_at_first_anomaly() {
        let gateway = Scripted::new(vec![0, 0, 0, 1, 0, 0, 0, 0]);

        let failure = run_reads(
            &gateway,
            "Python",
            8,
            ReadStrategy::Nested,
            IsolationLevel::RepeatableRead,
        )
        .await
        .unwrap_err();

        assert_eq!(failure.side, LoopSide::Reader);
        assert_eq!(failure.iteration, 3);
        assert_eq!(failure.attempted(), 4);
        assert_eq!(failure.error.kind(), ErrorKind::Anomaly);
        assert_eq!(gateway.reads.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn reader_completes_when_every_view_is_consistent() {
        let gateway = Scripted::new(vec![0; 5]);

        let completed = run_reads(
            &gateway,
            "Python",
            5,
            ReadStrategy::Nested,
            IsolationLevel::RepeatableRead,
        )
        .await
        .unwrap();

        assert_eq!(completed, 5);
    }

    #[tokio::test]
    async fn raw_read_with_no_rows_is_not_found() {
        let gateway = Scripted::new(Vec::new());

        let failure = run_reads(
            &gateway,
            "Python",
            3,
            ReadStrategy::Raw,
            IsolationLevel::RepeatableRead,
        )
        .await
        .unwrap_err();

        assert_eq!(failure.iteration, 0);
        assert_eq!(failure.error.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn transaction_errors_propagate_unchanged() {
        let gateway = Scripted::new(Vec::new());

        let failure = run_reads(
            &gateway,
            "Python",
            3,
            ReadStrategy::Independent,
            IsolationLevel::RepeatableRead,
        )
        .await
        .unwrap_err();

        assert_eq!(
            failure.error,
            HarnessError::Gateway(StoreError::Unexpected("no transactions".to_string()).into())
        );
    }

    #[tokio::test]
    async fn writer_fails_fast() {
        let mut gateway = Scripted::new(Vec::new());
        gateway.fail_writes_from = 2;

        let failure = run_writes(&gateway, "Python", 10).await.unwrap_err();

        assert_eq!(failure.side, LoopSide::Writer);
        assert_eq!(failure.iteration, 2);
        assert_eq!(failure.error.kind(), ErrorKind::Store);
        assert_eq!(gateway.writes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn writer_reports_completed_count() {
        let gateway = Scripted::new(Vec::new());
        assert_eq!(run_writes(&gateway, "Python", 4).await, Ok(4));
        assert_eq!(run_writes(&gateway, "Python", 0).await, Ok(0));
    }
}
