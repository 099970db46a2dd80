//! Per-statement latency
//!
//! Every statement the store executes first waits for its latency. The wait
//! is where concurrent tasks interleave, so the model decides which torn
//! reads are reachable. Jitter is drawn from a seeded generator; under a
//! paused tokio clock the whole schedule is reproducible.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Statement class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Select
    Read,
    /// Insert, update, delete
    Write,
    /// Begin, commit, rollback
    Control,
}

/// Latency configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyModel {
    /// Base latency of read statements
    pub read: Duration,
    /// Base latency of write statements
    pub write: Duration,
    /// Upper bound of extra random latency, added to reads and writes
    pub jitter: Duration,
    /// Jitter seed
    pub seed: u64,
}

impl LatencyModel {
    /// No latency; statements only yield
    #[must_use]
    pub const fn instant() -> Self {
        Self {
            read: Duration::ZERO,
            write: Duration::ZERO,
            jitter: Duration::ZERO,
            seed: 42,
        }
    }

    /// Fixed read and write latencies
    #[must_use]
    pub const fn fixed(read: Duration, write: Duration) -> Self {
        Self {
            read,
            write,
            jitter: Duration::ZERO,
            seed: 42,
        }
    }

    /// Add seeded jitter
    #[must_use]
    pub const fn with_jitter(mut self, jitter: Duration, seed: u64) -> Self {
        self.jitter = jitter;
        self.seed = seed;
        self
    }
}

impl Default for LatencyModel {
    fn default() -> Self {
        Self::instant()
    }
}

/// Stateful sampler for a [`LatencyModel`]
#[derive(Debug)]
pub(crate) struct Latency {
    model: LatencyModel,
    rng: Mutex<StdRng>,
}

impl Latency {
    pub(crate) fn new(model: LatencyModel) -> Self {
        Self {
            model,
            rng: Mutex::new(StdRng::seed_from_u64(model.seed)),
        }
    }

    pub(crate) fn model(&self) -> LatencyModel {
        self.model
    }

    /// Delay for the next statement of `kind`
    pub(crate) fn sample(&self, kind: StatementKind) -> Duration {
        let base = match kind {
            StatementKind::Read => self.model.read,
            StatementKind::Write => self.model.write,
            StatementKind::Control => return Duration::ZERO,
        };
        if self.model.jitter.is_zero() {
            return base;
        }
        let max = u64::try_from(self.model.jitter.as_nanos()).unwrap_or(u64::MAX);
        let extra = self.rng.lock().random_range(0..=max);
        base + Duration::from_nanos(extra)
    }

    /// Wait out one statement; always a suspension point
    pub(crate) async fn pause(&self, kind: StatementKind) {
        let delay = self.sample(kind);
        if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(delay).await;
        }
    }
}
