//! Testing utilities for the tornread workspace
//!
//! Shared fixtures: stores with known latency, quick configurations, runners.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;
use tornread_core::{HarnessConfig, ScenarioRunner, StorageGateway};
use tornread_memstore::{LatencyModel, MemoryStore};

pub const PAIR: &str = "Python";

/// Read statements take 5ms, writes 7ms, no jitter
///
/// Under a paused clock, a reader starting together with the writer reads
/// the head at t=5ms (initial value) and the segment at t=10ms, after the
/// first write committed at t=7ms. Anything without a snapshot tears on its
/// first iteration.
pub fn interleaving_store() -> MemoryStore {
    MemoryStore::with_latency(LatencyModel::fixed(
        Duration::from_millis(5),
        Duration::from_millis(7),
    ))
}

/// 1ms base latency with up to 3ms of seeded jitter
pub fn jittered_store(seed: u64) -> MemoryStore {
    MemoryStore::with_latency(
        LatencyModel::fixed(Duration::from_millis(1), Duration::from_millis(1))
            .with_jitter(Duration::from_millis(3), seed),
    )
}

/// Store already reset to `value`
pub async fn seeded_store(value: i64) -> MemoryStore {
    let store = MemoryStore::new();
    store
        .reset_pair(PAIR, value)
        .await
        .expect("reset of a fresh memory store");
    store
}

/// Default configuration with `run_for` iterations and no settle delay
pub fn quick_config(run_for: u64) -> HarnessConfig {
    HarnessConfig::new()
        .with_run_for(run_for)
        .with_settle_delay(Duration::ZERO)
}

pub fn runner(store: &MemoryStore, config: HarnessConfig) -> ScenarioRunner {
    let gateway: Arc<dyn StorageGateway> = Arc::new(store.clone());
    ScenarioRunner::new(gateway, config)
}
