//! tornread core - torn-read detection harness
//!
//! Runs one unsynchronized writer against one reader over a single
//! head/segment pair and reports, per read strategy, whether the reader ever
//! saw the two values disagree:
//! - Entity model and pair invariant
//! - Storage gateway contract (implemented by store drivers)
//! - Five read strategies with different atomicity contracts
//! - Fail-fast write and read loops
//! - Scenario runner and reports
//!
//! # Example
//!
//! ```rust,ignore
//! use tornread_core::{HarnessConfig, ScenarioRunner};
//!
//! # async fn example(store: std::sync::Arc<dyn tornread_core::StorageGateway>) {
//! let runner = ScenarioRunner::new(store, HarnessConfig::new().with_run_for(100));
//! let report = runner.run_all().await;
//!
//! for scenario in &report.scenarios {
//!     println!("{}", scenario.line());
//! }
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod checker;
pub mod config;
pub mod error;
pub mod gateway;
pub mod loops;
pub mod model;
pub mod report;
pub mod runner;
pub mod strategy;
pub mod transaction;

// Re-exports for convenience
pub use checker::check;
pub use config::HarnessConfig;
pub use error::{
    AnomalyError, ErrorKind, GatewayError, HarnessError, StoreError, TransactionError,
};
pub use gateway::{IsolationLevel, StorageGateway, Transaction};
pub use loops::{run_reads, run_writes, LoopFailure, LoopSide};
pub use model::{Head, HeadId, JoinedRow, PairView, Segment, SegmentId};
pub use report::{LoopSummary, Outcome, RunReport, ScenarioReport};
pub use runner::ScenarioRunner;
pub use strategy::ReadStrategy;
pub use transaction::interactive;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
