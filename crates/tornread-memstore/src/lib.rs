//! In-memory store for tornread
//!
//! A reference [`StorageGateway`](tornread_core::StorageGateway) with
//! copy-on-write snapshots:
//! - single-statement reads see one committed state
//! - nested fetches outside a transaction run two statements
//! - `read-committed` transactions read the latest state per statement
//! - `repeatable-read` and `serializable` transactions read the state as of
//!   `begin`
//! - `snapshot` is rejected unless configured otherwise
//!
//! Statement latency comes from a seeded [`LatencyModel`].

#![warn(unreachable_pub)]

mod latency;
mod store;

pub use latency::{LatencyModel, StatementKind};
pub use store::{MemoryStore, MemoryTransaction, RowCounts, StoreStats};
