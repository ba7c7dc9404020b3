//! Persistence Adapters
//!
//! Concrete storage for the `MarketStore` port: process-local versioned
//! maps as the transactional hot state, JSONL journaling for the
//! append-only swap history, and atomic JSON snapshots for crash
//! recovery.

pub mod journal;
pub mod memory;
pub mod snapshot;
pub mod store_impl;

pub use journal::SwapJournal;
pub use memory::InMemoryStore;
pub use snapshot::{EngineSnapshot, SnapshotStore};
pub use store_impl::PersistentStore;
