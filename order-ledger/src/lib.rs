//! Order Ledger
//!
//! Order book for a small food-delivery kitchen: which flat ordered what,
//! in what quantity, and what each flat owes.
//!
//! # Architecture
//!
//! - **Snapshot state**: the ledger is one list of customers; every edit
//!   yields a new snapshot
//! - **Full rewrite**: each snapshot is written whole under one storage key
//! - **Stable ids**: customers and line items are addressed by id, never
//!   by display position
//! - **Silent rejection**: invalid edits are no-ops, not errors

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod catalog;
pub mod storage;
pub mod ledger;
pub mod error;
pub mod config;

// Re-exports
pub use error::{Error, Result};
pub use types::{Customer, CustomerId, LineItem, LineItemId, MenuItem, Quantity};
pub use catalog::Catalog;
pub use storage::{FileStore, KeyValueStore, MemoryStore, SnapshotStore};
pub use ledger::Ledger;
pub use config::{Config, StorageBackend};
