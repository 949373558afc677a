//! In-memory table store for tests and local development.
//!
//! Tables are ordered maps keyed by `(partition_key, row_key)` behind an
//! `Arc<RwLock<_>>`, so listing and scan order are deterministic. Data is
//! lost when the last clone of the store is dropped.
//!
//! # Example
//!
//! ```rust,ignore
//! use tablekeep::storage::inmemory::InMemoryTableStore;
//!
//! let store = InMemoryTableStore::new();
//! store.create_table("People", true).await?;
//! ```

mod store;

pub use store::InMemoryTableStore;
