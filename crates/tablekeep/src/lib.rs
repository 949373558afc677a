//! tablekeep - entity storage and streaming backup for wide-column stores.
//!
//! The imperative shell around `tablekeep_core`: store backends, the storage
//! context with its dispatcher and query executor, the object-store blob
//! backend and the backup/restore pipeline.

pub mod backup;
pub mod blob;
pub mod cli;
pub mod config;
pub mod context;
pub mod dispatch;
mod error;
pub mod query;
pub mod storage;

pub use context::{ContextOptions, StorageContext};
pub use error::{Error, Result};
