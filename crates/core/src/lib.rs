//! tablekeep_core - entity mapping and backup contracts for wide-column stores.
//!
//! This crate is the functional core: key templates, the mapper registry,
//! record adaptation, batching rules and the backup document format are all
//! pure and testable without a store. The collaborator traits
//! ([`storage::TableStore`], [`backup::BlobStore`]) mark the boundary to the
//! imperative shell in the `tablekeep` crate.

pub mod backup;
pub mod entity;
pub mod serde;
pub mod storage;
