//! DynamoDB table store.
//!
//! Every table uses the same two-part key: `PartitionKey` (HASH) and
//! `RowKey` (RANGE), both strings. Model properties become top-level
//! attributes next to the keys.

mod conversions;
mod error;
mod keys;
mod store;

pub use store::DynamoDbTableStore;
