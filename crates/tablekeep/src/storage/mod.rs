//! Table store backends.
//!
//! Concrete implementations of `tablekeep_core::storage::TableStore`.
//!
//! # Feature Flags
//!
//! - `dynamodb` (default): AWS DynamoDB backend using `aws-sdk-dynamodb`
//!
//! The in-memory backend is always compiled; it backs the test suite and
//! local experiments.
//!
//! Build without DynamoDB:
//! ```bash
//! cargo build -p tablekeep --no-default-features
//! ```

pub mod inmemory;

#[cfg(feature = "dynamodb")]
pub mod dynamodb;

pub use inmemory::InMemoryTableStore;

#[cfg(feature = "dynamodb")]
pub use dynamodb::DynamoDbTableStore;
