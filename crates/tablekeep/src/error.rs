//! Library error types.

use tablekeep_core::backup::{BlobError, TransferError};
use tablekeep_core::entity::{EntityError, MappingError};
use tablekeep_core::storage::{QueryError, StoreError};
use thiserror::Error;

/// Result type alias for the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the storage context, the dispatcher, the query
/// executor and the backup pipeline.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Entity(#[from] EntityError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Blob(#[from] BlobError),

    #[error("Backup of table '{table}' failed: {source}")]
    Backup {
        table: String,
        source: TransferError,
    },

    #[error("Restore of '{document}' failed: {source}")]
    Restore {
        document: String,
        source: TransferError,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if the underlying store reported a missing table.
    pub fn is_table_not_found(&self) -> bool {
        match self {
            Error::Store(err) => err.is_table_not_found(),
            Error::Backup { source, .. } | Error::Restore { source, .. } => {
                matches!(source, TransferError::Store(err) if err.is_table_not_found())
            }
            _ => false,
        }
    }
}
