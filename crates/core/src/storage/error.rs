use thiserror::Error;

/// Errors that can occur when building a query.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Invalid filter combination: a row key requires a partition key")]
    InvalidFilterCombination,
}

/// Errors reported by a wide-column store backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Table not found: {table}")]
    TableNotFound { table: String },
    #[error("Table already exists: {table}")]
    TableAlreadyExists { table: String },
    #[error("Record already exists: {partition_key}/{row_key}")]
    RecordExists {
        partition_key: String,
        row_key: String,
    },
    #[error("Record not found: {partition_key}/{row_key}")]
    RecordNotFound {
        partition_key: String,
        row_key: String,
    },
    #[error("Invalid batch: {0}")]
    InvalidBatch(String),
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Returns true if the error reports a missing table.
    pub fn is_table_not_found(&self) -> bool {
        matches!(self, StoreError::TableNotFound { .. })
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
