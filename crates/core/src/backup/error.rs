use thiserror::Error;

use crate::storage::StoreError;

/// Errors reported by an object-store backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlobError {
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Object store request failed: {0}")]
    Backend(String),
    #[error("Object store I/O failed: {0}")]
    Io(String),
}

impl From<std::io::Error> for BlobError {
    fn from(err: std::io::Error) -> Self {
        BlobError::Io(err.to_string())
    }
}

/// Errors reading or writing the paginated backup document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Failed to encode page: {0}")]
    Encode(String),
    #[error("Failed to decode page at line {line}: {reason}")]
    Decode { line: usize, reason: String },
    #[error("Backup document is truncated")]
    Truncated,
    #[error("Compression stream failed: {0}")]
    Compression(String),
}

/// Any failure while moving one table or document between the store and the
/// object store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error(transparent)]
    Blob(#[from] BlobError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Telemetry sink failed: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransferError {
    fn from(err: std::io::Error) -> Self {
        TransferError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        assert_eq!(
            BlobError::from(io),
            BlobError::Io("pipe closed".to_string())
        );
    }

    #[test]
    fn test_document_decode_display() {
        let error = DocumentError::Decode {
            line: 3,
            reason: "expected value".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to decode page at line 3: expected value"
        );
    }

    #[test]
    fn test_transfer_error_is_transparent() {
        let error: TransferError = StoreError::TableNotFound {
            table: "People".to_string(),
        }
        .into();
        assert_eq!(error.to_string(), "Table not found: People");
    }
}
