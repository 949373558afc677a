mod document;
mod error;
mod naming;
mod stats;
mod traits;

pub use document::{PageDocumentDecoder, PageDocumentEncoder};
pub use error::{BlobError, DocumentError, TransferError};
pub use naming::{BackupDocumentName, GZIP_EXTENSION, JSON_EXTENSION};
pub use stats::{PageStats, PAGE_STATS_HEADER};
pub use traits::{BlobSegment, BlobStore, DocumentSink, DocumentStream};
