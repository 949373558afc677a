use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

use crate::storage::{ContinuationToken, Page};

use super::error::BlobError;

/// One segment of a container listing: document names relative to the
/// container, and a token when more names remain.
pub type BlobSegment = Page<String>;

/// Byte stream of an opened document.
pub type DocumentStream = BoxStream<'static, Result<Bytes, BlobError>>;

/// A document opened for writing.
///
/// Nothing is visible to readers until [`finish`](DocumentSink::finish)
/// succeeds. Dropping or aborting the sink discards the partial upload.
#[async_trait]
pub trait DocumentSink: Send {
    async fn write(&mut self, chunk: Bytes) -> Result<(), BlobError>;

    async fn finish(self: Box<Self>) -> Result<(), BlobError>;

    async fn abort(self: Box<Self>);
}

/// Boundary to an object store holding backup documents.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn container_exists(&self, container: &str) -> Result<bool, BlobError>;

    /// Creates a container. Creating an existing container is not an error.
    async fn create_container(&self, container: &str) -> Result<(), BlobError>;

    async fn open_write(
        &self,
        container: &str,
        path: &str,
    ) -> Result<Box<dyn DocumentSink>, BlobError>;

    async fn open_read(&self, container: &str, path: &str) -> Result<DocumentStream, BlobError>;

    /// Lists at most `max_results` document names under `prefix`, in
    /// lexicographic order, starting after `continuation`.
    async fn list_segment(
        &self,
        container: &str,
        prefix: Option<&str>,
        continuation: Option<&ContinuationToken>,
        max_results: usize,
    ) -> Result<BlobSegment, BlobError>;
}
