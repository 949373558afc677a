//! `BlobStore` over the `object_store` crate.
//!
//! A container is the first path segment of an object's location. It exists
//! once its marker object (`{container}/.container`) has been written, so an
//! empty container is still visible. Document names are relative to the
//! container.

use std::collections::BTreeSet;
use std::path::Path as FsPath;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use object_store::buffered::BufWriter;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use tokio::io::AsyncWriteExt;
use tracing::warn;

use tablekeep_core::backup::{BlobError, BlobSegment, BlobStore, DocumentSink, DocumentStream};
use tablekeep_core::storage::ContinuationToken;

pub const CONTAINER_MARKER: &str = ".container";

/// Map an `object_store` error to BlobError.
pub fn map_object_store_error(err: object_store::Error) -> BlobError {
    match err {
        object_store::Error::NotFound { path, .. } => BlobError::NotFound(path),
        err => BlobError::Backend(err.to_string()),
    }
}

#[derive(Debug, Clone)]
pub struct ObjectStoreBlobStore {
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreBlobStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Volatile store, mainly for tests.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()))
    }

    /// Store rooted at a local directory, created if missing.
    pub fn local(root: impl AsRef<FsPath>) -> Result<Self, BlobError> {
        std::fs::create_dir_all(root.as_ref())?;
        let store = LocalFileSystem::new_with_prefix(root.as_ref()).map_err(map_object_store_error)?;
        Ok(Self::new(Arc::new(store)))
    }

    fn location(container: &str, path: &str) -> Path {
        Path::from(format!("{container}/{path}"))
    }

    fn marker(container: &str) -> Path {
        Self::location(container, CONTAINER_MARKER)
    }
}

/// Name of `location` relative to `container`, if it lives there.
fn relative_name(container: &str, location: &Path) -> Option<String> {
    location
        .as_ref()
        .strip_prefix(container)
        .and_then(|rest| rest.strip_prefix('/'))
        .map(str::to_string)
}

#[async_trait]
impl BlobStore for ObjectStoreBlobStore {
    async fn container_exists(&self, container: &str) -> Result<bool, BlobError> {
        match self.store.head(&Self::marker(container)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(err) => Err(map_object_store_error(err)),
        }
    }

    async fn create_container(&self, container: &str) -> Result<(), BlobError> {
        if self.container_exists(container).await? {
            return Ok(());
        }
        self.store
            .put(&Self::marker(container), PutPayload::from(Bytes::new()))
            .await
            .map_err(map_object_store_error)?;
        Ok(())
    }

    async fn open_write(
        &self,
        container: &str,
        path: &str,
    ) -> Result<Box<dyn DocumentSink>, BlobError> {
        let writer = BufWriter::new(self.store.clone(), Self::location(container, path));
        Ok(Box::new(ObjectDocumentSink { writer }))
    }

    async fn open_read(&self, container: &str, path: &str) -> Result<DocumentStream, BlobError> {
        let result = self
            .store
            .get(&Self::location(container, path))
            .await
            .map_err(map_object_store_error)?;

        Ok(result
            .into_stream()
            .map(|chunk| chunk.map_err(map_object_store_error))
            .boxed())
    }

    async fn list_segment(
        &self,
        container: &str,
        prefix: Option<&str>,
        continuation: Option<&ContinuationToken>,
        max_results: usize,
    ) -> Result<BlobSegment, BlobError> {
        let list_prefix = match prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
            Some(prefix) => Self::location(container, prefix),
            None => Path::from(container),
        };
        let after = continuation.map(ContinuationToken::as_str);
        let max_results = max_results.max(1);

        // Backends list in no particular order: keep the smallest names.
        let mut names = BTreeSet::new();
        let mut more = false;
        let mut listing = self.store.list(Some(&list_prefix));
        while let Some(meta) = listing.next().await {
            let meta = meta.map_err(map_object_store_error)?;
            let Some(name) = relative_name(container, &meta.location) else {
                continue;
            };
            if name == CONTAINER_MARKER || after.is_some_and(|after| name.as_str() <= after) {
                continue;
            }
            names.insert(name);
            if names.len() > max_results {
                names.pop_last();
                more = true;
            }
        }

        let continuation = if more {
            names.last().cloned().map(ContinuationToken::new)
        } else {
            None
        };
        Ok(BlobSegment::new(names.into_iter().collect(), continuation))
    }
}

/// Multipart-capable writer; the object appears only after `finish`.
struct ObjectDocumentSink {
    writer: BufWriter,
}

#[async_trait]
impl DocumentSink for ObjectDocumentSink {
    async fn write(&mut self, chunk: Bytes) -> Result<(), BlobError> {
        self.writer.write_all(&chunk).await?;
        Ok(())
    }

    async fn finish(self: Box<Self>) -> Result<(), BlobError> {
        let mut sink = self;
        sink.writer.shutdown().await?;
        Ok(())
    }

    async fn abort(self: Box<Self>) {
        let mut sink = self;
        if let Err(err) = sink.writer.abort().await {
            warn!(error = %err, "Failed to abort document upload");
        }
    }
}
