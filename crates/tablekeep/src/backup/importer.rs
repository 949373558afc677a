//! Restore importer.
//!
//! Walks a container one listing segment at a time and replays every backup
//! document into its destination table, one decoded page per batch write.

use std::sync::Arc;

use tokio_stream::StreamExt;
use tracing::{info, warn};

use tablekeep_core::backup::{BackupDocumentName, BlobStore, PageDocumentDecoder, TransferError};
use tablekeep_core::storage::{ContinuationToken, StoreRecord};

use super::compression::Decompressor;
use crate::dispatch::BatchDispatcher;
use crate::error::{Error, Result};

/// Names requested per listing segment.
pub const DEFAULT_SEGMENT_SIZE: usize = 1_000;

/// Where to restore from and how to name destination tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreOptions {
    pub container: String,
    /// Directory inside the container.
    pub path: Option<String>,
    /// Prepended to every recovered table name.
    pub table_name_prefix: Option<String>,
    pub segment_size: usize,
}

impl RestoreOptions {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            path: None,
            table_name_prefix: None,
            segment_size: DEFAULT_SEGMENT_SIZE,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_table_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_name_prefix = Some(prefix.into());
        self
    }

    pub fn with_segment_size(mut self, segment_size: usize) -> Self {
        self.segment_size = segment_size.max(1);
        self
    }
}

/// Outcome for one restored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRestore {
    pub document: String,
    pub table: String,
    pub pages: usize,
    pub records: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    pub documents: Vec<DocumentRestore>,
    /// Listing segments requested.
    pub segments: usize,
    /// Names that were not backup documents.
    pub skipped: Vec<String>,
}

impl RestoreSummary {
    pub fn total_records(&self) -> usize {
        self.documents.iter().map(|d| d.records).sum()
    }
}

pub struct RestoreImporter {
    dispatcher: BatchDispatcher,
    blobs: Arc<dyn BlobStore>,
}

impl RestoreImporter {
    pub fn new(dispatcher: BatchDispatcher, blobs: Arc<dyn BlobStore>) -> Self {
        Self { dispatcher, blobs }
    }

    /// Restores every backup document in the container.
    ///
    /// A missing container is reported and treated as empty. The first
    /// failing document aborts the run.
    pub async fn restore(&self, options: &RestoreOptions) -> Result<RestoreSummary> {
        let mut summary = RestoreSummary::default();

        if !self.blobs.container_exists(&options.container).await? {
            warn!(container = %options.container, "Container does not exist, nothing to restore");
            return Ok(summary);
        }

        info!(container = %options.container, "Starting restore");

        let mut continuation: Option<ContinuationToken> = None;
        loop {
            let segment = self
                .blobs
                .list_segment(
                    &options.container,
                    options.path.as_deref(),
                    continuation.as_ref(),
                    options.segment_size,
                )
                .await
                .map_err(|err| Error::Restore {
                    document: options.path.clone().unwrap_or_default(),
                    source: err.into(),
                })?;
            summary.segments += 1;

            for document in segment.items {
                let Some(name) = BackupDocumentName::parse(&document) else {
                    warn!(document = %document, "Skipping non-backup document");
                    summary.skipped.push(document);
                    continue;
                };

                let restored = self
                    .restore_document(&document, &name, options)
                    .await
                    .map_err(|source| Error::Restore {
                        document: document.clone(),
                        source,
                    })?;
                summary.documents.push(restored);
            }

            continuation = segment.continuation;
            if continuation.is_none() {
                break;
            }
        }

        info!(
            documents = summary.documents.len(),
            records = summary.total_records(),
            segments = summary.segments,
            "Restore complete"
        );
        Ok(summary)
    }

    async fn restore_document(
        &self,
        document: &str,
        name: &BackupDocumentName,
        options: &RestoreOptions,
    ) -> std::result::Result<DocumentRestore, TransferError> {
        let table = name.destination_table(options.table_name_prefix.as_deref());
        self.dispatcher.ensure_table(&table).await?;

        let mut stream = self.blobs.open_read(&options.container, document).await?;
        let mut decompressor = Decompressor::new(name.compressed);
        let mut decoder = PageDocumentDecoder::new();
        let mut restored = DocumentRestore {
            document: document.to_string(),
            table: table.clone(),
            pages: 0,
            records: 0,
        };

        while let Some(chunk) = stream.next().await {
            let data = decompressor.decompress(&chunk?)?;
            for page in decoder.push(&data)? {
                self.import_page(&mut restored, page).await?;
            }
        }

        let tail = decompressor.finish()?;
        for page in decoder.push(&tail)? {
            self.import_page(&mut restored, page).await?;
        }
        if let Some(page) = decoder.finish()? {
            self.import_page(&mut restored, page).await?;
        }

        info!(
            document,
            table = %restored.table,
            pages = restored.pages,
            records = restored.records,
            "Restored document"
        );
        Ok(restored)
    }

    async fn import_page(
        &self,
        restored: &mut DocumentRestore,
        page: Vec<StoreRecord>,
    ) -> std::result::Result<(), TransferError> {
        let count = self
            .dispatcher
            .import_records(&restored.table, page)
            .await?;
        restored.pages += 1;
        restored.records += count;
        info!(
            table = %restored.table,
            page = restored.pages,
            items = count,
            "Imported page"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_size_is_at_least_one() {
        let options = RestoreOptions::new("backups").with_segment_size(0);
        assert_eq!(options.segment_size, 1);
        assert_eq!(RestoreOptions::new("backups").segment_size, DEFAULT_SEGMENT_SIZE);
    }
}
