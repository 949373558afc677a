//! Backup exporter.
//!
//! Streams tables one at a time, one page at a time, into one document per
//! table. Each page is written to the object store as soon as it is read,
//! so memory use is bounded by a single page.

use std::io::Write;
use std::sync::Arc;

use bytes::Bytes;
use tracing::info;

use tablekeep_core::backup::{
    BackupDocumentName, BlobStore, DocumentSink, PageDocumentEncoder, PageStats, TransferError,
};
use tablekeep_core::storage::ContinuationToken;

use super::compression::Compressor;
use super::memory::MemoryProbe;
use super::stats::PageStatsWriter;
use crate::error::{Error, Result};
use crate::query::QueryExecutor;

/// What to back up and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOptions {
    pub container: String,
    /// Directory inside the container.
    pub path: Option<String>,
    /// Table names to skip, compared case-insensitively.
    pub excluded_tables: Vec<String>,
    /// Only tables whose name starts with this prefix are backed up.
    pub table_name_prefix: Option<String>,
    pub compress: bool,
}

impl BackupOptions {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            path: None,
            excluded_tables: Vec::new(),
            table_name_prefix: None,
            compress: true,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_excluded_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_tables = tables.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_table_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_name_prefix = Some(prefix.into());
        self
    }

    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Returns true if `table` passes the prefix filter and is not excluded.
    pub fn includes(&self, table: &str) -> bool {
        let matches_prefix = self
            .table_name_prefix
            .as_deref()
            .is_none_or(|prefix| table.starts_with(prefix));
        let lowercase = table.to_lowercase();
        let excluded = self
            .excluded_tables
            .iter()
            .any(|excluded| excluded.to_lowercase() == lowercase);
        matches_prefix && !excluded
    }
}

/// Outcome for one backed-up table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableBackup {
    pub table: String,
    pub document: String,
    pub pages: usize,
    pub records: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupSummary {
    pub tables: Vec<TableBackup>,
}

impl BackupSummary {
    pub fn total_records(&self) -> usize {
        self.tables.iter().map(|t| t.records).sum()
    }
}

pub struct BackupExporter {
    executor: QueryExecutor,
    blobs: Arc<dyn BlobStore>,
}

impl BackupExporter {
    pub fn new(executor: QueryExecutor, blobs: Arc<dyn BlobStore>) -> Self {
        Self { executor, blobs }
    }

    /// Backs up every selected table, in listing order.
    ///
    /// The first failing table aborts the run; its partial document is
    /// discarded and later tables are not attempted.
    pub async fn backup<W: Write + Send>(
        &self,
        options: &BackupOptions,
        stats: &mut PageStatsWriter<W>,
    ) -> Result<BackupSummary> {
        let tables: Vec<String> = self
            .executor
            .list_tables()
            .await?
            .into_iter()
            .filter(|table| options.includes(table))
            .collect();

        info!(
            container = %options.container,
            tables = tables.len(),
            compress = options.compress,
            "Starting backup"
        );

        if !self.blobs.container_exists(&options.container).await? {
            info!(container = %options.container, "Creating container");
            self.blobs.create_container(&options.container).await?;
        }

        let mut probe = MemoryProbe::new();
        let mut summary = BackupSummary::default();
        for table in tables {
            let backup = self
                .backup_table(&table, options, stats, &mut probe)
                .await
                .map_err(|source| Error::Backup {
                    table: table.clone(),
                    source,
                })?;
            summary.tables.push(backup);
        }

        info!(
            tables = summary.tables.len(),
            records = summary.total_records(),
            "Backup complete"
        );
        Ok(summary)
    }

    async fn backup_table<W: Write + Send>(
        &self,
        table: &str,
        options: &BackupOptions,
        stats: &mut PageStatsWriter<W>,
        probe: &mut MemoryProbe,
    ) -> std::result::Result<TableBackup, TransferError> {
        let document =
            BackupDocumentName::new(table, options.compress).to_path(options.path.as_deref());
        let mut sink = self
            .blobs
            .open_write(&options.container, &document)
            .await?;

        let written = self
            .write_document(table, sink.as_mut(), options.compress, stats, probe)
            .await;
        let finished: std::result::Result<(usize, usize), TransferError> = match written {
            Ok(counts) => sink.finish().await.map(|_| counts).map_err(Into::into),
            Err(err) => {
                sink.abort().await;
                Err(err)
            }
        };

        // Rows of a failed table are flushed too.
        let flushed = stats.flush();
        let (pages, records) = finished?;
        flushed?;
        info!(table, document = %document, pages, records, "Backed up table");

        Ok(TableBackup {
            table: table.to_string(),
            document,
            pages,
            records,
        })
    }

    async fn write_document<W: Write + Send>(
        &self,
        table: &str,
        sink: &mut dyn DocumentSink,
        compress: bool,
        stats: &mut PageStatsWriter<W>,
        probe: &mut MemoryProbe,
    ) -> std::result::Result<(usize, usize), TransferError> {
        let mut compressor = Compressor::new(compress);
        let mut encoder = PageDocumentEncoder::new();
        write_chunk(sink, compressor.compress(encoder.begin())?).await?;

        let mut records = 0;
        let mut continuation: Option<ContinuationToken> = None;
        loop {
            let page = self
                .executor
                .export_page(table, continuation.as_ref())
                .await?;

            // Empty pages carry no data and produce no stats row.
            if !page.items.is_empty() {
                let encoded = encoder.encode_page(&page.items)?;
                write_chunk(sink, compressor.compress(encoded)?).await?;

                records += page.items.len();
                let page_stats = PageStats {
                    table_name: table.to_string(),
                    page_index: encoder.pages_written(),
                    item_count: page.items.len(),
                    memory_footprint_bytes: probe.sample(),
                };
                stats.record(&page_stats)?;
                info!(
                    table,
                    page = page_stats.page_index,
                    items = page_stats.item_count,
                    memory_bytes = page_stats.memory_footprint_bytes,
                    "Exported page"
                );
            }

            continuation = page.continuation;
            if continuation.is_none() {
                break;
            }
        }

        let pages = encoder.pages_written();
        write_chunk(sink, compressor.compress(encoder.end())?).await?;
        write_chunk(sink, compressor.finish()?).await?;
        Ok((pages, records))
    }
}

async fn write_chunk(
    sink: &mut dyn DocumentSink,
    chunk: Bytes,
) -> std::result::Result<(), TransferError> {
    if !chunk.is_empty() {
        sink.write(chunk).await?;
    }
    Ok(())
}
