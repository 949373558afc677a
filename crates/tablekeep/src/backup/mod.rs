//! Streaming backup and restore between a table store and a blob store.
//!
//! Documents are written and read page by page; neither side ever holds a
//! whole table in memory.

mod compression;
mod exporter;
mod importer;
mod memory;
mod stats;

pub use compression::{Compressor, Decompressor};
pub use exporter::{BackupExporter, BackupOptions, BackupSummary, TableBackup};
pub use importer::{
    DocumentRestore, RestoreImporter, RestoreOptions, RestoreSummary, DEFAULT_SEGMENT_SIZE,
};
pub use memory::MemoryProbe;
pub use stats::PageStatsWriter;
