use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tablekeep_core::backup::{PageStats, PAGE_STATS_HEADER};

/// Append-only CSV sink for page statistics. The header row is written on
/// creation.
pub struct PageStatsWriter<W: Write> {
    out: W,
    rows: usize,
}

impl PageStatsWriter<BufWriter<File>> {
    /// Creates (or truncates) the CSV file at `path`.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> PageStatsWriter<W> {
    pub fn new(mut out: W) -> io::Result<Self> {
        writeln!(out, "{PAGE_STATS_HEADER}")?;
        Ok(Self { out, rows: 0 })
    }

    pub fn record(&mut self, stats: &PageStats) -> io::Result<()> {
        writeln!(self.out, "{}", stats.to_csv_row())?;
        self.rows += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    /// Rows written so far, header excluded.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_then_rows() {
        let mut writer = PageStatsWriter::new(Vec::new()).unwrap();
        writer
            .record(&PageStats {
                table_name: "People".to_string(),
                page_index: 1,
                item_count: 2,
                memory_footprint_bytes: 1024,
            })
            .unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.rows(), 1);

        let csv = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(
            csv,
            "TableName,PageCounter,ItemCount,MemoryFootprint\nPeople,1,2,1024\n"
        );
    }

    #[test]
    fn test_empty_sink_has_only_header() {
        let writer = PageStatsWriter::new(Vec::new()).unwrap();
        assert_eq!(
            String::from_utf8(writer.into_inner()).unwrap(),
            "TableName,PageCounter,ItemCount,MemoryFootprint\n"
        );
    }
}
