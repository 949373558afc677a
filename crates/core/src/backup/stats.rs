/// Header row of the page statistics sink.
pub const PAGE_STATS_HEADER: &str = "TableName,PageCounter,ItemCount,MemoryFootprint";

/// Telemetry for one exported page. Written, never read back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageStats {
    pub table_name: String,
    /// 1-based page counter within the table.
    pub page_index: usize,
    pub item_count: usize,
    /// Process resident memory when the page was written.
    pub memory_footprint_bytes: u64,
}

impl PageStats {
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{}",
            self.table_name, self.page_index, self.item_count, self.memory_footprint_bytes
        )
    }
}
