use async_trait::async_trait;

use super::types::{BatchOperation, ContinuationToken, KeyFilter, RecordPage, StoreRecord};
use super::Result;

/// Boundary to a wide-column store.
///
/// Backends map their SDK failures to [`StoreError`](super::StoreError); in
/// particular a missing table must surface as `StoreError::TableNotFound`.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Creates a table. With `if_not_exists`, an existing table is not an
    /// error.
    async fn create_table(&self, table: &str, if_not_exists: bool) -> Result<()>;

    /// Lists every table name, in the store's listing order.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Applies one operation to a batch of records sharing a partition key.
    /// The batch is atomic: either every record is written or none is.
    async fn execute_batch(
        &self,
        table: &str,
        operation: BatchOperation,
        records: &[StoreRecord],
    ) -> Result<()>;

    /// Reads one page of records matching `filter`.
    async fn query(
        &self,
        table: &str,
        filter: &KeyFilter,
        continuation: Option<&ContinuationToken>,
        page_size: usize,
    ) -> Result<RecordPage>;
}
