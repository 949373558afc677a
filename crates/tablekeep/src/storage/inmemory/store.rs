use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use tablekeep_core::storage::{
    is_single_partition, BatchOperation, ContinuationToken, KeyFilter, RecordPage, Result,
    StoreError, StoreRecord, TableStore, MAX_BATCH_SIZE,
};

type RecordKey = (String, String);
type Table = BTreeMap<RecordKey, StoreRecord>;

/// In-memory [`TableStore`].
///
/// Batches are validated in full before any record is written, so a failed
/// batch leaves the table untouched.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTableStore {
    tables: Arc<RwLock<BTreeMap<String, Table>>>,
}

impl InMemoryTableStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in `table`, or `None` if the table does not exist.
    pub async fn record_count(&self, table: &str) -> Option<usize> {
        self.tables.read().await.get(table).map(BTreeMap::len)
    }
}

fn encode_token(key: &RecordKey) -> Result<ContinuationToken> {
    serde_json::to_string(key)
        .map(ContinuationToken::new)
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode_token(token: &ContinuationToken) -> Result<RecordKey> {
    serde_json::from_str(token.as_str())
        .map_err(|_| StoreError::RequestFailed("Invalid continuation token".to_string()))
}

fn validate_batch(table: &Table, operation: BatchOperation, records: &[StoreRecord]) -> Result<()> {
    if records.len() > MAX_BATCH_SIZE {
        return Err(StoreError::InvalidBatch(format!(
            "{} records exceed the maximum of {MAX_BATCH_SIZE}",
            records.len()
        )));
    }
    if !is_single_partition(records) {
        return Err(StoreError::InvalidBatch(
            "records span more than one partition".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for record in records {
        let key = (record.partition_key.clone(), record.row_key.clone());
        let exists = table.contains_key(&key);
        if !seen.insert(key) {
            return Err(StoreError::InvalidBatch(format!(
                "duplicate key {}/{}",
                record.partition_key, record.row_key
            )));
        }
        match operation {
            BatchOperation::Insert if exists => {
                return Err(StoreError::RecordExists {
                    partition_key: record.partition_key.clone(),
                    row_key: record.row_key.clone(),
                });
            }
            BatchOperation::Merge if !exists => {
                return Err(StoreError::RecordNotFound {
                    partition_key: record.partition_key.clone(),
                    row_key: record.row_key.clone(),
                });
            }
            _ => {}
        }
    }
    Ok(())
}

#[async_trait]
impl TableStore for InMemoryTableStore {
    async fn create_table(&self, table: &str, if_not_exists: bool) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.contains_key(table) {
            if if_not_exists {
                return Ok(());
            }
            return Err(StoreError::TableAlreadyExists {
                table: table.to_string(),
            });
        }
        tables.insert(table.to_string(), Table::new());
        Ok(())
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.tables.read().await.keys().cloned().collect())
    }

    async fn execute_batch(
        &self,
        table: &str,
        operation: BatchOperation,
        records: &[StoreRecord],
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound {
                table: table.to_string(),
            })?;

        validate_batch(rows, operation, records)?;

        for record in records {
            let key = (record.partition_key.clone(), record.row_key.clone());
            let etag = Some(Uuid::new_v4().to_string());
            match operation {
                BatchOperation::Insert | BatchOperation::InsertOrReplace => {
                    let mut stored = record.clone();
                    stored.etag = etag;
                    rows.insert(key, stored);
                }
                BatchOperation::Merge | BatchOperation::MergeOrInsert => {
                    let stored = rows.entry(key).or_insert_with(|| {
                        StoreRecord::new(record.partition_key.clone(), record.row_key.clone())
                    });
                    stored
                        .properties
                        .extend(record.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
                    stored.etag = etag;
                }
            }
        }
        Ok(())
    }

    async fn query(
        &self,
        table: &str,
        filter: &KeyFilter,
        continuation: Option<&ContinuationToken>,
        page_size: usize,
    ) -> Result<RecordPage> {
        let tables = self.tables.read().await;
        let rows = tables.get(table).ok_or_else(|| StoreError::TableNotFound {
            table: table.to_string(),
        })?;

        let start = match continuation {
            Some(token) => Bound::Excluded(decode_token(token)?),
            None => Bound::Unbounded,
        };
        let page_size = page_size.max(1);

        let mut matching = rows
            .range((start, Bound::Unbounded))
            .map(|(_, record)| record)
            .filter(|record| filter.matches(record));
        let items: Vec<StoreRecord> = matching.by_ref().take(page_size).cloned().collect();

        let continuation = match items.last() {
            Some(last) if items.len() == page_size && matching.next().is_some() => Some(
                encode_token(&(last.partition_key.clone(), last.row_key.clone()))?,
            ),
            _ => None,
        };

        Ok(RecordPage::new(items, continuation))
    }
}
