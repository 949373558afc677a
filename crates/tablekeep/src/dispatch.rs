//! Batch write dispatcher.
//!
//! Converts models to records, splits them into single-partition batches of
//! at most [`MAX_BATCH_SIZE`] and submits them in order. A missing table is
//! created and the call retried once when the context allows it.

use std::sync::Arc;

use tracing::{debug, warn};

use tablekeep_core::entity::{to_record, Entity, MapperRegistry};
use tablekeep_core::storage::{
    partition_batches, BatchOperation, StoreError, StoreRecord, TableStore, MAX_BATCH_SIZE,
};

use crate::context::ContextOptions;
use crate::error::Result;

#[derive(Clone)]
pub struct BatchDispatcher {
    store: Arc<dyn TableStore>,
    registry: Arc<MapperRegistry>,
    options: ContextOptions,
}

impl BatchDispatcher {
    pub fn new(
        store: Arc<dyn TableStore>,
        registry: Arc<MapperRegistry>,
        options: ContextOptions,
    ) -> Self {
        Self {
            store,
            registry,
            options,
        }
    }

    /// Writes `models` to the table mapped for `T`.
    pub async fn execute<T: Entity>(&self, operation: BatchOperation, models: &[T]) -> Result<()> {
        let mapping = self.registry.lookup::<T>()?;
        let table = self.options.table_name(mapping.table_name());
        let records = models
            .iter()
            .map(|model| to_record(model, mapping))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        self.write(&table, operation, records).await?;
        Ok(())
    }

    /// Replays raw records into `table` with insert-or-replace semantics.
    /// Returns the number of records written.
    pub async fn import_records(
        &self,
        table: &str,
        records: Vec<StoreRecord>,
    ) -> std::result::Result<usize, StoreError> {
        let count = records.len();
        self.write(table, BatchOperation::InsertOrReplace, records)
            .await?;
        Ok(count)
    }

    /// Creates `table` unless it already exists.
    pub async fn ensure_table(&self, table: &str) -> std::result::Result<(), StoreError> {
        self.store.create_table(table, true).await
    }

    async fn write(
        &self,
        table: &str,
        operation: BatchOperation,
        records: Vec<StoreRecord>,
    ) -> std::result::Result<(), StoreError> {
        let batches = partition_batches(records, MAX_BATCH_SIZE);

        match self.submit(table, operation, &batches).await {
            Err(err) if err.is_table_not_found() && self.options.auto_create_tables => {
                warn!(table, "Table not found, creating it and retrying");
                self.store.create_table(table, true).await?;
                self.submit(table, operation, &batches).await
            }
            result => result,
        }
    }

    async fn submit(
        &self,
        table: &str,
        operation: BatchOperation,
        batches: &[Vec<StoreRecord>],
    ) -> std::result::Result<(), StoreError> {
        for batch in batches {
            debug!(
                table,
                operation = %operation,
                records = batch.len(),
                "Submitting batch"
            );
            self.store.execute_batch(table, operation, batch).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tablekeep_core::entity::EntityMapping;
    use tablekeep_core::storage::{ContinuationToken, KeyFilter, RecordPage, Result as StoreResult};

    use crate::storage::InMemoryTableStore;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Order {
        customer: String,
        number: i64,
        total: f64,
    }

    tablekeep_core::impl_entity!(Order {
        customer => "Customer",
        number => "Number",
        total => "Total",
    });

    /// Counts calls into the wrapped store.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryTableStore,
        creates: AtomicUsize,
        batches: AtomicUsize,
        /// Reports every table as missing, even after it was created.
        always_missing: bool,
    }

    #[async_trait]
    impl TableStore for CountingStore {
        async fn create_table(&self, table: &str, if_not_exists: bool) -> StoreResult<()> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            self.inner.create_table(table, if_not_exists).await
        }

        async fn list_tables(&self) -> StoreResult<Vec<String>> {
            self.inner.list_tables().await
        }

        async fn execute_batch(
            &self,
            table: &str,
            operation: BatchOperation,
            records: &[StoreRecord],
        ) -> StoreResult<()> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            if self.always_missing {
                return Err(StoreError::TableNotFound {
                    table: table.to_string(),
                });
            }
            self.inner.execute_batch(table, operation, records).await
        }

        async fn query(
            &self,
            table: &str,
            filter: &KeyFilter,
            continuation: Option<&ContinuationToken>,
            page_size: usize,
        ) -> StoreResult<RecordPage> {
            self.inner.query(table, filter, continuation, page_size).await
        }
    }

    fn registry() -> Arc<MapperRegistry> {
        let mut builder = MapperRegistry::builder();
        builder
            .register::<Order>(EntityMapping::new("Orders", "Customer", "Number").unwrap())
            .unwrap();
        Arc::new(builder.build())
    }

    fn dispatcher(store: Arc<CountingStore>, auto_create_tables: bool) -> BatchDispatcher {
        let options = ContextOptions::default().with_auto_create_tables(auto_create_tables);
        BatchDispatcher::new(store, registry(), options)
    }

    fn orders(customer: &str, count: i64) -> Vec<Order> {
        (0..count)
            .map(|number| Order {
                customer: customer.to_string(),
                number,
                total: number as f64 * 1.5,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_auto_create_retries_once() {
        let store = Arc::new(CountingStore::default());
        let dispatcher = dispatcher(store.clone(), true);

        dispatcher
            .execute(BatchOperation::Insert, &orders("acme", 3))
            .await
            .unwrap();

        assert_eq!(store.creates.load(Ordering::SeqCst), 1);
        assert_eq!(store.batches.load(Ordering::SeqCst), 2);
        assert_eq!(store.inner.record_count("Orders").await, Some(3));
    }

    #[tokio::test]
    async fn test_retry_happens_at_most_once() {
        let store = Arc::new(CountingStore {
            always_missing: true,
            ..CountingStore::default()
        });
        let dispatcher = dispatcher(store.clone(), true);

        let result = dispatcher
            .execute(BatchOperation::Insert, &orders("acme", 3))
            .await;

        assert!(matches!(
            result,
            Err(crate::Error::Store(StoreError::TableNotFound { .. }))
        ));
        assert_eq!(store.creates.load(Ordering::SeqCst), 1);
        assert_eq!(store.batches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_table_without_auto_create_fails_immediately() {
        let store = Arc::new(CountingStore::default());
        let dispatcher = dispatcher(store.clone(), false);

        let result = dispatcher
            .execute(BatchOperation::Insert, &orders("acme", 3))
            .await;

        assert!(result.unwrap_err().is_table_not_found());
        assert_eq!(store.creates.load(Ordering::SeqCst), 0);
        assert_eq!(store.batches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_splits_by_partition_and_size() {
        let store = Arc::new(CountingStore::default());
        store.inner.create_table("Orders", false).await.unwrap();
        let dispatcher = dispatcher(store.clone(), false);

        let mut models = orders("acme", 150);
        models.extend(orders("globex", 2));
        dispatcher
            .execute(BatchOperation::InsertOrReplace, &models)
            .await
            .unwrap();

        assert_eq!(store.batches.load(Ordering::SeqCst), 3);
        assert_eq!(store.inner.record_count("Orders").await, Some(152));
    }

    #[tokio::test]
    async fn test_other_errors_propagate_unchanged() {
        let store = Arc::new(CountingStore::default());
        store.inner.create_table("Orders", false).await.unwrap();
        let dispatcher = dispatcher(store.clone(), true);

        dispatcher
            .execute(BatchOperation::Insert, &orders("acme", 1))
            .await
            .unwrap();
        let result = dispatcher
            .execute(BatchOperation::Insert, &orders("acme", 1))
            .await;

        assert!(matches!(
            result,
            Err(crate::Error::Store(StoreError::RecordExists { .. }))
        ));
        assert_eq!(store.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unregistered_type() {
        #[derive(Debug, Default)]
        struct Stray {
            name: String,
        }
        tablekeep_core::impl_entity!(Stray { name => "Name" });

        let store = Arc::new(CountingStore::default());
        let result = dispatcher(store, true)
            .execute(BatchOperation::Insert, &[Stray::default()])
            .await;
        assert!(matches!(result, Err(crate::Error::Mapping(_))));
    }

    #[tokio::test]
    async fn test_import_records_and_ensure_table() {
        let store = Arc::new(CountingStore::default());
        let dispatcher = dispatcher(store.clone(), false);

        dispatcher.ensure_table("Restored").await.unwrap();
        dispatcher.ensure_table("Restored").await.unwrap();
        let written = dispatcher
            .import_records(
                "Restored",
                vec![StoreRecord::new("a", "1"), StoreRecord::new("b", "1")],
            )
            .await
            .unwrap();

        assert_eq!(written, 2);
        assert_eq!(store.inner.record_count("Restored").await, Some(2));
    }
}
