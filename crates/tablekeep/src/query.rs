//! Query executor.
//!
//! Every call reads exactly one page and hands back the continuation token;
//! [`QueryExecutor::query_all`] is the only place that follows tokens on the
//! caller's behalf.

use std::sync::Arc;

use futures_util::Stream;

use tablekeep_core::entity::{to_model, Entity, MapperRegistry};
use tablekeep_core::storage::{
    ContinuationToken, KeyFilter, Page, RecordPage, Result as StoreResult, TableStore,
};

use crate::context::ContextOptions;
use crate::error::Result;

#[derive(Clone)]
pub struct QueryExecutor {
    store: Arc<dyn TableStore>,
    registry: Arc<MapperRegistry>,
    options: ContextOptions,
}

impl QueryExecutor {
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

    /// Reads one page of `T`.
    ///
    /// Both keys select one record, a partition key alone selects its
    /// partition and no key scans the table. A row key without a partition
    /// key is rejected before the store is called.
    pub async fn query<T: Entity>(
        &self,
        partition_key: Option<&str>,
        row_key: Option<&str>,
        continuation: Option<&ContinuationToken>,
    ) -> Result<Page<T>> {
        let filter = KeyFilter::from_keys(partition_key, row_key)?;
        let mapping = self.registry.lookup::<T>()?;
        let table = self.options.table_name(mapping.table_name());

        let page = self
            .store
            .query(&table, &filter, continuation, self.options.page_size)
            .await?;
        Ok(page.try_map(|record| to_model(&record, mapping))?)
    }

    /// Reads the record with the given keys, if any.
    pub async fn query_single<T: Entity>(
        &self,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Option<T>> {
        let page = self
            .query::<T>(Some(partition_key), Some(row_key), None)
            .await?;
        Ok(page.items.into_iter().next())
    }

    /// Streams every matching `T`, following continuation tokens until the
    /// store reports the last page. The stream ends after the first error.
    pub fn query_all<'a, T: Entity>(
        &'a self,
        partition_key: Option<&'a str>,
        row_key: Option<&'a str>,
    ) -> impl Stream<Item = Result<T>> + 'a {
        async_stream::stream! {
            let mut continuation: Option<ContinuationToken> = None;
            loop {
                match self.query::<T>(partition_key, row_key, continuation.as_ref()).await {
                    Ok(page) => {
                        for item in page.items {
                            yield Ok(item);
                        }
                        continuation = page.continuation;
                        if continuation.is_none() {
                            break;
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        }
    }

    /// Reads one page of raw records from `table`, for export.
    ///
    /// `table` is used as given; the context's table name prefix does not
    /// apply.
    pub async fn export_page(
        &self,
        table: &str,
        continuation: Option<&ContinuationToken>,
    ) -> StoreResult<RecordPage> {
        self.store
            .query(table, &KeyFilter::All, continuation, self.options.page_size)
            .await
    }

    /// Lists every table known to the store.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.store.list_tables().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use tablekeep_core::entity::{EntityMapping, Storable, StorableDescriptor};
    use tablekeep_core::storage::{BatchOperation, QueryError, StoreError};

    use crate::dispatch::BatchDispatcher;
    use crate::storage::InMemoryTableStore;
    use crate::Error;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Reading {
        sensor: String,
        sequence: i64,
        value: f64,
    }

    tablekeep_core::impl_entity!(Reading {
        sensor => "Sensor",
        sequence => "Sequence",
        value => "Value",
    });

    impl Storable for Reading {
        fn storable() -> StorableDescriptor {
            StorableDescriptor::new()
                .table("Readings")
                .partition_key("Sensor")
                .virtual_row_key("{{Sequence}}")
        }
    }

    async fn seeded(page_size: usize) -> (QueryExecutor, Vec<Reading>) {
        let store: Arc<dyn TableStore> = Arc::new(InMemoryTableStore::new());
        let mut builder = MapperRegistry::builder();
        builder.discover::<Reading>().unwrap();
        let registry = Arc::new(builder.build());
        let options = ContextOptions::default()
            .with_auto_create_tables(true)
            .with_page_size(page_size);

        let readings: Vec<Reading> = ["north", "south"]
            .iter()
            .flat_map(|sensor| {
                (1..=3).map(move |sequence| Reading {
                    sensor: sensor.to_string(),
                    sequence,
                    value: sequence as f64 / 2.0,
                })
            })
            .collect();

        BatchDispatcher::new(store.clone(), registry.clone(), options.clone())
            .execute(BatchOperation::Insert, &readings)
            .await
            .unwrap();

        (QueryExecutor::new(store, registry, options), readings)
    }

    #[tokio::test]
    async fn test_query_single() {
        let (executor, readings) = seeded(10).await;
        let found: Option<Reading> = executor.query_single("south", "2").await.unwrap();
        assert_eq!(found.as_ref(), Some(&readings[4]));

        let missing: Option<Reading> = executor.query_single("south", "9").await.unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn test_query_partition_returns_one_page() {
        let (executor, _) = seeded(2).await;
        let page: Page<Reading> = executor.query(Some("north"), None, None).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.continuation.is_some());

        let next: Page<Reading> = executor
            .query(Some("north"), None, page.continuation.as_ref())
            .await
            .unwrap();
        assert_eq!(next.items.len(), 1);
        assert!(next.is_last());
    }

    #[tokio::test]
    async fn test_row_key_alone_is_rejected() {
        let (executor, _) = seeded(10).await;
        let result = executor.query::<Reading>(None, Some("1"), None).await;
        assert!(matches!(
            result,
            Err(Error::Query(QueryError::InvalidFilterCombination))
        ));
    }

    #[tokio::test]
    async fn test_query_all_follows_tokens() {
        let (executor, readings) = seeded(4).await;
        let all: Vec<Reading> = executor
            .query_all::<Reading>(None, None)
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(all, readings);
    }

    #[tokio::test]
    async fn test_export_page_and_list_tables() {
        let (executor, _) = seeded(10).await;
        assert_eq!(executor.list_tables().await.unwrap(), vec!["Readings"]);

        let page = executor.export_page("Readings", None).await.unwrap();
        assert_eq!(page.items.len(), 6);
        assert!(page.is_last());

        let missing = executor.export_page("Nope", None).await;
        assert!(matches!(missing, Err(StoreError::TableNotFound { .. })));
    }

    #[tokio::test]
    async fn test_table_prefix_applies_to_mapped_queries() {
        let store: Arc<dyn TableStore> = Arc::new(InMemoryTableStore::new());
        let mut builder = MapperRegistry::builder();
        builder
            .register::<Reading>(EntityMapping::new("Readings", "Sensor", "Sequence").unwrap())
            .unwrap();
        let registry = Arc::new(builder.build());
        let options = ContextOptions::default()
            .with_auto_create_tables(true)
            .with_table_name_prefix("test");

        BatchDispatcher::new(store.clone(), registry.clone(), options.clone())
            .execute(
                BatchOperation::Insert,
                &[Reading {
                    sensor: "east".to_string(),
                    sequence: 1,
                    value: 0.5,
                }],
            )
            .await
            .unwrap();

        assert_eq!(store.list_tables().await.unwrap(), vec!["testReadings"]);
        let executor = QueryExecutor::new(store, registry, options);
        let found: Option<Reading> = executor.query_single("east", "1").await.unwrap();
        assert!(found.is_some());
    }
}
