//! Storage context.
//!
//! A context ties a table store to a finished mapper registry. The registry
//! is built (and therefore frozen) before the context exists, so writes and
//! queries never race with registration.

use std::sync::Arc;

use futures_util::Stream;

use tablekeep_core::entity::{Entity, MapperRegistry};
use tablekeep_core::storage::{BatchOperation, ContinuationToken, Page, TableStore, DEFAULT_PAGE_SIZE};

use crate::dispatch::BatchDispatcher;
use crate::error::Result;
use crate::query::QueryExecutor;

/// Behaviour switches for a [`StorageContext`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextOptions {
    /// Create a missing table on write and retry once.
    pub auto_create_tables: bool,
    /// Prepended to every mapped table name.
    pub table_name_prefix: Option<String>,
    /// Records requested per store page.
    pub page_size: usize,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            auto_create_tables: false,
            table_name_prefix: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ContextOptions {
    pub fn with_auto_create_tables(mut self, enabled: bool) -> Self {
        self.auto_create_tables = enabled;
        self
    }

    pub fn with_table_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_name_prefix = Some(prefix.into());
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Physical table name for a mapped table.
    pub fn table_name(&self, mapped: &str) -> String {
        match &self.table_name_prefix {
            Some(prefix) => format!("{prefix}{mapped}"),
            None => mapped.to_string(),
        }
    }
}

/// Entry point for mapped writes and queries against one store.
#[derive(Clone)]
pub struct StorageContext {
    store: Arc<dyn TableStore>,
    registry: Arc<MapperRegistry>,
    options: ContextOptions,
}

impl StorageContext {
    pub fn new(store: Arc<dyn TableStore>, registry: MapperRegistry, options: ContextOptions) -> Self {
        Self::with_shared_registry(store, Arc::new(registry), options)
    }

    /// Creates a context sharing a registry with other contexts.
    pub fn with_shared_registry(
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

    pub fn store(&self) -> &Arc<dyn TableStore> {
        &self.store
    }

    pub fn registry(&self) -> &MapperRegistry {
        &self.registry
    }

    pub fn options(&self) -> &ContextOptions {
        &self.options
    }

    /// Physical table name for `T`, including the context prefix.
    pub fn table_name<T: Entity>(&self) -> Result<String> {
        let mapping = self.registry.lookup::<T>()?;
        Ok(self.options.table_name(mapping.table_name()))
    }

    pub fn dispatcher(&self) -> BatchDispatcher {
        BatchDispatcher::new(
            self.store.clone(),
            self.registry.clone(),
            self.options.clone(),
        )
    }

    pub fn executor(&self) -> QueryExecutor {
        QueryExecutor::new(
            self.store.clone(),
            self.registry.clone(),
            self.options.clone(),
        )
    }

    pub async fn execute<T: Entity>(&self, operation: BatchOperation, models: &[T]) -> Result<()> {
        self.dispatcher().execute(operation, models).await
    }

    pub async fn insert<T: Entity>(&self, model: &T) -> Result<()> {
        self.execute(BatchOperation::Insert, std::slice::from_ref(model))
            .await
    }

    pub async fn insert_or_replace<T: Entity>(&self, model: &T) -> Result<()> {
        self.execute(BatchOperation::InsertOrReplace, std::slice::from_ref(model))
            .await
    }

    pub async fn merge<T: Entity>(&self, model: &T) -> Result<()> {
        self.execute(BatchOperation::Merge, std::slice::from_ref(model))
            .await
    }

    pub async fn merge_or_insert<T: Entity>(&self, model: &T) -> Result<()> {
        self.execute(BatchOperation::MergeOrInsert, std::slice::from_ref(model))
            .await
    }

    pub async fn query<T: Entity>(
        &self,
        partition_key: Option<&str>,
        row_key: Option<&str>,
        continuation: Option<&ContinuationToken>,
    ) -> Result<Page<T>> {
        self.executor()
            .query(partition_key, row_key, continuation)
            .await
    }

    pub async fn query_single<T: Entity>(&self, partition_key: &str, row_key: &str) -> Result<Option<T>> {
        self.executor().query_single(partition_key, row_key).await
    }

    /// Streams every matching `T` across pages.
    pub fn query_all<'a, T: Entity>(
        &'a self,
        partition_key: Option<&'a str>,
        row_key: Option<&'a str>,
    ) -> impl Stream<Item = Result<T>> + 'a {
        async_stream::stream! {
            let executor = self.executor();
            let items = executor.query_all::<T>(partition_key, row_key);
            futures_util::pin_mut!(items);
            while let Some(item) = futures_util::StreamExt::next(&mut items).await {
                yield item;
            }
        }
    }
}
