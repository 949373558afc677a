//! DynamoDB table store implementation.
//!
//! Implements `TableStore` from `tablekeep_core::storage` using DynamoDB.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, BillingMode, ConditionCheck, KeySchemaElement, KeyType,
    Put, ScalarAttributeType, TableStatus, TransactWriteItem, Update,
};
use aws_sdk_dynamodb::Client;
use tracing::{debug, info};

use tablekeep_core::storage::{
    is_single_partition, BatchOperation, ContinuationToken, KeyFilter, RecordPage, Result,
    StoreError, StoreRecord, TableStore, MAX_BATCH_SIZE,
};

use super::conversions::{item_to_record, property_to_attribute, record_to_item};
use super::error::{
    map_build_error, map_create_table_error, map_describe_table_error, map_list_tables_error,
    map_query_error, map_scan_error, map_transact_write_error,
};
use super::keys::{self, PARTITION_KEY, ROW_KEY};
use crate::config::AwsConfig;

const TABLE_ACTIVE_MAX_ATTEMPTS: usize = 60;
const TABLE_ACTIVE_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Attribute removed by an empty merge-or-insert, so the update still
/// creates the item.
const TOUCH_ATTRIBUTE: &str = "__touch";

/// DynamoDB-based table store.
#[derive(Debug, Clone)]
pub struct DynamoDbTableStore {
    client: Client,
}

impl DynamoDbTableStore {
    /// Creates a store over an existing DynamoDB client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates a store from AWS configuration.
    ///
    /// Uses the AWS SDK default credential chain. A custom endpoint targets
    /// a local DynamoDB.
    pub async fn from_config(config: &AwsConfig) -> Self {
        let mut sdk_config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        if let Some(endpoint) = &config.endpoint_url {
            sdk_config_loader = sdk_config_loader.endpoint_url(endpoint);
        }

        let sdk_config = sdk_config_loader.load().await;
        Self::new(Client::new(&sdk_config))
    }

    async fn wait_for_table_active(&self, table: &str) -> Result<()> {
        for _ in 0..TABLE_ACTIVE_MAX_ATTEMPTS {
            let response = self
                .client
                .describe_table()
                .table_name(table)
                .send()
                .await
                .map_err(|e| map_describe_table_error(e, table))?;

            let status = response.table().and_then(|t| t.table_status());
            if status == Some(&TableStatus::Active) {
                return Ok(());
            }
            tokio::time::sleep(TABLE_ACTIVE_POLL_INTERVAL).await;
        }

        Err(StoreError::RequestFailed(format!(
            "Table {table} did not become active"
        )))
    }
}

/// Builds the transaction item applying `operation` to one record.
fn transact_item(
    table: &str,
    operation: BatchOperation,
    record: &StoreRecord,
) -> Result<TransactWriteItem> {
    let exists = format!("attribute_exists({PARTITION_KEY})");

    match operation {
        BatchOperation::Insert | BatchOperation::InsertOrReplace => {
            let mut put = Put::builder()
                .table_name(table)
                .set_item(Some(record_to_item(record)?));
            if operation == BatchOperation::Insert {
                put = put.condition_expression(format!("attribute_not_exists({PARTITION_KEY})"));
            }
            Ok(TransactWriteItem::builder()
                .put(put.build().map_err(map_build_error)?)
                .build())
        }
        BatchOperation::Merge if record.properties.is_empty() => {
            let check = ConditionCheck::builder()
                .table_name(table)
                .set_key(Some(keys::key_map(&record.partition_key, &record.row_key)))
                .condition_expression(exists)
                .build()
                .map_err(map_build_error)?;
            Ok(TransactWriteItem::builder().condition_check(check).build())
        }
        BatchOperation::Merge | BatchOperation::MergeOrInsert => {
            let mut names = HashMap::new();
            let mut values = HashMap::new();
            let mut assignments = Vec::with_capacity(record.properties.len());
            for (i, (name, value)) in record.properties.iter().enumerate() {
                if name == PARTITION_KEY || name == ROW_KEY {
                    return Err(StoreError::Serialization(format!(
                        "Property name '{name}' is reserved for the key"
                    )));
                }
                names.insert(format!("#p{i}"), name.clone());
                values.insert(format!(":v{i}"), property_to_attribute(value)?);
                assignments.push(format!("#p{i} = :v{i}"));
            }

            let mut update = Update::builder()
                .table_name(table)
                .set_key(Some(keys::key_map(&record.partition_key, &record.row_key)));
            update = if assignments.is_empty() {
                update
                    .update_expression("REMOVE #touch")
                    .expression_attribute_names("#touch", TOUCH_ATTRIBUTE)
            } else {
                update
                    .update_expression(format!("SET {}", assignments.join(", ")))
                    .set_expression_attribute_names(Some(names))
                    .set_expression_attribute_values(Some(values))
            };
            if operation == BatchOperation::Merge {
                update = update.condition_expression(exists);
            }
            Ok(TransactWriteItem::builder()
                .update(update.build().map_err(map_build_error)?)
                .build())
        }
    }
}

#[async_trait]
impl TableStore for DynamoDbTableStore {
    async fn create_table(&self, table: &str, if_not_exists: bool) -> Result<()> {
        let key_schema = vec![
            KeySchemaElement::builder()
                .attribute_name(PARTITION_KEY)
                .key_type(KeyType::Hash)
                .build()
                .map_err(map_build_error)?,
            KeySchemaElement::builder()
                .attribute_name(ROW_KEY)
                .key_type(KeyType::Range)
                .build()
                .map_err(map_build_error)?,
        ];
        let attribute_definitions = vec![
            AttributeDefinition::builder()
                .attribute_name(PARTITION_KEY)
                .attribute_type(ScalarAttributeType::S)
                .build()
                .map_err(map_build_error)?,
            AttributeDefinition::builder()
                .attribute_name(ROW_KEY)
                .attribute_type(ScalarAttributeType::S)
                .build()
                .map_err(map_build_error)?,
        ];

        let result = self
            .client
            .create_table()
            .table_name(table)
            .set_key_schema(Some(key_schema))
            .set_attribute_definitions(Some(attribute_definitions))
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await;

        match result {
            Ok(_) => info!(table, "Created table"),
            Err(err) => match map_create_table_error(err, table) {
                StoreError::TableAlreadyExists { .. } if if_not_exists => {
                    debug!(table, "Table already exists");
                }
                err => return Err(err),
            },
        }

        self.wait_for_table_active(table).await
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let mut tables = Vec::new();
        let mut start = None;
        loop {
            let result = self
                .client
                .list_tables()
                .set_exclusive_start_table_name(start)
                .send()
                .await
                .map_err(map_list_tables_error)?;

            tables.extend(result.table_names.unwrap_or_default());
            start = result.last_evaluated_table_name;
            if start.is_none() {
                break;
            }
        }
        Ok(tables)
    }

    async fn execute_batch(
        &self,
        table: &str,
        operation: BatchOperation,
        records: &[StoreRecord],
    ) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        if records.len() > MAX_BATCH_SIZE || !is_single_partition(records) {
            return Err(StoreError::InvalidBatch(format!(
                "a batch holds at most {MAX_BATCH_SIZE} records of one partition"
            )));
        }

        let items = records
            .iter()
            .map(|record| transact_item(table, operation, record))
            .collect::<Result<Vec<_>>>()?;

        self.client
            .transact_write_items()
            .set_transact_items(Some(items))
            .send()
            .await
            .map_err(|e| map_transact_write_error(e, table, operation, records))?;

        Ok(())
    }

    async fn query(
        &self,
        table: &str,
        filter: &KeyFilter,
        continuation: Option<&ContinuationToken>,
        page_size: usize,
    ) -> Result<RecordPage> {
        let start = continuation.map(keys::decode_token).transpose()?;
        let limit = i32::try_from(page_size.max(1)).unwrap_or(i32::MAX);

        let (items, last_evaluated_key) = match filter {
            KeyFilter::All => {
                let result = self
                    .client
                    .scan()
                    .table_name(table)
                    .limit(limit)
                    .set_exclusive_start_key(start)
                    .send()
                    .await
                    .map_err(|e| map_scan_error(e, table))?;
                (result.items.unwrap_or_default(), result.last_evaluated_key)
            }
            KeyFilter::Partition { partition_key } | KeyFilter::Exact { partition_key, .. } => {
                let mut request = self
                    .client
                    .query()
                    .table_name(table)
                    .limit(limit)
                    .set_exclusive_start_key(start)
                    .expression_attribute_names("#pk", PARTITION_KEY)
                    .expression_attribute_values(":pk", AttributeValue::S(partition_key.clone()));
                request = match filter {
                    KeyFilter::Exact { row_key, .. } => request
                        .key_condition_expression("#pk = :pk AND #rk = :rk")
                        .expression_attribute_names("#rk", ROW_KEY)
                        .expression_attribute_values(":rk", AttributeValue::S(row_key.clone())),
                    _ => request.key_condition_expression("#pk = :pk"),
                };
                let result = request
                    .send()
                    .await
                    .map_err(|e| map_query_error(e, table))?;
                (result.items.unwrap_or_default(), result.last_evaluated_key)
            }
        };

        let records = items.iter().map(item_to_record).collect::<Result<Vec<_>>>()?;
        let continuation = keys::encode_token(last_evaluated_key.as_ref())?;
        Ok(RecordPage::new(records, continuation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablekeep_core::entity::PropertyValue;

    #[test]
    fn test_insert_is_conditional_put() {
        let record = StoreRecord::new("p", "r");
        let item = transact_item("People", BatchOperation::Insert, &record).unwrap();
        let put = item.put().unwrap();
        assert_eq!(put.table_name(), "People");
        assert_eq!(
            put.condition_expression(),
            Some("attribute_not_exists(PartitionKey)")
        );

        let item = transact_item("People", BatchOperation::InsertOrReplace, &record).unwrap();
        assert_eq!(item.put().unwrap().condition_expression(), None);
    }

    #[test]
    fn test_merge_sets_each_property() {
        let record = StoreRecord::new("p", "r")
            .with_property("Age", PropertyValue::Int(30))
            .with_property("Name", PropertyValue::String("x".to_string()));
        let item = transact_item("People", BatchOperation::Merge, &record).unwrap();
        let update = item.update().unwrap();
        assert_eq!(update.update_expression(), "SET #p0 = :v0, #p1 = :v1");
        assert_eq!(
            update.condition_expression(),
            Some("attribute_exists(PartitionKey)")
        );
        assert_eq!(
            update
                .expression_attribute_names()
                .and_then(|names| names.get("#p0"))
                .map(String::as_str),
            Some("Age")
        );
    }

    #[test]
    fn test_empty_merge_or_insert_still_writes() {
        let record = StoreRecord::new("p", "r");
        let item = transact_item("People", BatchOperation::MergeOrInsert, &record).unwrap();
        let update = item.update().unwrap();
        assert_eq!(update.update_expression(), "REMOVE #touch");
        assert_eq!(update.condition_expression(), None);

        let item = transact_item("People", BatchOperation::Merge, &record).unwrap();
        assert!(item.condition_check().is_some());
    }
}
