//! DynamoDB error mapping.
//!
//! Maps AWS SDK errors to `StoreError` from `tablekeep_core::storage`. A
//! missing table always becomes `StoreError::TableNotFound`.

use std::fmt::Debug;

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::create_table::CreateTableError;
use aws_sdk_dynamodb::operation::describe_table::DescribeTableError;
use aws_sdk_dynamodb::operation::list_tables::ListTablesError;
use aws_sdk_dynamodb::operation::query::QueryError;
use aws_sdk_dynamodb::operation::scan::ScanError;
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsError;
use tablekeep_core::storage::{BatchOperation, StoreError, StoreRecord};

/// Map a CreateTable SDK error to StoreError.
pub fn map_create_table_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<CreateTableError, R>,
    table: &str,
) -> StoreError {
    match err.into_service_error() {
        CreateTableError::ResourceInUseException(_) => StoreError::TableAlreadyExists {
            table: table.to_string(),
        },
        CreateTableError::LimitExceededException(_) => {
            StoreError::RequestFailed("Table limit exceeded".to_string())
        }
        CreateTableError::InternalServerError(_) => {
            StoreError::RequestFailed("DynamoDB internal server error".to_string())
        }
        err => StoreError::RequestFailed(format!("CreateTable failed: {:?}", err)),
    }
}

/// Map a DescribeTable SDK error to StoreError.
pub fn map_describe_table_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<DescribeTableError, R>,
    table: &str,
) -> StoreError {
    match err.into_service_error() {
        DescribeTableError::ResourceNotFoundException(_) => StoreError::TableNotFound {
            table: table.to_string(),
        },
        DescribeTableError::InternalServerError(_) => {
            StoreError::RequestFailed("DynamoDB internal server error".to_string())
        }
        err => StoreError::RequestFailed(format!("DescribeTable failed: {:?}", err)),
    }
}

/// Map a ListTables SDK error to StoreError.
pub fn map_list_tables_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<ListTablesError, R>,
) -> StoreError {
    match err.into_service_error() {
        ListTablesError::InternalServerError(_) => {
            StoreError::RequestFailed("DynamoDB internal server error".to_string())
        }
        err => StoreError::RequestFailed(format!("ListTables failed: {:?}", err)),
    }
}

/// Map a Query SDK error to StoreError.
pub fn map_query_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<QueryError, R>,
    table: &str,
) -> StoreError {
    match err.into_service_error() {
        QueryError::ResourceNotFoundException(_) => StoreError::TableNotFound {
            table: table.to_string(),
        },
        QueryError::ProvisionedThroughputExceededException(_) => {
            StoreError::RequestFailed("Throughput exceeded, please retry".to_string())
        }
        QueryError::RequestLimitExceeded(_) => {
            StoreError::RequestFailed("Request limit exceeded, please retry".to_string())
        }
        QueryError::InternalServerError(_) => {
            StoreError::RequestFailed("DynamoDB internal server error".to_string())
        }
        err => StoreError::RequestFailed(format!("Query failed: {:?}", err)),
    }
}

/// Map a Scan SDK error to StoreError.
pub fn map_scan_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<ScanError, R>,
    table: &str,
) -> StoreError {
    match err.into_service_error() {
        ScanError::ResourceNotFoundException(_) => StoreError::TableNotFound {
            table: table.to_string(),
        },
        ScanError::ProvisionedThroughputExceededException(_) => {
            StoreError::RequestFailed("Throughput exceeded, please retry".to_string())
        }
        ScanError::RequestLimitExceeded(_) => {
            StoreError::RequestFailed("Request limit exceeded, please retry".to_string())
        }
        ScanError::InternalServerError(_) => {
            StoreError::RequestFailed("DynamoDB internal server error".to_string())
        }
        err => StoreError::RequestFailed(format!("Scan failed: {:?}", err)),
    }
}

/// Map a TransactWriteItems SDK error to StoreError.
///
/// A failed condition is reported against the first record whose
/// cancellation reason is `ConditionalCheckFailed`.
pub fn map_transact_write_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<TransactWriteItemsError, R>,
    table: &str,
    operation: BatchOperation,
    records: &[StoreRecord],
) -> StoreError {
    match err.into_service_error() {
        TransactWriteItemsError::ResourceNotFoundException(_) => StoreError::TableNotFound {
            table: table.to_string(),
        },
        TransactWriteItemsError::TransactionCanceledException(canceled) => {
            let failed = canceled
                .cancellation_reasons()
                .iter()
                .position(|reason| reason.code() == Some("ConditionalCheckFailed"))
                .and_then(|index| records.get(index));
            match failed {
                Some(record) => conditional_check_failed(operation, record),
                None => StoreError::RequestFailed(format!(
                    "Transaction canceled: {}",
                    canceled.message().unwrap_or("no reason given")
                )),
            }
        }
        TransactWriteItemsError::ProvisionedThroughputExceededException(_) => {
            StoreError::RequestFailed("Throughput exceeded, please retry".to_string())
        }
        TransactWriteItemsError::RequestLimitExceeded(_) => {
            StoreError::RequestFailed("Request limit exceeded, please retry".to_string())
        }
        TransactWriteItemsError::TransactionInProgressException(_) => {
            StoreError::RequestFailed("Transaction in progress, please retry".to_string())
        }
        TransactWriteItemsError::InternalServerError(_) => {
            StoreError::RequestFailed("DynamoDB internal server error".to_string())
        }
        err => StoreError::RequestFailed(format!("TransactWriteItems failed: {:?}", err)),
    }
}

fn conditional_check_failed(operation: BatchOperation, record: &StoreRecord) -> StoreError {
    let partition_key = record.partition_key.clone();
    let row_key = record.row_key.clone();
    match operation {
        BatchOperation::Insert => StoreError::RecordExists {
            partition_key,
            row_key,
        },
        _ => StoreError::RecordNotFound {
            partition_key,
            row_key,
        },
    }
}

/// Map a request builder error to StoreError.
pub fn map_build_error(err: impl std::fmt::Display) -> StoreError {
    StoreError::RequestFailed(format!("Invalid request: {err}"))
}
