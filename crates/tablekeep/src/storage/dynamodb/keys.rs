//! Key attribute names and continuation token encoding.
//!
//! Pure functions, no SDK calls.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use tablekeep_core::storage::{ContinuationToken, StoreError};

pub const PARTITION_KEY: &str = "PartitionKey";
pub const ROW_KEY: &str = "RowKey";

/// Builds the primary key of a record.
pub fn key_map(partition_key: &str, row_key: &str) -> HashMap<String, AttributeValue> {
    HashMap::from([
        (
            PARTITION_KEY.to_string(),
            AttributeValue::S(partition_key.to_string()),
        ),
        (ROW_KEY.to_string(), AttributeValue::S(row_key.to_string())),
    ])
}

/// Encodes `LastEvaluatedKey` as an opaque token.
///
/// Returns `None` when the key is absent or not one of ours, which ends the
/// traversal.
pub fn encode_token(
    last_evaluated_key: Option<&HashMap<String, AttributeValue>>,
) -> Result<Option<ContinuationToken>, StoreError> {
    let Some(key) = last_evaluated_key else {
        return Ok(None);
    };
    let (Some(AttributeValue::S(pk)), Some(AttributeValue::S(rk))) =
        (key.get(PARTITION_KEY), key.get(ROW_KEY))
    else {
        return Ok(None);
    };

    serde_json::to_string(&(pk, rk))
        .map(|token| Some(ContinuationToken::new(token)))
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Decodes a token back into an `ExclusiveStartKey`.
pub fn decode_token(
    token: &ContinuationToken,
) -> Result<HashMap<String, AttributeValue>, StoreError> {
    let (pk, rk): (String, String) = serde_json::from_str(token.as_str())
        .map_err(|_| StoreError::RequestFailed("Invalid continuation token".to_string()))?;
    Ok(key_map(&pk, &rk))
}
