//! DynamoDB attribute conversion functions.
//!
//! Pure functions for converting between DynamoDB items and store records.
//! These are testable in isolation without DynamoDB access.

use std::collections::HashMap;

use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue;
use tablekeep_core::entity::PropertyValue;
use tablekeep_core::storage::{StoreError, StoreRecord};

use super::keys::{PARTITION_KEY, ROW_KEY};

/// Convert a property value to a DynamoDB attribute.
///
/// Timestamps and GUIDs are stored as strings in their invariant form.
pub fn property_to_attribute(value: &PropertyValue) -> Result<AttributeValue, StoreError> {
    Ok(match value {
        PropertyValue::String(s) => AttributeValue::S(s.clone()),
        PropertyValue::Bool(b) => AttributeValue::Bool(*b),
        PropertyValue::Int(i) => AttributeValue::N(i.to_string()),
        PropertyValue::Double(d) if d.is_finite() => AttributeValue::N(format!("{d:?}")),
        PropertyValue::Double(d) => {
            return Err(StoreError::Serialization(format!(
                "{d} cannot be stored as a number"
            )))
        }
        PropertyValue::DateTime(_) | PropertyValue::Guid(_) => AttributeValue::S(value.to_string()),
        PropertyValue::Binary(bytes) => AttributeValue::B(Blob::new(bytes.clone())),
    })
}

/// Convert a DynamoDB attribute to a property value.
///
/// Returns `Ok(None)` for NULL attributes.
pub fn attribute_to_property(
    name: &str,
    attribute: &AttributeValue,
) -> Result<Option<PropertyValue>, StoreError> {
    match attribute {
        AttributeValue::S(s) => Ok(Some(PropertyValue::String(s.clone()))),
        AttributeValue::Bool(b) => Ok(Some(PropertyValue::Bool(*b))),
        AttributeValue::N(n) => parse_number(n).map(Some).ok_or_else(|| {
            StoreError::Serialization(format!("Invalid number in '{name}': {n}"))
        }),
        AttributeValue::B(blob) => Ok(Some(PropertyValue::Binary(blob.as_ref().to_vec()))),
        AttributeValue::Null(_) => Ok(None),
        other => Err(StoreError::Serialization(format!(
            "Unsupported attribute type for '{name}': {other:?}"
        ))),
    }
}

fn parse_number(n: &str) -> Option<PropertyValue> {
    if n.contains(['.', 'e', 'E']) {
        return n.parse().ok().map(PropertyValue::Double);
    }
    n.parse()
        .map(PropertyValue::Int)
        .or_else(|_| n.parse().map(PropertyValue::Double))
        .ok()
}

/// Convert a store record to a DynamoDB item.
pub fn record_to_item(record: &StoreRecord) -> Result<HashMap<String, AttributeValue>, StoreError> {
    let mut item = HashMap::with_capacity(record.properties.len() + 2);

    // Keys
    item.insert(
        PARTITION_KEY.to_string(),
        AttributeValue::S(record.partition_key.clone()),
    );
    item.insert(
        ROW_KEY.to_string(),
        AttributeValue::S(record.row_key.clone()),
    );

    // Data
    for (name, value) in &record.properties {
        if name == PARTITION_KEY || name == ROW_KEY {
            return Err(StoreError::Serialization(format!(
                "Property name '{name}' is reserved for the key"
            )));
        }
        item.insert(name.clone(), property_to_attribute(value)?);
    }

    Ok(item)
}

/// Convert a DynamoDB item to a store record.
pub fn item_to_record(item: &HashMap<String, AttributeValue>) -> Result<StoreRecord, StoreError> {
    let mut record = StoreRecord::new(get_string(item, PARTITION_KEY)?, get_string(item, ROW_KEY)?);

    for (name, attribute) in item {
        if name == PARTITION_KEY || name == ROW_KEY {
            continue;
        }
        if let Some(value) = attribute_to_property(name, attribute)? {
            record.properties.insert(name.clone(), value);
        }
    }

    Ok(record)
}

fn get_string(item: &HashMap<String, AttributeValue>, key: &str) -> Result<String, StoreError> {
    match item.get(key) {
        Some(AttributeValue::S(s)) => Ok(s.clone()),
        _ => Err(StoreError::Serialization(format!(
            "Missing or invalid string attribute: {key}"
        ))),
    }
}
