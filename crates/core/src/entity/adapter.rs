//! Conversion between domain models and generic store records.
//!
//! Pure functions: no I/O, errors only come from key resolution or from a
//! stored value that cannot be coerced into the target field.

use std::collections::BTreeMap;

use crate::storage::StoreRecord;

use super::error::{EntityError, MappingError};
use super::registry::EntityMapping;
use super::traits::Entity;
use super::value::PropertyValue;

/// Converts a model into a store record using `mapping`.
///
/// A property used verbatim as the partition or row key is carried by the
/// key itself and not duplicated in the property set. Null properties are
/// omitted.
pub fn to_record<E: Entity>(entity: &E, mapping: &EntityMapping) -> Result<StoreRecord, EntityError> {
    let partition_key = mapping.partition_key().resolve(entity)?;
    let row_key = mapping.row_key().resolve(entity)?;

    let key_properties = [
        mapping.partition_key().verbatim_property(),
        mapping.row_key().verbatim_property(),
    ];

    let properties: BTreeMap<String, PropertyValue> = E::field_names()
        .iter()
        .filter(|name| !key_properties.contains(&Some(**name)))
        .filter_map(|name| entity.get(name).map(|value| (name.to_string(), value)))
        .collect();

    Ok(StoreRecord {
        partition_key,
        row_key,
        properties,
        etag: None,
    })
}

/// Builds a model from a store record using `mapping`.
///
/// Properties the model does not declare are ignored; properties missing
/// from the record keep their default value.
pub fn to_model<E: Entity>(record: &StoreRecord, mapping: &EntityMapping) -> Result<E, MappingError> {
    let mut entity = E::default();

    if let Some(property) = mapping.partition_key().verbatim_property() {
        if E::has_field(property) {
            entity.set(property, PropertyValue::String(record.partition_key.clone()))?;
        }
    }
    if let Some(property) = mapping.row_key().verbatim_property() {
        if E::has_field(property) {
            entity.set(property, PropertyValue::String(record.row_key.clone()))?;
        }
    }

    for (name, value) in &record.properties {
        if E::has_field(name) {
            entity.set(name, value.clone())?;
        }
    }

    Ok(entity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use uuid::Uuid;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Reading {
        sensor: String,
        sequence: i64,
        value: f64,
        active: bool,
        taken_at: DateTime<Utc>,
        batch: Uuid,
        payload: Vec<u8>,
        note: Option<String>,
    }

    crate::impl_entity!(Reading {
        sensor => "Sensor",
        sequence => "Sequence",
        value => "Value",
        active => "Active",
        taken_at => "TakenAt",
        batch => "Batch",
        payload => "Payload",
        note => "Note",
    });

    fn reading() -> Reading {
        Reading {
            sensor: "north-7".to_string(),
            sequence: 42,
            value: 21.5,
            active: true,
            taken_at: Utc.with_ymd_and_hms(2024, 6, 15, 8, 30, 0).unwrap(),
            batch: Uuid::parse_str("550e8400-e29b-41d4-a716-446655440001").unwrap(),
            payload: vec![0xde, 0xad, 0xbe, 0xef],
            note: None,
        }
    }

    #[test]
    fn test_to_record_with_verbatim_keys() {
        let mapping = EntityMapping::new("Readings", "Sensor", "Sequence").unwrap();
        let record = to_record(&reading(), &mapping).unwrap();

        assert_eq!(record.partition_key, "north-7");
        assert_eq!(record.row_key, "42");
        assert!(!record.properties.contains_key("Sensor"));
        assert!(!record.properties.contains_key("Sequence"));
        assert!(!record.properties.contains_key("Note"));
        assert_eq!(
            record.properties.get("Value"),
            Some(&PropertyValue::Double(21.5))
        );
        assert_eq!(record.etag, None);
    }

    #[test]
    fn test_to_record_with_templates_keeps_all_properties() {
        let mapping = EntityMapping::new("Readings", "{{Sensor}}", "{{Sequence}}-x").unwrap();
        let record = to_record(&reading(), &mapping).unwrap();

        assert_eq!(record.partition_key, "north-7");
        assert_eq!(record.row_key, "42-x");
        assert_eq!(
            record.properties.get("Sensor"),
            Some(&PropertyValue::String("north-7".into()))
        );
        assert_eq!(record.properties.get("Sequence"), Some(&PropertyValue::Int(42)));
    }

    #[test]
    fn test_round_trip_preserves_types() {
        let mapping = EntityMapping::new("Readings", "Sensor", "Sequence").unwrap();
        let original = reading();
        let record = to_record(&original, &mapping).unwrap();
        let restored: Reading = to_model(&record, &mapping).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_to_model_ignores_unknown_and_defaults_missing() {
        let mapping = EntityMapping::new("Readings", "Sensor", "Sequence").unwrap();
        let mut properties = BTreeMap::new();
        properties.insert("Extra".to_string(), PropertyValue::Bool(false));
        properties.insert("Value".to_string(), PropertyValue::Int(3));
        let record = StoreRecord {
            partition_key: "south-1".to_string(),
            row_key: "9".to_string(),
            properties,
            etag: Some("etag-1".to_string()),
        };

        let restored: Reading = to_model(&record, &mapping).unwrap();
        assert_eq!(restored.sensor, "south-1");
        assert_eq!(restored.sequence, 9);
        assert_eq!(restored.value, 3.0);
        assert!(!restored.active);
        assert_eq!(restored.note, None);
    }

    #[test]
    fn test_to_model_rejects_uncoercible_value() {
        let mapping = EntityMapping::new("Readings", "Sensor", "Sequence").unwrap();
        let mut properties = BTreeMap::new();
        properties.insert("Active".to_string(), PropertyValue::Double(0.5));
        let record = StoreRecord {
            partition_key: "p".to_string(),
            row_key: "1".to_string(),
            properties,
            etag: None,
        };

        let result: Result<Reading, _> = to_model(&record, &mapping);
        assert!(matches!(result, Err(MappingError::InvalidValue { .. })));
    }

    #[test]
    fn test_to_record_propagates_null_key() {
        let mapping = EntityMapping::new("Readings", "Note", "Sequence").unwrap();
        let result = to_record(&reading(), &mapping);
        assert!(matches!(result, Err(EntityError::Template(_))));
    }
}
