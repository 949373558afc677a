use std::fmt;

use thiserror::Error;

/// Which half of the two-part key a mapping error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Partition,
    Row,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::Partition => f.write_str("partition key"),
            KeyKind::Row => f.write_str("row key"),
        }
    }
}

/// Errors raised while registering mappings or moving values between a
/// model and a record. These indicate a configuration defect and are never
/// retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("A mapping for {entity_type} is already registered")]
    DuplicateMapping { entity_type: &'static str },
    #[error("{entity_type} declares no {key} source")]
    MissingKeyAttribute {
        entity_type: &'static str,
        key: KeyKind,
    },
    #[error("{entity_type} has no property named '{property}'")]
    UnknownProperty {
        entity_type: &'static str,
        property: String,
    },
    #[error("{entity_type} is not registered")]
    NotRegistered { entity_type: &'static str },
    #[error("Invalid key template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },
    #[error("Cannot assign stored value to {entity_type}.{property}")]
    InvalidValue {
        entity_type: &'static str,
        property: String,
    },
}

/// Errors raised while resolving a key template against a model.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Property '{property}' referenced by a key template is null")]
    NullValue { property: String },
}

/// Any failure of key derivation or record adaptation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EntityError {
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error(transparent)]
    Template(#[from] TemplateError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_mapping_display() {
        let error = MappingError::DuplicateMapping {
            entity_type: "Person",
        };
        assert_eq!(
            error.to_string(),
            "A mapping for Person is already registered"
        );
    }

    #[test]
    fn test_missing_key_attribute_display() {
        let error = MappingError::MissingKeyAttribute {
            entity_type: "Person",
            key: KeyKind::Row,
        };
        assert_eq!(error.to_string(), "Person declares no row key source");
    }

    #[test]
    fn test_null_value_display() {
        let error = TemplateError::NullValue {
            property: "Contact".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Property 'Contact' referenced by a key template is null"
        );
    }

    #[test]
    fn test_entity_error_is_transparent() {
        let error: EntityError = MappingError::NotRegistered {
            entity_type: "Order",
        }
        .into();
        assert_eq!(error.to_string(), "Order is not registered");
    }
}
