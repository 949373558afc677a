//! Typed property values carried by store records.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single typed value in a record's property set.
///
/// The variants cover the types a wide-column store can hold natively, so a
/// model survives a write/read or backup/restore cycle without losing type
/// information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum PropertyValue {
    String(String),
    Bool(bool),
    Int(i64),
    Double(f64),
    DateTime(DateTime<Utc>),
    Guid(Uuid),
    Binary(
        #[serde(
            serialize_with = "crate::serde::serialize_base64",
            deserialize_with = "crate::serde::deserialize_base64"
        )]
        Vec<u8>,
    ),
}

impl PropertyValue {
    /// Returns the string slice if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Coerces to an integer. Doubles convert only when they have no
    /// fractional part; strings are parsed.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(i) => Some(*i),
            PropertyValue::Double(d) if d.fract() == 0.0 && d.is_finite() => Some(*d as i64),
            PropertyValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Coerces to a double.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Double(d) => Some(*d),
            PropertyValue::Int(i) => Some(*i as f64),
            PropertyValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Coerces to a boolean.
    pub fn to_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            PropertyValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Coerces to a UTC timestamp. Strings must be RFC 3339.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            PropertyValue::DateTime(dt) => Some(*dt),
            PropertyValue::String(s) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            _ => None,
        }
    }

    /// Coerces to a UUID.
    pub fn to_uuid(&self) -> Option<Uuid> {
        match self {
            PropertyValue::Guid(id) => Some(*id),
            PropertyValue::String(s) => Uuid::parse_str(s.trim()).ok(),
            _ => None,
        }
    }

    /// Coerces to raw bytes. Strings are decoded as base64.
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        match self {
            PropertyValue::Binary(bytes) => Some(bytes.clone()),
            PropertyValue::String(s) => STANDARD.decode(s.trim()).ok(),
            _ => None,
        }
    }

    /// Name of the variant, as written in backup documents.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::String(_) => "String",
            PropertyValue::Bool(_) => "Bool",
            PropertyValue::Int(_) => "Int",
            PropertyValue::Double(_) => "Double",
            PropertyValue::DateTime(_) => "DateTime",
            PropertyValue::Guid(_) => "Guid",
            PropertyValue::Binary(_) => "Binary",
        }
    }
}

/// Culture-invariant string form, used when a value becomes part of a key.
impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => f.write_str(s),
            PropertyValue::Bool(b) => write!(f, "{b}"),
            PropertyValue::Int(i) => write!(f, "{i}"),
            PropertyValue::Double(d) => write!(f, "{d}"),
            PropertyValue::DateTime(dt) => {
                f.write_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            PropertyValue::Guid(id) => write!(f, "{}", id.hyphenated()),
            PropertyValue::Binary(bytes) => f.write_str(&STANDARD.encode(bytes)),
        }
    }
}

/// Conversion between a model field and a [`PropertyValue`].
///
/// `to_property` returns `None` when the field is null/unset; `from_property`
/// returns `None` when the stored value cannot be coerced into the field type.
pub trait PropertyField: Sized {
    fn to_property(&self) -> Option<PropertyValue>;
    fn from_property(value: PropertyValue) -> Option<Self>;
}

impl PropertyField for String {
    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::String(self.clone()))
    }

    fn from_property(value: PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::String(s) => Some(s),
            other => Some(other.to_string()),
        }
    }
}

impl PropertyField for bool {
    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::Bool(*self))
    }

    fn from_property(value: PropertyValue) -> Option<Self> {
        value.to_bool()
    }
}

impl PropertyField for i64 {
    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::Int(*self))
    }

    fn from_property(value: PropertyValue) -> Option<Self> {
        value.to_i64()
    }
}

impl PropertyField for i32 {
    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::Int(i64::from(*self)))
    }

    fn from_property(value: PropertyValue) -> Option<Self> {
        value.to_i64().and_then(|i| i32::try_from(i).ok())
    }
}

impl PropertyField for u32 {
    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::Int(i64::from(*self)))
    }

    fn from_property(value: PropertyValue) -> Option<Self> {
        value.to_i64().and_then(|i| u32::try_from(i).ok())
    }
}

impl PropertyField for f64 {
    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::Double(*self))
    }

    fn from_property(value: PropertyValue) -> Option<Self> {
        value.to_f64()
    }
}

impl PropertyField for DateTime<Utc> {
    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::DateTime(*self))
    }

    fn from_property(value: PropertyValue) -> Option<Self> {
        value.to_datetime()
    }
}

impl PropertyField for Uuid {
    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::Guid(*self))
    }

    fn from_property(value: PropertyValue) -> Option<Self> {
        value.to_uuid()
    }
}

impl PropertyField for Vec<u8> {
    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::Binary(self.clone()))
    }

    fn from_property(value: PropertyValue) -> Option<Self> {
        value.to_bytes()
    }
}

impl<T: PropertyField> PropertyField for Option<T> {
    fn to_property(&self) -> Option<PropertyValue> {
        self.as_ref().and_then(PropertyField::to_property)
    }

    fn from_property(value: PropertyValue) -> Option<Self> {
        T::from_property(value).map(Some)
    }
}
