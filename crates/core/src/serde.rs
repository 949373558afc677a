//! Serde helper functions for backup documents.
//!
//! Binary property values are written as standard base64 strings so a
//! document stays plain JSON text.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serializer};

/// Serialize a byte buffer as a base64 string.
pub fn serialize_base64<T, S>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: AsRef<[u8]>,
    S: Serializer,
{
    serializer.serialize_str(&STANDARD.encode(bytes.as_ref()))
}

/// Deserialize a base64 string into a byte buffer.
pub fn deserialize_base64<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    STANDARD.decode(s.trim()).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct TestStruct {
        #[serde(
            serialize_with = "serialize_base64",
            deserialize_with = "deserialize_base64"
        )]
        payload: Vec<u8>,
    }

    #[test]
    fn test_serialize_base64() {
        let value = TestStruct {
            payload: b"hello".to_vec(),
        };
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"payload":"aGVsbG8="}"#);
    }

    #[test]
    fn test_deserialize_base64() {
        let json = r#"{"payload": "aGVsbG8="}"#;
        let result: TestStruct = serde_json::from_str(json).unwrap();
        assert_eq!(result.payload, b"hello".to_vec());
    }

    #[test]
    fn test_deserialize_base64_empty() {
        let json = r#"{"payload": ""}"#;
        let result: TestStruct = serde_json::from_str(json).unwrap();
        assert!(result.payload.is_empty());
    }

    #[test]
    fn test_deserialize_base64_invalid() {
        let json = r#"{"payload": "not base64!"}"#;
        let result: Result<TestStruct, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
