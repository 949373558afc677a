use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::PropertyValue;

use super::error::QueryError;

/// Maximum number of records a store accepts in one batch.
pub const MAX_BATCH_SIZE: usize = 100;

/// Default number of records requested per query page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// A generic record addressed by partition key and row key.
///
/// Produced from a model by [`to_record`](crate::entity::to_record); callers
/// do not build these by hand outside of backends and backups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    #[serde(rename = "PartitionKey")]
    pub partition_key: String,
    #[serde(rename = "RowKey")]
    pub row_key: String,
    #[serde(rename = "Properties", default)]
    pub properties: BTreeMap<String, PropertyValue>,
    /// Versioning token assigned by the store. Not part of backups.
    #[serde(skip)]
    pub etag: Option<String>,
}

impl StoreRecord {
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            properties: BTreeMap::new(),
            etag: None,
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(name.into(), value);
        self
    }
}

/// Write semantics of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOperation {
    /// Fails if a record with the same keys exists.
    Insert,
    /// Creates or fully replaces the record.
    InsertOrReplace,
    /// Updates the given properties of an existing record; fails if missing.
    Merge,
    /// Updates the given properties, creating the record if missing.
    MergeOrInsert,
}

impl BatchOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchOperation::Insert => "Insert",
            BatchOperation::InsertOrReplace => "InsertOrReplace",
            BatchOperation::Merge => "Merge",
            BatchOperation::MergeOrInsert => "MergeOrInsert",
        }
    }
}

impl fmt::Display for BatchOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque cursor returned by a paginated call. Only ever passed back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Key filter for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyFilter {
    /// Full-table scan.
    All,
    /// Every record in one partition.
    Partition { partition_key: String },
    /// A single record.
    Exact {
        partition_key: String,
        row_key: String,
    },
}

impl KeyFilter {
    /// Builds a filter from optional keys.
    ///
    /// A row key alone cannot address a record in a two-level keyspace and
    /// is rejected.
    pub fn from_keys(
        partition_key: Option<&str>,
        row_key: Option<&str>,
    ) -> Result<Self, QueryError> {
        match (partition_key, row_key) {
            (Some(pk), Some(rk)) => Ok(KeyFilter::Exact {
                partition_key: pk.to_string(),
                row_key: rk.to_string(),
            }),
            (Some(pk), None) => Ok(KeyFilter::Partition {
                partition_key: pk.to_string(),
            }),
            (None, Some(_)) => Err(QueryError::InvalidFilterCombination),
            (None, None) => Ok(KeyFilter::All),
        }
    }

    /// Returns true if `record` passes the filter.
    pub fn matches(&self, record: &StoreRecord) -> bool {
        match self {
            KeyFilter::All => true,
            KeyFilter::Partition { partition_key } => &record.partition_key == partition_key,
            KeyFilter::Exact {
                partition_key,
                row_key,
            } => &record.partition_key == partition_key && &record.row_key == row_key,
        }
    }

    pub fn partition_key(&self) -> Option<&str> {
        match self {
            KeyFilter::All => None,
            KeyFilter::Partition { partition_key } | KeyFilter::Exact { partition_key, .. } => {
                Some(partition_key.as_str())
            }
        }
    }
}

/// Filter expression form, e.g. `PartitionKey eq 'a' and RowKey eq 'b'`.
impl fmt::Display for KeyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn quote(value: &str) -> String {
            format!("'{}'", value.replace('\'', "''"))
        }

        match self {
            KeyFilter::All => Ok(()),
            KeyFilter::Partition { partition_key } => {
                write!(f, "PartitionKey eq {}", quote(partition_key))
            }
            KeyFilter::Exact {
                partition_key,
                row_key,
            } => write!(
                f,
                "PartitionKey eq {} and RowKey eq {}",
                quote(partition_key),
                quote(row_key)
            ),
        }
    }
}

/// One page of a paginated read.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// `None` when there are no more pages.
    pub continuation: Option<ContinuationToken>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, continuation: Option<ContinuationToken>) -> Self {
        Self {
            items,
            continuation,
        }
    }

    pub fn is_last(&self) -> bool {
        self.continuation.is_none()
    }

    /// Applies `f` to every item, keeping the continuation token.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        Ok(Page {
            items: self.items.into_iter().map(f).collect::<Result<_, _>>()?,
            continuation: self.continuation,
        })
    }
}

/// A page of raw store records.
pub type RecordPage = Page<StoreRecord>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_from_both_keys() {
        let filter = KeyFilter::from_keys(Some("p"), Some("r")).unwrap();
        assert_eq!(
            filter,
            KeyFilter::Exact {
                partition_key: "p".to_string(),
                row_key: "r".to_string(),
            }
        );
        assert_eq!(filter.to_string(), "PartitionKey eq 'p' and RowKey eq 'r'");
    }

    #[test]
    fn test_filter_from_partition_only() {
        let filter = KeyFilter::from_keys(Some("p"), None).unwrap();
        assert_eq!(filter.to_string(), "PartitionKey eq 'p'");
        assert_eq!(filter.partition_key(), Some("p"));
    }

    #[test]
    fn test_filter_row_key_alone_is_rejected() {
        for row_key in ["r", "", "PartitionKey"] {
            assert_eq!(
                KeyFilter::from_keys(None, Some(row_key)),
                Err(QueryError::InvalidFilterCombination)
            );
        }
    }

    #[test]
    fn test_filter_without_keys_scans() {
        let filter = KeyFilter::from_keys(None, None).unwrap();
        assert_eq!(filter, KeyFilter::All);
        assert_eq!(filter.to_string(), "");
        assert!(filter.matches(&StoreRecord::new("a", "b")));
    }

    #[test]
    fn test_filter_quotes_are_escaped() {
        let filter = KeyFilter::from_keys(Some("o'brien"), None).unwrap();
        assert_eq!(filter.to_string(), "PartitionKey eq 'o''brien'");
    }

    #[test]
    fn test_filter_matches() {
        let record = StoreRecord::new("p1", "r1");
        assert!(KeyFilter::from_keys(Some("p1"), None)
            .unwrap()
            .matches(&record));
        assert!(!KeyFilter::from_keys(Some("p1"), Some("r2"))
            .unwrap()
            .matches(&record));
    }

    #[test]
    fn test_record_serializes_without_etag() {
        let mut record =
            StoreRecord::new("p1", "r1").with_property("Count", PropertyValue::Int(2));
        record.etag = Some("tag".to_string());
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"PartitionKey":"p1","RowKey":"r1","Properties":{"Count":{"type":"Int","value":2}}}"#
        );
    }

    #[test]
    fn test_page_try_map_keeps_token() {
        let page = Page::new(vec![1, 2], Some(ContinuationToken::new("next")));
        let mapped: Page<String> = page.try_map(|n| Ok::<_, ()>(n.to_string())).unwrap();
        assert_eq!(mapped.items, vec!["1".to_string(), "2".to_string()]);
        assert!(!mapped.is_last());
    }
}
