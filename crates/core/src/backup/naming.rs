//! Backup document naming.
//!
//! `{path/}{table}.json{.gz}` is the contract between the exporter and the
//! importer: the importer recovers the table name and the compression flag
//! from the document name alone.

pub const JSON_EXTENSION: &str = ".json";
pub const GZIP_EXTENSION: &str = ".gz";

/// Table name and compression flag encoded in a backup document name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupDocumentName {
    pub table_name: String,
    pub compressed: bool,
}

impl BackupDocumentName {
    pub fn new(table_name: impl Into<String>, compressed: bool) -> Self {
        Self {
            table_name: table_name.into(),
            compressed,
        }
    }

    /// Builds the document path under an optional path prefix.
    pub fn to_path(&self, path_prefix: Option<&str>) -> String {
        let mut path = String::new();
        if let Some(prefix) = path_prefix.map(|p| p.trim_matches('/')) {
            if !prefix.is_empty() {
                path.push_str(prefix);
                path.push('/');
            }
        }
        path.push_str(&self.table_name);
        path.push_str(JSON_EXTENSION);
        if self.compressed {
            path.push_str(GZIP_EXTENSION);
        }
        path
    }

    /// Recovers the table name and compression flag from a document path.
    ///
    /// Strips any directory part, then `.gz` (marks compression), then
    /// `.json`. Returns `None` for names that do not follow the contract.
    pub fn parse(path: &str) -> Option<Self> {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        let (rest, compressed) = match file_name.strip_suffix(GZIP_EXTENSION) {
            Some(rest) => (rest, true),
            None => (file_name, false),
        };
        let table_name = rest.strip_suffix(JSON_EXTENSION)?;
        if table_name.is_empty() {
            return None;
        }
        Some(Self::new(table_name, compressed))
    }

    /// Destination table for a restore, with an optional name prefix.
    pub fn destination_table(&self, table_name_prefix: Option<&str>) -> String {
        match table_name_prefix {
            Some(prefix) => format!("{prefix}{}", self.table_name),
            None => self.table_name.clone(),
        }
    }
}
