use std::env;

use crate::error::{Error, Result};

/// Default directory backing the local object store.
pub const DEFAULT_BLOB_ROOT: &str = "./backups";

/// Default path of the page statistics CSV.
pub const DEFAULT_STATS_PATH: &str = "backup-stats.csv";

/// AWS client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsConfig {
    /// Custom endpoint URL (for local DynamoDB).
    pub endpoint_url: Option<String>,
    /// AWS region.
    pub region: String,
}

impl AwsConfig {
    /// Returns a display string for the target environment.
    pub fn target_display(&self) -> String {
        match &self.endpoint_url {
            Some(url) => format!("Local DynamoDB ({})", url),
            None => format!("AWS DynamoDB (region: {})", self.region),
        }
    }
}

/// Process configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub aws: AwsConfig,
    /// Directory holding backup containers (default: "./backups")
    pub blob_root: String,
    /// Page statistics CSV path (default: "backup-stats.csv")
    pub stats_path: String,
    /// Records requested per store page (default: 1,000)
    pub page_size: usize,
    /// Names requested per listing segment during restore (default: 1,000)
    pub list_segment_size: usize,
    /// Create missing tables on write (default: true)
    pub auto_create_tables: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `AWS_ENDPOINT_URL` - Custom DynamoDB endpoint (default: unset)
    /// - `AWS_REGION` - AWS region (default: "us-east-1")
    /// - `TABLEKEEP_BLOB_ROOT` - Backup directory (default: "./backups")
    /// - `TABLEKEEP_STATS_PATH` - Page statistics CSV (default: "backup-stats.csv")
    /// - `TABLEKEEP_PAGE_SIZE` - Records per page (default: 1,000)
    /// - `TABLEKEEP_LIST_SEGMENT_SIZE` - Names per listing segment (default: 1,000)
    /// - `TABLEKEEP_AUTO_CREATE_TABLES` - Create missing tables (default: true)
    ///
    /// A set but unparseable value is an error rather than a silent default.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            aws: AwsConfig {
                endpoint_url: env::var("AWS_ENDPOINT_URL").ok(),
                region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            },
            blob_root: env::var("TABLEKEEP_BLOB_ROOT")
                .unwrap_or_else(|_| DEFAULT_BLOB_ROOT.to_string()),
            stats_path: env::var("TABLEKEEP_STATS_PATH")
                .unwrap_or_else(|_| DEFAULT_STATS_PATH.to_string()),
            page_size: parse_size(
                "TABLEKEEP_PAGE_SIZE",
                env::var("TABLEKEEP_PAGE_SIZE").ok(),
                DEFAULT_SIZE,
            )?,
            list_segment_size: parse_size(
                "TABLEKEEP_LIST_SEGMENT_SIZE",
                env::var("TABLEKEEP_LIST_SEGMENT_SIZE").ok(),
                DEFAULT_SIZE,
            )?,
            auto_create_tables: match env::var("TABLEKEEP_AUTO_CREATE_TABLES").ok() {
                Some(value) => parse_flag(&value).ok_or_else(|| {
                    Error::Config(format!(
                        "TABLEKEEP_AUTO_CREATE_TABLES must be a boolean, got '{value}'"
                    ))
                })?,
                None => true,
            },
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aws: AwsConfig {
                endpoint_url: None,
                region: "us-east-1".to_string(),
            },
            blob_root: DEFAULT_BLOB_ROOT.to_string(),
            stats_path: DEFAULT_STATS_PATH.to_string(),
            page_size: DEFAULT_SIZE,
            list_segment_size: DEFAULT_SIZE,
            auto_create_tables: true,
        }
    }
}

const DEFAULT_SIZE: usize = 1_000;

/// Parses a positive count, falling back to `default` when unset.
fn parse_size(name: &str, value: Option<String>, default: usize) -> Result<usize> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().parse::<usize>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(Error::Config(format!(
            "{name} must be a positive integer, got '{value}'"
        ))),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
