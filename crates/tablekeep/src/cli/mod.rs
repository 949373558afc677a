//! CLI command definitions.

use clap::{Args, Parser, Subcommand};

/// Back up and restore wide-column tables.
#[derive(Debug, Parser)]
#[command(name = "tablekeep")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding backup containers.
    #[arg(long, env = "TABLEKEEP_BLOB_ROOT")]
    pub blob_root: Option<String>,

    /// Page statistics CSV written during backup.
    #[arg(long, env = "TABLEKEEP_STATS_PATH")]
    pub stats_path: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List tables in the store.
    Tables,
    /// Export tables into a container, one document per table.
    Backup(BackupArgs),
    /// Replay every backup document of a container into the store.
    Restore(RestoreArgs),
}

#[derive(Debug, Args)]
pub struct BackupArgs {
    /// Destination container.
    #[arg(long)]
    pub container: String,

    /// Directory inside the container.
    #[arg(long)]
    pub path: Option<String>,

    /// Table to skip (case-insensitive). May be repeated.
    #[arg(long = "exclude")]
    pub excluded_tables: Vec<String>,

    /// Only back up tables whose name starts with this prefix.
    #[arg(long)]
    pub prefix_filter: Option<String>,

    /// Write plain JSON documents instead of gzip.
    #[arg(long)]
    pub no_compress: bool,
}

#[derive(Debug, Args)]
pub struct RestoreArgs {
    /// Source container.
    #[arg(long)]
    pub container: String,

    /// Directory inside the container.
    #[arg(long)]
    pub path: Option<String>,

    /// Prefix prepended to every restored table name.
    #[arg(long)]
    pub table_prefix: Option<String>,
}
