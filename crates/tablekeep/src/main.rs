//! tablekeep CLI entry point.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tablekeep::backup::{
    BackupExporter, BackupOptions, PageStatsWriter, RestoreImporter, RestoreOptions,
};
use tablekeep::blob::ObjectStoreBlobStore;
use tablekeep::cli::{Cli, Commands};
use tablekeep::config::Config;
use tablekeep::{ContextOptions, StorageContext};
use tablekeep_core::backup::BlobStore;
use tablekeep_core::entity::MapperRegistry;
use tablekeep_core::storage::TableStore;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tablekeep=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env()?;
    if let Some(blob_root) = cli.blob_root {
        config.blob_root = blob_root;
    }
    if let Some(stats_path) = cli.stats_path {
        config.stats_path = stats_path;
    }

    let store = create_store(&config).await;
    let options = ContextOptions::default()
        .with_auto_create_tables(config.auto_create_tables)
        .with_page_size(config.page_size);
    let context = StorageContext::new(store, MapperRegistry::builder().build(), options);

    match cli.command {
        Commands::Tables => {
            for table in context.executor().list_tables().await? {
                println!("{table}");
            }
        }
        Commands::Backup(args) => {
            let blobs = create_blob_store(&config)?;
            let mut options = BackupOptions::new(args.container)
                .with_excluded_tables(args.excluded_tables)
                .with_compression(!args.no_compress);
            if let Some(path) = args.path {
                options = options.with_path(path);
            }
            if let Some(prefix) = args.prefix_filter {
                options = options.with_table_name_prefix(prefix);
            }

            let mut stats = PageStatsWriter::create(&config.stats_path)
                .with_context(|| format!("Failed to create {}", config.stats_path))?;
            let summary = BackupExporter::new(context.executor(), blobs)
                .backup(&options, &mut stats)
                .await?;

            tracing::info!(
                tables = summary.tables.len(),
                records = summary.total_records(),
                stats = %config.stats_path,
                "Backup finished"
            );
        }
        Commands::Restore(args) => {
            let blobs = create_blob_store(&config)?;
            let mut options =
                RestoreOptions::new(args.container).with_segment_size(config.list_segment_size);
            if let Some(path) = args.path {
                options = options.with_path(path);
            }
            if let Some(prefix) = args.table_prefix {
                options = options.with_table_name_prefix(prefix);
            }

            let summary = RestoreImporter::new(context.dispatcher(), blobs)
                .restore(&options)
                .await?;

            tracing::info!(
                documents = summary.documents.len(),
                records = summary.total_records(),
                skipped = summary.skipped.len(),
                "Restore finished"
            );
        }
    }

    Ok(())
}

#[cfg(feature = "dynamodb")]
async fn create_store(config: &Config) -> Arc<dyn TableStore> {
    use tablekeep::storage::DynamoDbTableStore;

    tracing::info!(store = %config.aws.target_display(), "Connecting to table store");
    Arc::new(DynamoDbTableStore::from_config(&config.aws).await)
}

#[cfg(not(feature = "dynamodb"))]
async fn create_store(_config: &Config) -> Arc<dyn TableStore> {
    use tablekeep::storage::InMemoryTableStore;

    tracing::warn!("Built without the dynamodb feature, using a volatile in-memory store");
    Arc::new(InMemoryTableStore::new())
}

fn create_blob_store(config: &Config) -> Result<Arc<dyn BlobStore>> {
    let blobs = ObjectStoreBlobStore::local(&config.blob_root)
        .with_context(|| format!("Failed to open blob root {}", config.blob_root))?;
    Ok(Arc::new(blobs))
}
