use std::process;

use bracket_rating::{
    api::StartggClient,
    args::Args,
    database::{db::DbClient, memory::MemoryStore, store::Store},
    processor::sync::{SyncController, SyncError, SyncOptions, SyncReport}
};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let indicatif_layer = IndicatifLayer::new();
    tracing_subscriber::registry()
        .with(EnvFilter::new(&args.log_level))
        .with(tracing_subscriber::fmt::layer().with_writer(indicatif_layer.get_stderr_writer()))
        .with(indicatif_layer)
        .init();

    let config = args.api_config().expect("Expected a valid start.gg API configuration");
    let client = StartggClient::from_config(config).expect("Expected a valid HTTP client configuration");
    let options = args.sync_options();

    let result = match args.connection_string.as_deref() {
        Some(connection_string) => {
            let db = match DbClient::connect(connection_string).await {
                Ok(db) => db,
                Err(e) => {
                    error!("Failed to connect to database: {}", e);
                    process::exit(1);
                }
            };

            if !args.dry_run {
                if let Err(e) = db.apply_schema().await {
                    error!("Failed to apply schema: {}", e);
                    process::exit(1);
                }
            }

            sync(&client, &db, options).await
        }
        None if args.dry_run => {
            warn!("No connection string, dry run starts from an empty store");
            let store = MemoryStore::new();
            sync(&client, &store, options).await
        }
        None => {
            error!("A connection string is required unless --dry-run is given");
            process::exit(2);
        }
    };

    match result {
        Ok(report) => info!(
            "Run {} finished: {} tournaments processed, {} failed, watermark {:?} -> {:?}",
            report.run_id,
            report.processed.len(),
            report.failed.len(),
            report.watermark_before,
            report.watermark_after
        ),
        Err(e) => {
            error!("Sync failed: {}", e);
            process::exit(1);
        }
    }
}

async fn sync<S: Store>(client: &StartggClient, store: &S, options: SyncOptions) -> Result<SyncReport, SyncError> {
    SyncController::new(client, store, options).run().await
}
