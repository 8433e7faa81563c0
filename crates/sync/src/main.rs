use anyhow::Result;
use clap::Parser;
use tracing::info;

use airsift_sync::cli::Cli;
use airsift_sync::readings::ReadingSynchronizer;
use airsift_sync::streams::StreamSynchronizer;
use airsift_sync::upstream::UpstreamClient;
use airsift_sync::{config, logging};
use persistence::repositories::{DustboxReadingRepository, DustboxRepository};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = config::Config::load()?;

    logging::init_logging(&config.logging);

    info!("Starting Airsift data sync v{}", env!("CARGO_PKG_VERSION"));

    // Create database pool
    let pool = persistence::db::create_pool(&config.database).await?;

    // Run migrations
    info!("Running database migrations...");
    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await?;
    info!("Migrations completed");

    let options = cli.sync_options();
    let client = UpstreamClient::new(&config.upstream)?;
    let dustboxes = DustboxRepository::new(pool.clone());
    let readings = DustboxReadingRepository::new(pool.clone());

    // Phase one: the dustbox registry.
    let report = StreamSynchronizer::new(&client, &dustboxes, &options)
        .sync()
        .await?;
    info!(
        total = report.total,
        synced = report.synced,
        failed = report.failed,
        "Stream sync finished"
    );

    // Phase two: per-dustbox reading history.
    let report = ReadingSynchronizer::new(&client, &dustboxes, &readings, &options)
        .sync_all()
        .await?;
    info!(
        dustboxes = report.dustboxes,
        synced = report.synced,
        failed = report.failed,
        aborted = report.aborted,
        "Reading sync finished"
    );

    Ok(())
}
