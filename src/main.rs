use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crypto_pipeline::config::PipelineConfig;
use crypto_pipeline::database;
use crypto_pipeline::jobs::market_snapshot_sync::run_market_snapshot_sync;
use crypto_pipeline::services::coingecko::CoinGeckoService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,crypto_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = PipelineConfig::from_env().context("invalid pipeline configuration")?;
    let db = database::connect(&config.database_url)
        .await
        .context("failed to prepare database")?;

    let coingecko = CoinGeckoService::new(&config.coingecko)?.with_source_label(&config.source);

    let result = run_market_snapshot_sync(&db, &coingecko, &config).await;
    db.close().await?;

    let summary = result.context("market snapshot sync failed")?;
    tracing::info!(
        "Batch {}: {} loaded, {} duplicates skipped, {} failed of {} records",
        summary.batch_id,
        summary.loaded,
        summary.skipped_duplicate,
        summary.failed,
        summary.declared
    );

    Ok(())
}
