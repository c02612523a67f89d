use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crypto_pipeline::config::PipelineConfig;
use crypto_pipeline::database;
use crypto_pipeline::jobs::market_snapshot_sync::{load_landing_directory, load_landing_file};

/// Load existing landing-zone files.
///
/// Usage: load_landing_zone [FILE|DIR]
/// Defaults to LANDING_ZONE_DIR when no path is given.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,crypto_pipeline=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = PipelineConfig::from_env().context("invalid pipeline configuration")?;
    let target = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.landing_zone_dir.clone());

    if !target.exists() {
        bail!("landing zone path {} does not exist", target.display());
    }

    let db = database::connect(&config.database_url)
        .await
        .context("failed to prepare database")?;

    let result = if target.is_dir() {
        load_landing_directory(&db, &config, &target).await.map(|summaries| {
            for summary in &summaries {
                tracing::info!(
                    "Batch {} ({}): {} loaded, {} skipped, {} failed",
                    summary.batch_id,
                    summary.source,
                    summary.loaded,
                    summary.skipped_duplicate,
                    summary.failed
                );
            }
        })
    } else {
        load_landing_file(&db, &config, &target).await.map(|summary| {
            tracing::info!(
                "Batch {}: {} loaded, {} skipped, {} failed",
                summary.batch_id,
                summary.loaded,
                summary.skipped_duplicate,
                summary.failed
            );
        })
    };

    db.close().await?;
    result.with_context(|| format!("failed to load {}", target.display()))?;

    Ok(())
}
