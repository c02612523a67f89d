//! Load orchestration: one ingestion batch per delivered set of observations.
//!
//! Record-level failures (validation, constraint violations, numbers that do
//! not fit) are counted and the batch still completes. Losing the store is a
//! run-level failure: the batch is marked failed and the run stops.

use std::path::Path;

use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use thiserror::Error;

use crate::config::PipelineConfig;
use crate::models::observation::{LandingBatch, RawObservation};
use crate::models::summary::{BatchSummary, FailureStage, RecordOutcome};
use crate::services::batch_tracker::{close_batch, open_batch, BatchError, BatchStatus};
use crate::services::bucketing::BucketWidth;
use crate::services::landing_zone::{
    list_landing_files, read_landing_batch, write_landing_batch, LandingZoneError,
};
use crate::services::market_source::{MarketSource, SourceError};
use crate::services::reference_data::upsert_cryptocurrency;
use crate::services::snapshot_loader::{load_snapshot, LoadError, LoadOutcome};
use crate::services::validation::validate_observation;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("could not open ingestion batch: {0}")]
    BatchOpen(#[source] BatchError),
    #[error("store unavailable while loading batch {batch_id}: {source}")]
    StoreUnavailable {
        batch_id: i32,
        #[source]
        source: LoadError,
    },
    #[error("could not close ingestion batch: {0}")]
    BatchClose(#[source] BatchError),
    #[error("market source failed: {0}")]
    Source(#[from] SourceError),
    #[error(transparent)]
    LandingZone(#[from] LandingZoneError),
}

/// Load `records` as one batch and return its summary.
pub async fn load_observations(
    db: &DatabaseConnection,
    config: &PipelineConfig,
    source: &str,
    ingested_at: DateTime<Utc>,
    records: &[RawObservation],
) -> Result<BatchSummary, PipelineError> {
    let batch_id = open_batch(db, ingested_at, source, records.len())
        .await
        .map_err(PipelineError::BatchOpen)?;

    let mut summary = BatchSummary::new(batch_id, source, records.len());

    for (position, observation) in records.iter().enumerate() {
        match process_record(db, batch_id, config.bucket_width, observation).await {
            Ok(outcome) => {
                if let RecordOutcome::Rejected { stage, reason } = &outcome {
                    tracing::warn!(
                        batch_id = batch_id,
                        position = position,
                        crypto_id = %observation.id,
                        stage = ?stage,
                        "Record rejected: {}",
                        reason
                    );
                }
                summary.record(position, &observation.id, outcome);
            }
            Err(e) => {
                tracing::error!(
                    batch_id = batch_id,
                    position = position,
                    "Aborting batch, store unavailable: {}",
                    e
                );
                if let Err(close_err) = close_batch(db, batch_id, BatchStatus::Failed).await {
                    tracing::warn!(batch_id = batch_id, "Could not mark batch failed: {}", close_err);
                }
                return Err(PipelineError::StoreUnavailable { batch_id, source: e });
            }
        }
    }

    close_batch(db, batch_id, BatchStatus::Completed)
        .await
        .map_err(PipelineError::BatchClose)?;

    tracing::info!(
        batch_id = summary.batch_id,
        source = %summary.source,
        declared = summary.declared,
        loaded = summary.loaded,
        skipped_duplicate = summary.skipped_duplicate,
        failed = summary.failed,
        "Batch completed"
    );

    Ok(summary)
}

/// Classify one record. Only connectivity errors escape as `Err`.
async fn process_record(
    db: &DatabaseConnection,
    batch_id: i32,
    width: BucketWidth,
    observation: &RawObservation,
) -> Result<RecordOutcome, LoadError> {
    if let Err(e) = validate_observation(observation) {
        return Ok(RecordOutcome::Rejected {
            stage: FailureStage::Validation,
            reason: e.to_string(),
        });
    }

    if let Err(e) = upsert_cryptocurrency(db, observation, Utc::now()).await {
        return storage_failure(LoadError::from(e));
    }

    match load_snapshot(db, &observation.id, batch_id, observation, width).await {
        Ok(LoadOutcome::Inserted {
            snapshot_id,
            snapshot_time,
        }) => Ok(RecordOutcome::Loaded {
            snapshot_id,
            snapshot_time,
        }),
        Ok(LoadOutcome::Duplicate { snapshot_time }) => {
            Ok(RecordOutcome::SkippedDuplicate { snapshot_time })
        }
        Err(e) => storage_failure(e),
    }
}

fn storage_failure(err: LoadError) -> Result<RecordOutcome, LoadError> {
    if err.is_connectivity() {
        return Err(err);
    }
    Ok(RecordOutcome::Rejected {
        stage: FailureStage::Storage,
        reason: err.to_string(),
    })
}

/// Load one landing-zone file under its own `ingested_at` and `source`.
pub async fn load_landing_file(
    db: &DatabaseConnection,
    config: &PipelineConfig,
    path: &Path,
) -> Result<BatchSummary, PipelineError> {
    let batch = read_landing_batch(path).await?;

    tracing::info!(
        "Loading {} records from {} (ingested {})",
        batch.records.len(),
        path.display(),
        batch.ingested_at
    );

    load_observations(db, config, &batch.source, batch.ingested_at, &batch.records).await
}

/// Load every landing file in `dir`, oldest first. A file that cannot be read
/// or whose run aborts is logged and skipped.
pub async fn load_landing_directory(
    db: &DatabaseConnection,
    config: &PipelineConfig,
    dir: &Path,
) -> Result<Vec<BatchSummary>, PipelineError> {
    let files = list_landing_files(dir).await?;

    if files.is_empty() {
        tracing::warn!("No landing files found in {}", dir.display());
        return Ok(Vec::new());
    }

    let mut summaries = Vec::with_capacity(files.len());

    for path in &files {
        match load_landing_file(db, config, path).await {
            Ok(summary) => summaries.push(summary),
            Err(e) => tracing::error!("Skipping landing file {}: {}", path.display(), e),
        }
    }

    tracing::info!(
        "Loaded {}/{} landing files from {}",
        summaries.len(),
        files.len(),
        dir.display()
    );

    Ok(summaries)
}

/// Fetch from `source`, land the raw batch on disk, then load it.
pub async fn run_market_snapshot_sync(
    db: &DatabaseConnection,
    source: &dyn MarketSource,
    config: &PipelineConfig,
) -> Result<BatchSummary, PipelineError> {
    tracing::info!("Fetching market data from {}", source.source_label());

    let ingested_at = Utc::now();
    let records = source.fetch_markets().await?;

    let batch = LandingBatch {
        ingested_at,
        source: source.source_label().to_string(),
        records,
    };

    write_landing_batch(&config.landing_zone_dir, &batch).await?;

    load_observations(db, config, &batch.source, batch.ingested_at, &batch.records).await
}
