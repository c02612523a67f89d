//! Ingestion batch audit trail
//!
//! Every load run opens one `ingestion_batches` row before any snapshot can
//! reference it, and closes it as completed or failed at the end. Completed
//! batches are never modified again.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, Set};
use thiserror::Error;

use crate::entities::{ingestion_batches, prelude::IngestionBatches};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Pending,
    Completed,
    Failed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchStatus {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BatchStatus::Pending),
            "completed" => Ok(BatchStatus::Completed),
            "failed" => Ok(BatchStatus::Failed),
            other => Err(BatchError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("ingestion batch {0} not found")]
    NotFound(i32),
    #[error("ingestion batch {0} is already completed")]
    AlreadyClosed(i32),
    #[error("unknown batch status '{0}'")]
    UnknownStatus(String),
    #[error("record count {0} does not fit the batch table")]
    RecordCountOverflow(usize),
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Create a pending batch and return its id.
pub async fn open_batch<C>(
    conn: &C,
    ingested_at: DateTime<Utc>,
    source: &str,
    declared_count: usize,
) -> Result<i32, BatchError>
where
    C: ConnectionTrait,
{
    let record_count =
        i32::try_from(declared_count).map_err(|_| BatchError::RecordCountOverflow(declared_count))?;

    let batch = ingestion_batches::ActiveModel {
        ingested_at: Set(ingested_at.fixed_offset()),
        source: Set(source.to_string()),
        record_count: Set(record_count),
        status: Set(BatchStatus::Pending.as_str().to_string()),
        created_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    };

    let batch = batch.insert(conn).await?;

    tracing::info!(
        batch_id = batch.batch_id,
        source = %source,
        record_count = record_count,
        "Created ingestion batch"
    );

    Ok(batch.batch_id)
}

/// Move a batch to its final status.
pub async fn close_batch<C>(conn: &C, batch_id: i32, status: BatchStatus) -> Result<(), BatchError>
where
    C: ConnectionTrait,
{
    let batch = IngestionBatches::find_by_id(batch_id)
        .one(conn)
        .await?
        .ok_or(BatchError::NotFound(batch_id))?;

    if batch.status.parse::<BatchStatus>()? == BatchStatus::Completed {
        return Err(BatchError::AlreadyClosed(batch_id));
    }

    let mut active_model: ingestion_batches::ActiveModel = batch.into();
    active_model.status = Set(status.as_str().to_string());
    active_model.update(conn).await?;

    tracing::debug!(batch_id = batch_id, status = %status, "Closed ingestion batch");
    Ok(())
}

pub async fn find_batch<C>(conn: &C, batch_id: i32) -> Result<Option<ingestion_batches::Model>, DbErr>
where
    C: ConnectionTrait,
{
    IngestionBatches::find_by_id(batch_id).one(conn).await
}
