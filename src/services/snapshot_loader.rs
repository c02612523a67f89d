//! Snapshot Loader
//!
//! Persists one normalized observation as a `price_snapshots` row plus its
//! `market_metrics` row, at most once per (crypto_id, snapshot_time).
//!
//! - First write wins: a second observation for an occupied bucket is
//!   reported as a duplicate and the stored row is left untouched.
//! - Metrics are only written when the snapshot insert created a new row.
//! - Both inserts share one transaction, so a snapshot never exists
//!   without its metrics.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    sqlx, ActiveModelTrait, ConnectionTrait, DatabaseConnection, DbErr, NotSet, RuntimeErr, Set,
    TransactionTrait,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::entities::{market_metrics, price_snapshots};
use crate::models::observation::RawObservation;
use crate::services::bucketing::{snapshot_bucket, BucketWidth};
use crate::services::conditional_write::{conditional_insert, ConflictPolicy, WriteOutcome};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("record has no last_updated timestamp")]
    MissingTimestamp,
    #[error("record has no current_price")]
    MissingPrice,
    #[error("{field} value {value} cannot be stored as a decimal")]
    NumericOverflow { field: &'static str, value: f64 },
    #[error("store rejected record: {0}")]
    Constraint(#[source] DbErr),
    #[error("store unavailable: {0}")]
    Connectivity(#[source] DbErr),
}

impl LoadError {
    /// Run-level errors abort the batch; everything else only costs one record.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, LoadError::Connectivity(_))
    }
}

impl From<DbErr> for LoadError {
    fn from(err: DbErr) -> Self {
        if is_connection_loss(&err) {
            LoadError::Connectivity(err)
        } else {
            LoadError::Constraint(err)
        }
    }
}

/// A statement that was already running surfaces a dropped connection as
/// `Exec`/`Query` wrapping the driver error, not as `Conn`.
fn is_connection_loss(err: &DbErr) -> bool {
    match err {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => true,
        DbErr::Exec(RuntimeErr::SqlxError(e)) | DbErr::Query(RuntimeErr::SqlxError(e)) => matches!(
            e,
            sqlx::Error::Io(_)
                | sqlx::Error::PoolClosed
                | sqlx::Error::PoolTimedOut
                | sqlx::Error::WorkerCrashed
        ),
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Inserted {
        snapshot_id: i32,
        snapshot_time: DateTime<Utc>,
    },
    Duplicate {
        snapshot_time: DateTime<Utc>,
    },
}

/// Load one validated observation for `crypto_id` under `batch_id`.
pub async fn load_snapshot(
    db: &DatabaseConnection,
    crypto_id: &str,
    batch_id: i32,
    observation: &RawObservation,
    width: BucketWidth,
) -> Result<LoadOutcome, LoadError> {
    let last_updated = observation.last_updated.ok_or(LoadError::MissingTimestamp)?;
    let snapshot_time = snapshot_bucket(last_updated, width);

    // Convert everything up front so a bad number never opens a transaction
    let snapshot = snapshot_model(crypto_id, batch_id, observation, last_updated, snapshot_time)?;
    let metrics = metrics_model(observation)?;

    let txn = db.begin().await?;

    match insert_snapshot_with_metrics(&txn, snapshot, metrics).await {
        Ok(Some(snapshot_id)) => {
            txn.commit().await?;
            debug!(
                crypto_id = %crypto_id,
                snapshot_id = snapshot_id,
                snapshot_time = %snapshot_time,
                "Inserted price snapshot"
            );
            Ok(LoadOutcome::Inserted {
                snapshot_id,
                snapshot_time,
            })
        }
        Ok(None) => {
            txn.rollback().await?;
            debug!(
                crypto_id = %crypto_id,
                snapshot_time = %snapshot_time,
                "Duplicate snapshot - skipped"
            );
            Ok(LoadOutcome::Duplicate { snapshot_time })
        }
        Err(e) => {
            if let Err(rollback_err) = txn.rollback().await {
                warn!(crypto_id = %crypto_id, error = %rollback_err, "Rollback failed");
            }
            Err(e.into())
        }
    }
}

/// Returns the new snapshot id, or `None` when the bucket was already taken.
async fn insert_snapshot_with_metrics<C>(
    conn: &C,
    snapshot: price_snapshots::ActiveModel,
    mut metrics: market_metrics::ActiveModel,
) -> Result<Option<i32>, DbErr>
where
    C: ConnectionTrait,
{
    let outcome = conditional_insert(
        conn,
        snapshot,
        ConflictPolicy::SkipOnConflict {
            key: vec![
                price_snapshots::Column::CryptoId,
                price_snapshots::Column::SnapshotTime,
            ],
        },
    )
    .await?;

    let snapshot_id = match outcome {
        WriteOutcome::Written(id) => id,
        WriteOutcome::Skipped => return Ok(None),
    };

    metrics.snapshot_id = Set(snapshot_id);
    metrics.insert(conn).await?;

    Ok(Some(snapshot_id))
}

fn snapshot_model(
    crypto_id: &str,
    batch_id: i32,
    observation: &RawObservation,
    last_updated: DateTime<Utc>,
    snapshot_time: DateTime<Utc>,
) -> Result<price_snapshots::ActiveModel, LoadError> {
    let price = observation.current_price.ok_or(LoadError::MissingPrice)?;
    let current_price = Decimal::from_f64(price).ok_or(LoadError::NumericOverflow {
        field: "current_price",
        value: price,
    })?;

    Ok(price_snapshots::ActiveModel {
        snapshot_id: NotSet,
        crypto_id: Set(crypto_id.to_string()),
        batch_id: Set(batch_id),
        snapshot_time: Set(snapshot_time.fixed_offset()),
        current_price: Set(current_price),
        high_24h: Set(decimal("high_24h", observation.high_24h)?),
        low_24h: Set(decimal("low_24h", observation.low_24h)?),
        price_change_24h: Set(decimal("price_change_24h", observation.price_change_24h)?),
        price_change_pct_24h: Set(decimal(
            "price_change_percentage_24h",
            observation.price_change_percentage_24h,
        )?),
        ath: Set(decimal("ath", observation.ath)?),
        ath_change_pct: Set(decimal("ath_change_percentage", observation.ath_change_percentage)?),
        ath_date: Set(observation.ath_date.map(|d| d.fixed_offset())),
        atl: Set(decimal("atl", observation.atl)?),
        atl_change_pct: Set(decimal("atl_change_percentage", observation.atl_change_percentage)?),
        atl_date: Set(observation.atl_date.map(|d| d.fixed_offset())),
        last_updated: Set(last_updated.fixed_offset()),
        created_at: Set(Utc::now().fixed_offset()),
    })
}

fn metrics_model(observation: &RawObservation) -> Result<market_metrics::ActiveModel, LoadError> {
    // roi is null for most coins
    let roi = observation.roi.clone().unwrap_or_default();

    Ok(market_metrics::ActiveModel {
        metric_id: NotSet,
        snapshot_id: NotSet,
        market_cap: Set(decimal("market_cap", observation.market_cap)?),
        market_cap_rank: Set(observation.market_cap_rank),
        fully_diluted_valuation: Set(decimal(
            "fully_diluted_valuation",
            observation.fully_diluted_valuation,
        )?),
        total_volume: Set(decimal("total_volume", observation.total_volume)?),
        market_cap_change_24h: Set(decimal(
            "market_cap_change_24h",
            observation.market_cap_change_24h,
        )?),
        market_cap_change_pct_24h: Set(decimal(
            "market_cap_change_percentage_24h",
            observation.market_cap_change_percentage_24h,
        )?),
        circulating_supply: Set(decimal("circulating_supply", observation.circulating_supply)?),
        total_supply: Set(decimal("total_supply", observation.total_supply)?),
        max_supply: Set(decimal("max_supply", observation.max_supply)?),
        roi_times: Set(decimal("roi.times", roi.times)?),
        roi_currency: Set(roi.currency),
        roi_percentage: Set(decimal("roi.percentage", roi.percentage)?),
        created_at: Set(Utc::now().fixed_offset()),
    })
}

/// Absent stays absent; a present value that does not fit a Decimal is an error.
fn decimal(field: &'static str, value: Option<f64>) -> Result<Option<Decimal>, LoadError> {
    match value {
        None => Ok(None),
        Some(v) => Decimal::from_f64(v)
            .map(Some)
            .ok_or(LoadError::NumericOverflow { field, value: v }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io;

    #[test]
    fn test_connection_errors_are_run_level() {
        let err = LoadError::from(DbErr::Conn(RuntimeErr::Internal("connection reset".into())));
        assert!(err.is_connectivity());
    }

    #[test]
    fn test_connection_lost_mid_statement_is_run_level() {
        let dropped = [
            DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Io(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )))),
            DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "broken pipe",
            )))),
            DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::PoolClosed)),
            DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::PoolTimedOut)),
            DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::WorkerCrashed)),
        ];

        for err in dropped {
            let described = err.to_string();
            assert!(LoadError::from(err).is_connectivity(), "{described}");
        }
    }

    #[test]
    fn test_driver_errors_other_than_connection_loss_are_record_level() {
        let err = LoadError::from(DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::RowNotFound)));
        assert!(matches!(err, LoadError::Constraint(_)));

        let err = LoadError::from(DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Protocol(
            "unexpected message".to_string(),
        ))));
        assert!(!err.is_connectivity());
    }

    #[test]
    fn test_other_store_errors_are_record_level() {
        let err = LoadError::from(DbErr::Custom("CHECK constraint failed: market_cap".into()));
        assert!(!err.is_connectivity());
        assert!(err.to_string().contains("store rejected record"));

        let err = LoadError::NumericOverflow { field: "market_cap", value: 1e40 };
        assert!(!err.is_connectivity());
    }

    #[test]
    fn test_decimal_keeps_absent_values_absent() {
        assert_eq!(decimal("market_cap", None).unwrap(), None);
        assert_eq!(decimal("current_price", Some(67123.5)).unwrap(), Some(dec!(67123.5)));
        assert_eq!(decimal("price_change_24h", Some(-12.25)).unwrap(), Some(dec!(-12.25)));
    }

    #[test]
    fn test_decimal_rejects_unrepresentable_values() {
        assert!(matches!(
            decimal("total_supply", Some(1e40)),
            Err(LoadError::NumericOverflow { field: "total_supply", .. })
        ));
        assert!(matches!(
            decimal("total_supply", Some(f64::INFINITY)),
            Err(LoadError::NumericOverflow { .. })
        ));
    }
}
