//! Read-side lineage queries over the normalized store, plus archival purge.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Query;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};

use crate::entities::{
    market_metrics, price_snapshots,
    prelude::{MarketMetrics, PriceSnapshots},
};

/// Snapshots for one cryptocurrency with `from <= snapshot_time <= to`, oldest first.
pub async fn snapshots_for<C>(
    conn: &C,
    crypto_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<price_snapshots::Model>, DbErr>
where
    C: ConnectionTrait,
{
    PriceSnapshots::find()
        .filter(price_snapshots::Column::CryptoId.eq(crypto_id))
        .filter(price_snapshots::Column::SnapshotTime.gte(from.fixed_offset()))
        .filter(price_snapshots::Column::SnapshotTime.lte(to.fixed_offset()))
        .order_by_asc(price_snapshots::Column::SnapshotTime)
        .all(conn)
        .await
}

/// The snapshot stored for `(crypto_id, snapshot_time)` together with its metrics.
pub async fn snapshot_at<C>(
    conn: &C,
    crypto_id: &str,
    snapshot_time: DateTime<Utc>,
) -> Result<Option<(price_snapshots::Model, Option<market_metrics::Model>)>, DbErr>
where
    C: ConnectionTrait,
{
    PriceSnapshots::find()
        .find_also_related(MarketMetrics)
        .filter(price_snapshots::Column::CryptoId.eq(crypto_id))
        .filter(price_snapshots::Column::SnapshotTime.eq(snapshot_time.fixed_offset()))
        .one(conn)
        .await
}

/// Every snapshot written by one ingestion batch.
pub async fn snapshots_in_batch<C>(conn: &C, batch_id: i32) -> Result<Vec<price_snapshots::Model>, DbErr>
where
    C: ConnectionTrait,
{
    PriceSnapshots::find()
        .filter(price_snapshots::Column::BatchId.eq(batch_id))
        .order_by_asc(price_snapshots::Column::CryptoId)
        .order_by_asc(price_snapshots::Column::SnapshotTime)
        .all(conn)
        .await
}

/// Delete snapshots older than `cutoff` and their metrics. Returns the number
/// of snapshots removed.
pub async fn purge_snapshots_before<C>(conn: &C, cutoff: DateTime<Utc>) -> Result<u64, DbErr>
where
    C: ConnectionTrait + TransactionTrait,
{
    let cutoff = cutoff.fixed_offset();
    let txn = conn.begin().await?;

    // Metrics first: not every connection enforces the cascade
    let expired = Query::select()
        .column(price_snapshots::Column::SnapshotId)
        .from(PriceSnapshots)
        .and_where(price_snapshots::Column::SnapshotTime.lt(cutoff))
        .to_owned();

    let metrics = MarketMetrics::delete_many()
        .filter(market_metrics::Column::SnapshotId.in_subquery(expired))
        .exec(&txn)
        .await?;

    let snapshots = PriceSnapshots::delete_many()
        .filter(price_snapshots::Column::SnapshotTime.lt(cutoff))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(
        cutoff = %cutoff,
        snapshots = snapshots.rows_affected,
        metrics = metrics.rows_affected,
        "Purged expired price snapshots"
    );

    Ok(snapshots.rows_affected)
}
