mod common;

use std::io;

use async_trait::async_trait;
use chrono::Duration;
use rust_decimal_macros::dec;
use sea_orm::{
    sqlx, DatabaseBackend, DbErr, EntityTrait, MockDatabase, PaginatorTrait, RuntimeErr,
};

use crypto_pipeline::entities::ingestion_batches;
use crypto_pipeline::entities::prelude::{Cryptocurrencies, IngestionBatches, PriceSnapshots};
use crypto_pipeline::jobs::market_snapshot_sync::{
    load_observations, run_market_snapshot_sync, PipelineError,
};
use crypto_pipeline::models::observation::RawObservation;
use crypto_pipeline::models::summary::FailureStage;
use crypto_pipeline::services::batch_tracker::{
    close_batch, find_batch, open_batch, BatchError, BatchStatus,
};
use crypto_pipeline::services::landing_zone::{list_landing_files, read_landing_batch};
use crypto_pipeline::services::lineage::{snapshot_at, snapshots_in_batch};
use crypto_pipeline::services::market_source::{MarketSource, SourceError};
use crypto_pipeline::services::reference_data::upsert_cryptocurrency;

use common::{at, observation, setup_test_db, test_config};

#[tokio::test]
async fn test_batch_loads_and_completes() {
    let db = setup_test_db().await.unwrap();
    let config = test_config();
    let records = vec![
        observation("bitcoin", 67000.5, at(10, 14)),
        observation("ethereum", 3500.25, at(10, 14)),
        observation("solana", 145.5, at(10, 13)),
    ];

    let summary = load_observations(&db, &config, "CoinGecko", at(10, 15), &records)
        .await
        .unwrap();

    assert_eq!(summary.declared, 3);
    assert_eq!(summary.loaded, 3);
    assert_eq!(summary.skipped_duplicate, 0);
    assert_eq!(summary.failed, 0);

    let batch = find_batch(&db, summary.batch_id).await.unwrap().unwrap();
    assert_eq!(batch.status, "completed");
    assert_eq!(batch.record_count, 3);
    assert_eq!(batch.source, "CoinGecko");

    let (snapshot, metrics) = snapshot_at(&db, "bitcoin", at(10, 15)).await.unwrap().unwrap();
    assert_eq!(snapshot.current_price, dec!(67000.5));
    assert_eq!(snapshot.batch_id, summary.batch_id);
    assert_eq!(snapshot.last_updated, at(10, 14).fixed_offset());

    let metrics = metrics.expect("metrics written with snapshot");
    assert_eq!(metrics.market_cap, Some(dec!(67000500000)));
    assert_eq!(metrics.market_cap_rank, Some(1));
}

#[tokio::test]
async fn test_reloading_same_batch_is_idempotent() {
    let db = setup_test_db().await.unwrap();
    let config = test_config();
    let records = vec![
        observation("bitcoin", 67000.5, at(10, 14)),
        observation("ethereum", 3500.25, at(10, 14)),
    ];

    let first = load_observations(&db, &config, "CoinGecko", at(10, 15), &records)
        .await
        .unwrap();
    let second = load_observations(&db, &config, "CoinGecko", at(10, 16), &records)
        .await
        .unwrap();

    assert_eq!(first.loaded, 2);
    assert_eq!(second.loaded, 0);
    assert_eq!(second.skipped_duplicate, 2);
    assert_eq!(second.failed, 0);

    assert_eq!(PriceSnapshots::find().count(&db).await.unwrap(), 2);
    assert_eq!(Cryptocurrencies::find().count(&db).await.unwrap(), 2);
    assert_eq!(IngestionBatches::find().count(&db).await.unwrap(), 2);

    // The duplicate run still gets its own completed batch, with no rows under it
    let batch = find_batch(&db, second.batch_id).await.unwrap().unwrap();
    assert_eq!(batch.status, "completed");
    assert!(snapshots_in_batch(&db, second.batch_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_first_write_wins_across_batches() {
    let db = setup_test_db().await.unwrap();
    let config = test_config();

    let first = load_observations(
        &db,
        &config,
        "CoinGecko",
        at(10, 15),
        &[observation("bitcoin", 67000.5, at(10, 14))],
    )
    .await
    .unwrap();

    // Same bucket, different price
    load_observations(
        &db,
        &config,
        "CoinGecko",
        at(10, 16),
        &[observation("bitcoin", 68000.5, at(10, 16))],
    )
    .await
    .unwrap();

    let (snapshot, _) = snapshot_at(&db, "bitcoin", at(10, 15)).await.unwrap().unwrap();
    assert_eq!(snapshot.current_price, dec!(67000.5));
    assert_eq!(snapshot.batch_id, first.batch_id);
}

#[tokio::test]
async fn test_ninety_six_minutes_of_observations_collapse_to_buckets() {
    let db = setup_test_db().await.unwrap();
    let config = test_config();

    let records: Vec<RawObservation> = (0..96)
        .map(|minute| {
            observation(
                "bitcoin",
                67000.0 + minute as f64,
                at(10, 0) + Duration::minutes(minute),
            )
        })
        .collect();

    let summary = load_observations(&db, &config, "CoinGecko", at(11, 36), &records)
        .await
        .unwrap();

    assert_eq!(summary.declared, 96);
    assert_eq!(summary.loaded, 20);
    assert_eq!(summary.skipped_duplicate, 76);
    assert_eq!(summary.failed, 0);
    assert_eq!(PriceSnapshots::find().count(&db).await.unwrap(), 20);

    // 10:03 is the first observation that rounds up into 10:05
    let (snapshot, _) = snapshot_at(&db, "bitcoin", at(10, 5)).await.unwrap().unwrap();
    assert_eq!(snapshot.current_price, dec!(67003));
}

#[tokio::test]
async fn test_out_of_order_arrival_keeps_first_delivered() {
    let db = setup_test_db().await.unwrap();
    let config = test_config();
    let records = vec![
        observation("bitcoin", 67000.5, at(10, 14)),
        observation("bitcoin", 66000.5, at(10, 13)),
        // Late arrival for an earlier, still empty bucket
        observation("bitcoin", 65000.5, at(10, 2)),
    ];

    let summary = load_observations(&db, &config, "CoinGecko", at(10, 15), &records)
        .await
        .unwrap();

    assert_eq!(summary.loaded, 2);
    assert_eq!(summary.skipped_duplicate, 1);

    let (snapshot, _) = snapshot_at(&db, "bitcoin", at(10, 15)).await.unwrap().unwrap();
    assert_eq!(snapshot.current_price, dec!(67000.5));
    assert_eq!(snapshot.last_updated, at(10, 14).fixed_offset());

    let (snapshot, _) = snapshot_at(&db, "bitcoin", at(10, 0)).await.unwrap().unwrap();
    assert_eq!(snapshot.current_price, dec!(65000.5));
}

#[tokio::test]
async fn test_invalid_record_is_counted_and_batch_completes() {
    let db = setup_test_db().await.unwrap();
    let config = test_config();

    let mut nameless = observation("ethereum", 3500.25, at(10, 14));
    nameless.id = String::new();

    let mut inverted = observation("solana", 145.5, at(10, 14));
    inverted.high_24h = Some(100.0);
    inverted.low_24h = Some(200.0);

    let records = vec![observation("bitcoin", 67000.5, at(10, 14)), nameless, inverted];

    let summary = load_observations(&db, &config, "CoinGecko", at(10, 15), &records)
        .await
        .unwrap();

    assert_eq!(summary.loaded, 1);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.processed(), summary.declared);

    assert_eq!(summary.failures[0].position, 1);
    assert_eq!(summary.failures[0].crypto_id, "");
    assert_eq!(summary.failures[0].stage, FailureStage::Validation);
    assert!(summary.failures[0].reason.contains("'id'"));

    assert_eq!(summary.failures[1].crypto_id, "solana");
    assert_eq!(summary.failures[1].stage, FailureStage::Validation);

    // Rejected records never reach the reference table
    assert_eq!(Cryptocurrencies::find().count(&db).await.unwrap(), 1);

    let batch = find_batch(&db, summary.batch_id).await.unwrap().unwrap();
    assert_eq!(batch.status, "completed");
    assert_eq!(batch.record_count, 3);
}

#[tokio::test]
async fn test_unrepresentable_number_is_a_storage_failure() {
    let db = setup_test_db().await.unwrap();
    let config = test_config();

    let mut huge = observation("ethereum", 3500.25, at(10, 14));
    huge.total_volume = Some(1e40);

    let records = vec![huge, observation("bitcoin", 67000.5, at(10, 14))];

    let summary = load_observations(&db, &config, "CoinGecko", at(10, 15), &records)
        .await
        .unwrap();

    assert_eq!(summary.loaded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures[0].crypto_id, "ethereum");
    assert_eq!(summary.failures[0].stage, FailureStage::Storage);
    assert!(summary.failures[0].reason.contains("total_volume"));

    assert!(snapshot_at(&db, "ethereum", at(10, 15)).await.unwrap().is_none());
    assert_eq!(
        find_batch(&db, summary.batch_id).await.unwrap().unwrap().status,
        "completed"
    );
}

#[tokio::test]
async fn test_unreachable_store_aborts_before_any_write() {
    let db = setup_test_db().await.unwrap();
    let config = test_config();
    let handle = db.clone();
    db.close().await.unwrap();

    let err = load_observations(
        &handle,
        &config,
        "CoinGecko",
        at(10, 15),
        &[observation("bitcoin", 67000.5, at(10, 14))],
    )
    .await
    .unwrap_err();

    assert!(matches!(err, PipelineError::BatchOpen(_)));
}

#[tokio::test]
async fn test_store_lost_mid_batch_aborts_without_completing() {
    let config = test_config();
    let opened = ingestion_batches::Model {
        batch_id: 1,
        ingested_at: at(10, 15).fixed_offset(),
        source: "CoinGecko".to_string(),
        record_count: 2,
        status: "pending".to_string(),
        created_at: at(10, 15).fixed_offset(),
    };

    // The batch row is written; every statement after that hits a dropped connection
    let connection_reset = || {
        DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Io(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        ))))
    };
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![opened]])
        .append_query_errors([connection_reset(), connection_reset()])
        .append_exec_errors([
            DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::PoolClosed)),
            DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::PoolClosed)),
        ])
        .into_connection();

    let records = vec![
        observation("bitcoin", 67000.5, at(10, 14)),
        observation("ethereum", 3500.25, at(10, 14)),
    ];

    let err = load_observations(&db, &config, "CoinGecko", at(10, 15), &records)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::StoreUnavailable { batch_id: 1, ref source } if source.is_connectivity()
    ));

    // Nothing ever tried to mark the batch completed
    let log = format!("{:?}", db.into_transaction_log());
    assert!(log.contains("ingestion_batches"));
    assert!(!log.contains("completed"));
}

#[tokio::test]
async fn test_low_priced_coins_are_loaded() {
    let db = setup_test_db().await.unwrap();
    let config = test_config();
    let records = vec![
        observation("dogecoin", 0.125, at(10, 14)),
        observation("shiba-inu", 0.0000125, at(10, 14)),
    ];

    let summary = load_observations(&db, &config, "CoinGecko", at(10, 15), &records)
        .await
        .unwrap();

    assert_eq!(summary.loaded, 2, "{:?}", summary.failures);
    assert_eq!(summary.failed, 0);

    let (snapshot, _) = snapshot_at(&db, "dogecoin", at(10, 15)).await.unwrap().unwrap();
    assert_eq!(snapshot.current_price, dec!(0.125));
}

#[tokio::test]
async fn test_reference_upsert_refreshes_but_keeps_created_at() {
    let db = setup_test_db().await.unwrap();

    let mut first = observation("bitcoin", 67000.5, at(10, 0));
    first.name = "Bitcoin".to_string();
    upsert_cryptocurrency(&db, &first, at(10, 0)).await.unwrap();

    let mut renamed = first.clone();
    renamed.name = "Bitcoin (BTC)".to_string();
    renamed.image = None;
    upsert_cryptocurrency(&db, &renamed, at(12, 30)).await.unwrap();

    let stored = Cryptocurrencies::find_by_id("bitcoin".to_string())
        .one(&db)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(stored.name, "Bitcoin (BTC)");
    assert_eq!(stored.image_url, None);
    assert_eq!(stored.created_at, at(10, 0).fixed_offset());
    assert_eq!(stored.updated_at, at(12, 30).fixed_offset());
    assert_eq!(Cryptocurrencies::find().count(&db).await.unwrap(), 1);
}

#[tokio::test]
async fn test_completed_batch_cannot_be_closed_again() {
    let db = setup_test_db().await.unwrap();

    let batch_id = open_batch(&db, at(10, 0), "CoinGecko", 0).await.unwrap();
    assert_eq!(find_batch(&db, batch_id).await.unwrap().unwrap().status, "pending");

    close_batch(&db, batch_id, BatchStatus::Completed).await.unwrap();

    assert!(matches!(
        close_batch(&db, batch_id, BatchStatus::Failed).await,
        Err(BatchError::AlreadyClosed(id)) if id == batch_id
    ));
    assert!(matches!(
        close_batch(&db, batch_id + 100, BatchStatus::Completed).await,
        Err(BatchError::NotFound(_))
    ));
    assert_eq!(find_batch(&db, batch_id).await.unwrap().unwrap().status, "completed");
}

struct FixtureSource {
    records: Vec<RawObservation>,
}

#[async_trait]
impl MarketSource for FixtureSource {
    fn source_label(&self) -> &str {
        "Fixture"
    }

    async fn fetch_markets(&self) -> Result<Vec<RawObservation>, SourceError> {
        Ok(self.records.clone())
    }
}

struct DownSource;

#[async_trait]
impl MarketSource for DownSource {
    fn source_label(&self) -> &str {
        "Down"
    }

    async fn fetch_markets(&self) -> Result<Vec<RawObservation>, SourceError> {
        Err(SourceError::RetriesExhausted {
            attempts: 3,
            last_error: "rate limited".to_string(),
        })
    }
}

#[tokio::test]
async fn test_sync_lands_raw_batch_then_loads_it() {
    let db = setup_test_db().await.unwrap();
    let landing = tempfile::tempdir().unwrap();
    let mut config = test_config();
    config.landing_zone_dir = landing.path().join("incoming");

    let source = FixtureSource {
        records: vec![
            observation("bitcoin", 67000.5, at(10, 14)),
            observation("ethereum", 3500.25, at(10, 14)),
        ],
    };

    let summary = run_market_snapshot_sync(&db, &source, &config).await.unwrap();
    assert_eq!(summary.source, "Fixture");
    assert_eq!(summary.loaded, 2);

    let files = list_landing_files(&config.landing_zone_dir).await.unwrap();
    assert_eq!(files.len(), 1);

    let landed = read_landing_batch(&files[0]).await.unwrap();
    assert_eq!(landed.source, "Fixture");
    assert_eq!(landed.records, source.records);
}

#[tokio::test]
async fn test_sync_source_failure_opens_no_batch() {
    let db = setup_test_db().await.unwrap();
    let landing = tempfile::tempdir().unwrap();
    let mut config = test_config();
    config.landing_zone_dir = landing.path().to_path_buf();

    let err = run_market_snapshot_sync(&db, &DownSource, &config).await.unwrap_err();

    assert!(matches!(err, PipelineError::Source(_)));
    assert_eq!(IngestionBatches::find().count(&db).await.unwrap(), 0);
    assert!(list_landing_files(landing.path()).await.unwrap().is_empty());
}
