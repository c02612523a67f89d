#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

use crypto_pipeline::config::PipelineConfig;
use crypto_pipeline::models::observation::RawObservation;

/// Fresh in-memory database with the real migrations applied.
///
/// A single pooled connection keeps every query on the same in-memory file.
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

pub fn test_config() -> PipelineConfig {
    PipelineConfig::from_lookup(|name| match name {
        "DATABASE_URL" => Some("sqlite::memory:".to_string()),
        _ => None,
    })
    .expect("test config")
}

/// 2025-12-20 at `hour:minute:00` UTC
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 12, 20, hour, minute, 0).unwrap()
}

/// A fully populated, valid observation.
pub fn observation(id: &str, price: f64, last_updated: DateTime<Utc>) -> RawObservation {
    RawObservation {
        id: id.to_string(),
        symbol: id.chars().take(3).collect(),
        name: capitalize(id),
        image: Some(format!("https://assets.coingecko.com/coins/images/{id}.png")),
        current_price: Some(price),
        market_cap: Some(price * 1_000_000.0),
        market_cap_rank: Some(1),
        fully_diluted_valuation: Some(price * 1_100_000.0),
        total_volume: Some(25_000_000_000.0),
        high_24h: Some(price * 1.01),
        low_24h: Some(price * 0.99),
        price_change_24h: Some(-125.5),
        price_change_percentage_24h: Some(-0.25),
        market_cap_change_24h: Some(-1_250_000.0),
        market_cap_change_percentage_24h: Some(-0.5),
        circulating_supply: Some(19_500_000.0),
        total_supply: Some(21_000_000.0),
        max_supply: Some(21_000_000.0),
        ath: Some(price * 2.0),
        ath_change_percentage: Some(-50.0),
        ath_date: Some(Utc.with_ymd_and_hms(2024, 3, 14, 7, 10, 36).unwrap()),
        atl: Some(67.5),
        atl_change_percentage: Some(99_000.0),
        atl_date: Some(Utc.with_ymd_and_hms(2013, 7, 6, 0, 0, 0).unwrap()),
        roi: None,
        last_updated: Some(last_updated),
    }
}

fn capitalize(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
