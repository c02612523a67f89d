use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One element of the CoinGecko `/coins/markets` response, before normalization.
///
/// Numeric fields stay `None` when the API omits them or sends `null`; they are
/// never coerced to zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    pub image: Option<String>,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<i32>,
    pub fully_diluted_valuation: Option<f64>,
    pub total_volume: Option<f64>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub price_change_24h: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub market_cap_change_24h: Option<f64>,
    pub market_cap_change_percentage_24h: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub max_supply: Option<f64>,
    pub ath: Option<f64>,
    pub ath_change_percentage: Option<f64>,
    pub ath_date: Option<DateTime<Utc>>,
    pub atl: Option<f64>,
    pub atl_change_percentage: Option<f64>,
    pub atl_date: Option<DateTime<Utc>>,
    pub roi: Option<Roi>,
    /// Source-reported observation time; the snapshot bucket is derived from it
    pub last_updated: Option<DateTime<Utc>>,
}

/// Return-on-investment block, `null` for most coins
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Roi {
    pub times: Option<f64>,
    pub currency: Option<String>,
    pub percentage: Option<f64>,
}

/// Landing-zone envelope written by the ingest step and consumed by the loader
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandingBatch {
    pub ingested_at: DateTime<Utc>,
    pub source: String,
    pub records: Vec<RawObservation>,
}
