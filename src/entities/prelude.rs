//! `SeaORM` Entity prelude

pub use super::cryptocurrencies::Entity as Cryptocurrencies;
pub use super::ingestion_batches::Entity as IngestionBatches;
pub use super::market_metrics::Entity as MarketMetrics;
pub use super::price_snapshots::Entity as PriceSnapshots;
