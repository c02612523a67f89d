// src/lib.rs

pub mod entities {
    pub mod prelude;
    pub mod cryptocurrencies;
    pub mod ingestion_batches;
    pub mod market_metrics;
    pub mod price_snapshots;
}

pub mod services {
    pub mod batch_tracker;
    pub mod bucketing;
    pub mod coingecko;
    pub mod conditional_write;
    pub mod landing_zone;
    pub mod lineage;
    pub mod market_source;
    pub mod reference_data;
    pub mod snapshot_loader;
    pub mod validation;
}

pub mod config;
pub mod database;
pub mod jobs;
pub mod models;
