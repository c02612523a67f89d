//! SeaORM Entity for normalized price snapshots
//!
//! One row per (crypto_id, snapshot_time) bucket; later observations that
//! land in an occupied bucket are discarded.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "price_snapshots")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub snapshot_id: i32,
    pub crypto_id: String,
    /// Lineage back to the load run that wrote this row
    pub batch_id: i32,
    /// Bucketed timestamp, part of the dedup key
    pub snapshot_time: DateTimeWithTimeZone,
    pub current_price: Decimal,
    pub high_24h: Option<Decimal>,
    pub low_24h: Option<Decimal>,
    pub price_change_24h: Option<Decimal>,
    pub price_change_pct_24h: Option<Decimal>,
    pub ath: Option<Decimal>,
    pub ath_change_pct: Option<Decimal>,
    pub ath_date: Option<DateTimeWithTimeZone>,
    pub atl: Option<Decimal>,
    pub atl_change_pct: Option<Decimal>,
    pub atl_date: Option<DateTimeWithTimeZone>,
    /// Timestamp reported by the source, before bucketing
    pub last_updated: DateTimeWithTimeZone,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cryptocurrencies::Entity",
        from = "Column::CryptoId",
        to = "super::cryptocurrencies::Column::CryptoId"
    )]
    Cryptocurrencies,
    #[sea_orm(
        belongs_to = "super::ingestion_batches::Entity",
        from = "Column::BatchId",
        to = "super::ingestion_batches::Column::BatchId"
    )]
    IngestionBatches,
    #[sea_orm(has_one = "super::market_metrics::Entity")]
    MarketMetrics,
}

impl Related<super::cryptocurrencies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cryptocurrencies.def()
    }
}

impl Related<super::ingestion_batches::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IngestionBatches.def()
    }
}

impl Related<super::market_metrics::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MarketMetrics.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
