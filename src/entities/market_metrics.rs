//! SeaORM Entity for market metrics, owned 1:1 by a price snapshot

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "market_metrics")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub metric_id: i32,
    #[sea_orm(unique)]
    pub snapshot_id: i32,
    pub market_cap: Option<Decimal>,
    pub market_cap_rank: Option<i32>,
    pub fully_diluted_valuation: Option<Decimal>,
    pub total_volume: Option<Decimal>,
    pub market_cap_change_24h: Option<Decimal>,
    pub market_cap_change_pct_24h: Option<Decimal>,
    pub circulating_supply: Option<Decimal>,
    pub total_supply: Option<Decimal>,
    pub max_supply: Option<Decimal>,
    pub roi_times: Option<Decimal>,
    pub roi_currency: Option<String>,
    pub roi_percentage: Option<Decimal>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::price_snapshots::Entity",
        from = "Column::SnapshotId",
        to = "super::price_snapshots::Column::SnapshotId",
        on_delete = "Cascade"
    )]
    PriceSnapshots,
}

impl Related<super::price_snapshots::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PriceSnapshots.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
