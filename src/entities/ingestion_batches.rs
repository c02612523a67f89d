//! `SeaORM` Entity for ingestion_batches table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ingestion_batches")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub batch_id: i32,
    /// When the source payload was captured
    pub ingested_at: DateTimeWithTimeZone,
    pub source: String,
    /// Number of records the payload declared, valid or not
    pub record_count: i32,
    /// 'pending', 'completed' or 'failed'
    pub status: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::price_snapshots::Entity")]
    PriceSnapshots,
}

impl Related<super::price_snapshots::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PriceSnapshots.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
