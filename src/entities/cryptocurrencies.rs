//! `SeaORM` Entity for cryptocurrencies master table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cryptocurrencies")]
pub struct Model {
    /// CoinGecko coin id, e.g. "bitcoin"
    #[sea_orm(primary_key, auto_increment = false)]
    pub crypto_id: String,
    pub symbol: String,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub image_url: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
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
