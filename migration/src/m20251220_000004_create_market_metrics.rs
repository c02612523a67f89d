use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MarketMetrics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MarketMetrics::MetricId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MarketMetrics::SnapshotId)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(MarketMetrics::MarketCap)
                            .decimal()
                            .null()
                            .check(Expr::col(MarketMetrics::MarketCap).gte(0)),
                    )
                    .col(
                        ColumnDef::new(MarketMetrics::MarketCapRank)
                            .integer()
                            .null()
                            .check(Expr::col(MarketMetrics::MarketCapRank).gt(0)),
                    )
                    .col(
                        ColumnDef::new(MarketMetrics::FullyDilutedValuation)
                            .decimal()
                            .null()
                            .check(Expr::col(MarketMetrics::FullyDilutedValuation).gte(0)),
                    )
                    .col(
                        ColumnDef::new(MarketMetrics::TotalVolume)
                            .decimal()
                            .null()
                            .check(Expr::col(MarketMetrics::TotalVolume).gte(0)),
                    )
                    .col(ColumnDef::new(MarketMetrics::MarketCapChange24h).decimal().null())
                    .col(ColumnDef::new(MarketMetrics::MarketCapChangePct24h).decimal().null())
                    .col(
                        ColumnDef::new(MarketMetrics::CirculatingSupply)
                            .decimal()
                            .null()
                            .check(Expr::col(MarketMetrics::CirculatingSupply).gte(0)),
                    )
                    .col(
                        ColumnDef::new(MarketMetrics::TotalSupply)
                            .decimal()
                            .null()
                            .check(Expr::col(MarketMetrics::TotalSupply).gte(0)),
                    )
                    .col(
                        ColumnDef::new(MarketMetrics::MaxSupply)
                            .decimal()
                            .null()
                            .check(Expr::col(MarketMetrics::MaxSupply).gte(0)),
                    )
                    .col(ColumnDef::new(MarketMetrics::RoiTimes).decimal().null())
                    .col(ColumnDef::new(MarketMetrics::RoiCurrency).string_len(10).null())
                    .col(ColumnDef::new(MarketMetrics::RoiPercentage).decimal().null())
                    .col(
                        ColumnDef::new(MarketMetrics::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    // Supply ordering only enforced when all three figures are known
                    .check(
                        Expr::col(MarketMetrics::MaxSupply)
                            .is_null()
                            .or(Expr::col(MarketMetrics::TotalSupply).is_null())
                            .or(Expr::col(MarketMetrics::CirculatingSupply).is_null())
                            .or(Expr::col(MarketMetrics::MaxSupply)
                                .gte(Expr::col(MarketMetrics::TotalSupply))
                                .and(
                                    Expr::col(MarketMetrics::TotalSupply)
                                        .gte(Expr::col(MarketMetrics::CirculatingSupply)),
                                )),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_market_metrics_snapshot_id")
                            .from(MarketMetrics::Table, MarketMetrics::SnapshotId)
                            .to(PriceSnapshots::Table, PriceSnapshots::SnapshotId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index for rank-ordered reads
        manager
            .create_index(
                Index::create()
                    .name("idx_market_metrics_rank")
                    .table(MarketMetrics::Table)
                    .col(MarketMetrics::MarketCapRank)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MarketMetrics::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum MarketMetrics {
    Table,
    MetricId,
    SnapshotId,
    MarketCap,
    MarketCapRank,
    FullyDilutedValuation,
    TotalVolume,
    #[sea_orm(iden = "market_cap_change_24h")]
    MarketCapChange24h,
    #[sea_orm(iden = "market_cap_change_pct_24h")]
    MarketCapChangePct24h,
    CirculatingSupply,
    TotalSupply,
    MaxSupply,
    RoiTimes,
    RoiCurrency,
    RoiPercentage,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PriceSnapshots {
    Table,
    SnapshotId,
}
