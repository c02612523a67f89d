use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PriceSnapshots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PriceSnapshots::SnapshotId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PriceSnapshots::CryptoId)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PriceSnapshots::BatchId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PriceSnapshots::SnapshotTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PriceSnapshots::CurrentPrice)
                            .decimal()
                            .not_null()
                            .check(Expr::col(PriceSnapshots::CurrentPrice).gt(0)),
                    )
                    .col(ColumnDef::new(PriceSnapshots::High24h).decimal().null())
                    .col(ColumnDef::new(PriceSnapshots::Low24h).decimal().null())
                    .col(ColumnDef::new(PriceSnapshots::PriceChange24h).decimal().null())
                    .col(ColumnDef::new(PriceSnapshots::PriceChangePct24h).decimal().null())
                    .col(ColumnDef::new(PriceSnapshots::Ath).decimal().null())
                    .col(ColumnDef::new(PriceSnapshots::AthChangePct).decimal().null())
                    .col(
                        ColumnDef::new(PriceSnapshots::AthDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(PriceSnapshots::Atl).decimal().null())
                    .col(ColumnDef::new(PriceSnapshots::AtlChangePct).decimal().null())
                    .col(
                        ColumnDef::new(PriceSnapshots::AtlDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PriceSnapshots::LastUpdated)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PriceSnapshots::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    // 24h range must be ordered whenever both ends are known
                    .check(
                        Expr::col(PriceSnapshots::High24h)
                            .is_null()
                            .or(Expr::col(PriceSnapshots::Low24h).is_null())
                            .or(Expr::col(PriceSnapshots::High24h)
                                .gte(Expr::col(PriceSnapshots::Low24h))),
                    )
                    // SQLite cannot add foreign keys after the fact, so declare them inline
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_price_snapshots_crypto_id")
                            .from(PriceSnapshots::Table, PriceSnapshots::CryptoId)
                            .to(Cryptocurrencies::Table, Cryptocurrencies::CryptoId)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_price_snapshots_batch_id")
                            .from(PriceSnapshots::Table, PriceSnapshots::BatchId)
                            .to(IngestionBatches::Table, IngestionBatches::BatchId)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Deduplication grain: one snapshot per coin per bucket
        manager
            .create_index(
                Index::create()
                    .name("idx_price_snapshots_crypto_time_unique")
                    .table(PriceSnapshots::Table)
                    .col(PriceSnapshots::CryptoId)
                    .col(PriceSnapshots::SnapshotTime)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index for batch lineage lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_price_snapshots_batch_id")
                    .table(PriceSnapshots::Table)
                    .col(PriceSnapshots::BatchId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_price_snapshots_snapshot_time")
                    .table(PriceSnapshots::Table)
                    .col(PriceSnapshots::SnapshotTime)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PriceSnapshots::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PriceSnapshots {
    Table,
    SnapshotId,
    CryptoId,
    BatchId,
    SnapshotTime,
    CurrentPrice,
    #[sea_orm(iden = "high_24h")]
    High24h,
    #[sea_orm(iden = "low_24h")]
    Low24h,
    #[sea_orm(iden = "price_change_24h")]
    PriceChange24h,
    #[sea_orm(iden = "price_change_pct_24h")]
    PriceChangePct24h,
    Ath,
    AthChangePct,
    AthDate,
    Atl,
    AtlChangePct,
    AtlDate,
    LastUpdated,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Cryptocurrencies {
    Table,
    CryptoId,
}

#[derive(DeriveIden)]
enum IngestionBatches {
    Table,
    BatchId,
}
