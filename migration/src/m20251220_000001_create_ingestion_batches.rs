use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One audit row per load run
        manager
            .create_table(
                Table::create()
                    .table(IngestionBatches::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IngestionBatches::BatchId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(IngestionBatches::IngestedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IngestionBatches::Source)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IngestionBatches::RecordCount)
                            .integer()
                            .not_null()
                            .check(Expr::col(IngestionBatches::RecordCount).gte(0)),
                    )
                    .col(
                        ColumnDef::new(IngestionBatches::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending")
                            .check(
                                Expr::col(IngestionBatches::Status)
                                    .is_in(["pending", "completed", "failed"]),
                            ),
                    )
                    .col(
                        ColumnDef::new(IngestionBatches::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ingestion_batches_ingested_at")
                    .table(IngestionBatches::Table)
                    .col(IngestionBatches::IngestedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(IngestionBatches::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum IngestionBatches {
    Table,
    BatchId,
    IngestedAt,
    Source,
    RecordCount,
    Status,
    CreatedAt,
}
