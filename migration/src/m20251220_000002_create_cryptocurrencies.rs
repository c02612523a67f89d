use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Cryptocurrencies::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Cryptocurrencies::CryptoId)
                            .string_len(100)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Cryptocurrencies::Symbol)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Cryptocurrencies::Name)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Cryptocurrencies::ImageUrl)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Cryptocurrencies::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .col(
                        ColumnDef::new(Cryptocurrencies::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await?;

        // Create index for fast symbol lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_cryptocurrencies_symbol")
                    .table(Cryptocurrencies::Table)
                    .col(Cryptocurrencies::Symbol)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Cryptocurrencies::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Cryptocurrencies {
    Table,
    CryptoId,
    Symbol,
    Name,
    ImageUrl,
    CreatedAt,
    UpdatedAt,
}
