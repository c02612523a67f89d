pub use sea_orm_migration::prelude::*;

mod m20251220_000001_create_ingestion_batches;
mod m20251220_000002_create_cryptocurrencies;
mod m20251220_000003_create_price_snapshots;
mod m20251220_000004_create_market_metrics;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251220_000001_create_ingestion_batches::Migration),
            Box::new(m20251220_000002_create_cryptocurrencies::Migration),
            Box::new(m20251220_000003_create_price_snapshots::Migration),
            Box::new(m20251220_000004_create_market_metrics::Migration),
        ]
    }
}
