#![deny(dead_code)]

pub use sea_orm_migration::prelude::*;

mod m20240116_000001_create_table_provider;
mod m20240116_000002_create_table_truck;
mod m20240116_000003_create_table_rate;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        // Order matters: trucks and rates reference providers.
        vec![
            Box::new(m20240116_000001_create_table_provider::Migration),
            Box::new(m20240116_000002_create_table_truck::Migration),
            Box::new(m20240116_000003_create_table_rate::Migration),
        ]
    }
}
