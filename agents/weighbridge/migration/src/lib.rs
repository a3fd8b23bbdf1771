#![deny(dead_code)]

pub use sea_orm_migration::prelude::*;

mod m20240115_000001_create_table_transaction;
mod m20240115_000002_create_table_container;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240115_000001_create_table_transaction::Migration),
            Box::new(m20240115_000002_create_table_container::Migration),
        ]
    }
}
