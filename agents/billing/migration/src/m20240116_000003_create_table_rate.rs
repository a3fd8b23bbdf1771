use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Rate::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Rate::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Rate::Product).text().not_null())
                    .col(ColumnDef::new(Rate::Rate).big_integer().not_null())
                    .col(ColumnDef::new(Rate::Scope).integer())
                    .index(Index::create().name("idx-rate-product").col(Rate::Product))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Rate::Table).to_owned())
            .await
    }
}

/// Learn more at https://docs.rs/sea-query#iden
#[derive(Iden)]
enum Rate {
    Table,
    /// Unique database ID
    Id,
    /// Produce tag the rate prices
    Product,
    /// Agorot per kg
    Rate,
    /// Provider the rate is scoped to; NULL applies to all providers
    Scope,
}
