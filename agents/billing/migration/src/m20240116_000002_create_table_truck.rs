use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Truck::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Truck::Id).text().not_null().primary_key())
                    .col(ColumnDef::new(Truck::ProviderId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-truck-provider")
                            .from(Truck::Table, Truck::ProviderId)
                            .to(Provider::Table, Provider::Id),
                    )
                    .index(
                        Index::create()
                            .name("idx-truck-provider")
                            .col(Truck::ProviderId),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Truck::Table).to_owned())
            .await
    }
}

/// Learn more at https://docs.rs/sea-query#iden
#[derive(Iden)]
enum Truck {
    Table,
    /// License id of the truck
    Id,
    /// Owning provider
    ProviderId,
}

#[derive(Iden)]
enum Provider {
    Table,
    Id,
}
