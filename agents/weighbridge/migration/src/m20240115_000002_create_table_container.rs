use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Container::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Container::ContainerId)
                            .text()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Container::Weight).big_integer().not_null())
                    .col(ColumnDef::new(Container::Unit).text().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Container::Table).to_owned())
            .await
    }
}

/// Learn more at https://docs.rs/sea-query#iden
#[derive(Iden)]
enum Container {
    #[iden = "containers_registered"]
    Table,
    /// Canonical container id
    ContainerId,
    /// Calibrated tare in `Unit`
    Weight,
    /// 'kg' or 'lbs', as delivered by the calibration batch
    Unit,
}
