use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Transaction::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transaction::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Transaction::RecordedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transaction::Direction).text().not_null())
                    .col(ColumnDef::new(Transaction::Truck).text())
                    .col(ColumnDef::new(Transaction::Containers).text().not_null())
                    .col(ColumnDef::new(Transaction::Bruto).big_integer().not_null())
                    .col(ColumnDef::new(Transaction::TruckTara).big_integer())
                    .col(ColumnDef::new(Transaction::Neto).big_integer())
                    .col(ColumnDef::new(Transaction::Produce).text().not_null())
                    .index(
                        Index::create()
                            .name("idx-truck-id")
                            .col(Transaction::Truck)
                            .col(Transaction::Id),
                    )
                    .index(
                        Index::create()
                            .name("idx-direction")
                            .col(Transaction::Direction),
                    )
                    .index(
                        Index::create()
                            .name("idx-recorded-at")
                            .col(Transaction::RecordedAt),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transaction::Table).to_owned())
            .await
    }
}

/// Learn more at https://docs.rs/sea-query#iden
#[derive(Iden)]
enum Transaction {
    #[iden = "transactions"]
    Table,
    /// Unique database ID; doubles as the session key
    Id,
    /// Time of record creation
    RecordedAt,
    /// One of 'in', 'out', 'none'
    Direction,
    /// Truck license id; NULL for standalone weighings
    Truck,
    /// Canonical comma-joined container list
    Containers,
    /// Gross weight in kg
    Bruto,
    /// Empty-truck weight in kg, set when the cycle closes
    TruckTara,
    /// Net produce weight in kg; NULL while indeterminable
    Neto,
    /// Produce tag
    Produce,
}
