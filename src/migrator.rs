use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_shipments_table::Migration),
            Box::new(m20240101_000002_create_expected_items_table::Migration),
            Box::new(m20240101_000003_create_received_items_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_shipments_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_shipments_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Shipments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Shipments::Id)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Shipments::Date).timestamp().not_null())
                        .col(
                            ColumnDef::new(Shipments::DocumentIds)
                                .text()
                                .not_null()
                                .default("[]"),
                        )
                        .col(ColumnDef::new(Shipments::Status).string().not_null())
                        .col(ColumnDef::new(Shipments::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Shipments::CompletedAt).timestamp().null())
                        .col(
                            ColumnDef::new(Shipments::LastUpdated)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipments_created_at")
                        .table(Shipments::Table)
                        .col(Shipments::CreatedAt)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Shipments::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Shipments {
        Table,
        Id,
        Date,
        DocumentIds,
        Status,
        CreatedAt,
        CompletedAt,
        LastUpdated,
    }
}

mod m20240101_000002_create_expected_items_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_expected_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ExpectedItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ExpectedItems::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ExpectedItems::ShipmentId)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ExpectedItems::ItemNumber)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ExpectedItems::LegacyItemNumber)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ExpectedItems::Description)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ExpectedItems::Upc).string().not_null())
                        .col(
                            ColumnDef::new(ExpectedItems::QtyExpected)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        // Empty string means "no source document"; kept non-null so
                        // the composite received-items key can match against it.
                        .col(
                            ColumnDef::new(ExpectedItems::DocumentId)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_expected_items_shipment_id")
                        .table(ExpectedItems::Table)
                        .col(ExpectedItems::ShipmentId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ExpectedItems::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum ExpectedItems {
        Table,
        Id,
        ShipmentId,
        ItemNumber,
        LegacyItemNumber,
        Description,
        Upc,
        QtyExpected,
        DocumentId,
    }
}

mod m20240101_000003_create_received_items_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_received_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ReceivedItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ReceivedItems::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReceivedItems::ShipmentId)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ReceivedItems::Upc).string().not_null())
                        .col(
                            ColumnDef::new(ReceivedItems::DocumentId)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(ReceivedItems::QtyReceived)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ReceivedItems::ScannedBy)
                                .text()
                                .not_null()
                                .default("[]"),
                        )
                        .col(
                            ColumnDef::new(ReceivedItems::ScannedByUsername)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ReceivedItems::ScannedByName)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ReceivedItems::LastUpdated)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ReceivedItems::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // The reconciliation key. The atomic scan upsert conflicts on this
            // index, so it must stay unique and non-null in every column.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_received_items_key")
                        .table(ReceivedItems::Table)
                        .col(ReceivedItems::ShipmentId)
                        .col(ReceivedItems::Upc)
                        .col(ReceivedItems::DocumentId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_received_items_last_updated")
                        .table(ReceivedItems::Table)
                        .col(ReceivedItems::ShipmentId)
                        .col(ReceivedItems::LastUpdated)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ReceivedItems::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum ReceivedItems {
        Table,
        Id,
        ShipmentId,
        Upc,
        DocumentId,
        QtyReceived,
        ScannedBy,
        ScannedByUsername,
        ScannedByName,
        LastUpdated,
        CreatedAt,
    }
}
