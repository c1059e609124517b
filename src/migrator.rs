use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_master_data_tables::Migration),
            Box::new(m20250101_000002_create_orders_tables::Migration),
            Box::new(m20250101_000003_create_inventory_tables::Migration),
            Box::new(m20250101_000004_create_deliveries_tables::Migration),
            Box::new(m20250101_000005_create_collection_tables::Migration),
            Box::new(m20250101_000006_create_depot_transfer_tables::Migration),
            Box::new(m20250101_000007_create_number_registry_table::Migration),
        ]
    }
}

// Migration implementations

mod m20250101_000001_create_master_data_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_master_data_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Products::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Products::Code).string().not_null().unique_key())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(
                            ColumnDef::new(Products::TradePrice)
                                .decimal_len(16, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::VatPercent)
                                .decimal_len(6, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::FreeGoodsThreshold)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::FreeGoodsQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Customers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Customers::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Customers::Code).string().not_null().unique_key())
                        .col(ColumnDef::new(Customers::Name).string().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Employees::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Employees::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Employees::Code).string().not_null().unique_key())
                        .col(ColumnDef::new(Employees::Name).string().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Vehicles::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Vehicles::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Vehicles::RegistrationNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Vehicles::Description).string().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Routes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Routes::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Routes::Code).string().null())
                        .col(ColumnDef::new(Routes::Name).string().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Depots::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Depots::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Depots::Code).string().not_null().unique_key())
                        .col(ColumnDef::new(Depots::Name).string().not_null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Depots::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Routes::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Vehicles::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Employees::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Customers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        Code,
        Name,
        TradePrice,
        VatPercent,
        FreeGoodsThreshold,
        FreeGoodsQuantity,
        Active,
    }

    #[derive(DeriveIden)]
    enum Customers {
        Table,
        Id,
        Code,
        Name,
    }

    #[derive(DeriveIden)]
    enum Employees {
        Table,
        Id,
        Code,
        Name,
    }

    #[derive(DeriveIden)]
    enum Vehicles {
        Table,
        Id,
        RegistrationNumber,
        Description,
    }

    #[derive(DeriveIden)]
    enum Routes {
        Table,
        Id,
        Code,
        Name,
    }

    #[derive(DeriveIden)]
    enum Depots {
        Table,
        Id,
        Code,
        Name,
    }
}

mod m20250101_000002_create_orders_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_orders_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Lifecycle state is flattened into `stage` plus nullable columns
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Orders::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Orders::CustomerId).integer().not_null())
                        .col(ColumnDef::new(Orders::RouteId).integer().not_null())
                        .col(ColumnDef::new(Orders::SalespersonId).integer().not_null())
                        .col(ColumnDef::new(Orders::DepotId).integer().not_null())
                        .col(ColumnDef::new(Orders::CustomerName).string().not_null())
                        .col(ColumnDef::new(Orders::CustomerCode).string().not_null())
                        .col(ColumnDef::new(Orders::RouteName).string().not_null())
                        .col(ColumnDef::new(Orders::RouteCode).string().null())
                        .col(ColumnDef::new(Orders::SalespersonName).string().not_null())
                        .col(ColumnDef::new(Orders::SalespersonCode).string().not_null())
                        .col(ColumnDef::new(Orders::DeliveryDate).date().not_null())
                        .col(ColumnDef::new(Orders::Stage).string().not_null())
                        .col(ColumnDef::new(Orders::MemoNumber).string().null())
                        .col(
                            ColumnDef::new(Orders::TotalAmount)
                                .decimal_len(16, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::PrintedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Orders::AssignedEmployeeId).integer().null())
                        .col(ColumnDef::new(Orders::AssignedVehicleId).integer().null())
                        .col(ColumnDef::new(Orders::LoadingNumber).string().null())
                        .col(ColumnDef::new(Orders::LoadingDate).date().null())
                        .col(ColumnDef::new(Orders::CollectionStatus).string().null())
                        .col(ColumnDef::new(Orders::CollectionSource).string().null())
                        .col(
                            ColumnDef::new(Orders::CollectedAmount)
                                .decimal_len(16, 2)
                                .null(),
                        )
                        .col(ColumnDef::new(Orders::PendingAmount).decimal_len(16, 2).null())
                        .col(
                            ColumnDef::new(Orders::CollectionApprovedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Orders::CollectionApprovedBy)
                                .integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Orders::Postponed)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Orders::MobileAccepted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Orders::Remarks).string().null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_memo_number")
                        .table(Orders::Table)
                        .col(Orders::MemoNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_loading_number")
                        .table(Orders::Table)
                        .col(Orders::LoadingNumber)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_stage")
                        .table(Orders::Table)
                        .col(Orders::Stage)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).integer().not_null())
                        .col(ColumnDef::new(OrderItems::ProductId).integer().not_null())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(OrderItems::FreeGoodsQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(OrderItems::TradePrice)
                                .decimal_len(16, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderItems::DiscountPercent)
                                .decimal_len(6, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(OrderItems::VatPercent)
                                .decimal_len(6, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(OrderItems::BatchHint).string().null())
                        .col(
                            ColumnDef::new(OrderItems::Selected)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_order_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Orders {
        Table,
        Id,
        CustomerId,
        RouteId,
        SalespersonId,
        DepotId,
        CustomerName,
        CustomerCode,
        RouteName,
        RouteCode,
        SalespersonName,
        SalespersonCode,
        DeliveryDate,
        Stage,
        MemoNumber,
        TotalAmount,
        PrintedAt,
        AssignedEmployeeId,
        AssignedVehicleId,
        LoadingNumber,
        LoadingDate,
        CollectionStatus,
        CollectionSource,
        CollectedAmount,
        PendingAmount,
        CollectionApprovedAt,
        CollectionApprovedBy,
        Postponed,
        MobileAccepted,
        Remarks,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        ProductId,
        Quantity,
        FreeGoodsQuantity,
        TradePrice,
        DiscountPercent,
        VatPercent,
        BatchHint,
        Selected,
    }
}

mod m20250101_000003_create_inventory_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000003_create_inventory_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryStock::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryStock::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(InventoryStock::ProductId).integer().not_null())
                        .col(ColumnDef::new(InventoryStock::DepotId).integer().not_null())
                        .col(
                            ColumnDef::new(InventoryStock::StockQty)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryStock::TotalReceived)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryStock::TotalIssued)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryStock::TotalAdjusted)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryStock::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_stock_product_depot")
                        .table(InventoryStock::Table)
                        .col(InventoryStock::ProductId)
                        .col(InventoryStock::DepotId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(BatchDetails::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BatchDetails::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(BatchDetails::ProductId).integer().not_null())
                        .col(ColumnDef::new(BatchDetails::DepotId).integer().not_null())
                        .col(ColumnDef::new(BatchDetails::BatchNumber).string().not_null())
                        .col(
                            ColumnDef::new(BatchDetails::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(BatchDetails::AvailableQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(BatchDetails::ReservedQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(BatchDetails::ExpiryDate).date().null())
                        .col(ColumnDef::new(BatchDetails::ManufacturingDate).date().null())
                        .col(ColumnDef::new(BatchDetails::Status).string().not_null())
                        .col(
                            ColumnDef::new(BatchDetails::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BatchDetails::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_batch_details_product_depot_batch")
                        .table(BatchDetails::Table)
                        .col(BatchDetails::ProductId)
                        .col(BatchDetails::DepotId)
                        .col(BatchDetails::BatchNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_batch_details_expiry")
                        .table(BatchDetails::Table)
                        .col(BatchDetails::ProductId)
                        .col(BatchDetails::ExpiryDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BatchDetails::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(InventoryStock::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum InventoryStock {
        Table,
        Id,
        ProductId,
        DepotId,
        StockQty,
        TotalReceived,
        TotalIssued,
        TotalAdjusted,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum BatchDetails {
        Table,
        Id,
        ProductId,
        DepotId,
        BatchNumber,
        Quantity,
        AvailableQuantity,
        ReservedQuantity,
        ExpiryDate,
        ManufacturingDate,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000004_create_deliveries_tables {
    use super::m20250101_000002_create_orders_tables::Orders;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000004_create_deliveries_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Deliveries::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Deliveries::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Deliveries::OrderId)
                                .integer()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Deliveries::DepotId).integer().not_null())
                        .col(ColumnDef::new(Deliveries::VehicleId).integer().null())
                        .col(ColumnDef::new(Deliveries::Status).string().not_null())
                        .col(
                            ColumnDef::new(Deliveries::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Deliveries::CompletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Deliveries::CancelledAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_deliveries_order_id")
                                .from(Deliveries::Table, Deliveries::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(DeliveryItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DeliveryItems::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(DeliveryItems::DeliveryId).integer().not_null())
                        .col(ColumnDef::new(DeliveryItems::OrderItemId).integer().not_null())
                        .col(ColumnDef::new(DeliveryItems::ProductId).integer().not_null())
                        .col(
                            ColumnDef::new(DeliveryItems::BatchDetailId)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeliveryItems::BatchNumber).string().not_null())
                        .col(ColumnDef::new(DeliveryItems::ExpiryDate).date().null())
                        .col(ColumnDef::new(DeliveryItems::PickSequence).integer().not_null())
                        .col(
                            ColumnDef::new(DeliveryItems::OrderedQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryItems::PickedQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryItems::DeliveredQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(DeliveryItems::ReturnedQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(DeliveryItems::FreeGoodsQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(DeliveryItems::TradeAmount)
                                .decimal_len(16, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryItems::DiscountAmount)
                                .decimal_len(16, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryItems::TaxAmount)
                                .decimal_len(16, 2)
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_delivery_items_delivery_id")
                                .from(DeliveryItems::Table, DeliveryItems::DeliveryId)
                                .to(Deliveries::Table, Deliveries::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_delivery_items_delivery_id")
                        .table(DeliveryItems::Table)
                        .col(DeliveryItems::DeliveryId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DeliveryItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Deliveries::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Deliveries {
        Table,
        Id,
        OrderId,
        DepotId,
        VehicleId,
        Status,
        CreatedAt,
        CompletedAt,
        CancelledAt,
    }

    #[derive(DeriveIden)]
    enum DeliveryItems {
        Table,
        Id,
        DeliveryId,
        OrderItemId,
        ProductId,
        BatchDetailId,
        BatchNumber,
        ExpiryDate,
        PickSequence,
        OrderedQuantity,
        PickedQuantity,
        DeliveredQuantity,
        ReturnedQuantity,
        FreeGoodsQuantity,
        TradeAmount,
        DiscountAmount,
        TaxAmount,
    }
}

mod m20250101_000005_create_collection_tables {
    use super::m20250101_000002_create_orders_tables::Orders;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000005_create_collection_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CollectionDeposits::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CollectionDeposits::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(CollectionDeposits::CollectorId)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CollectionDeposits::DepositDate).date().not_null())
                        .col(
                            ColumnDef::new(CollectionDeposits::TotalCollected)
                                .decimal_len(16, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CollectionDeposits::DepositedAmount)
                                .decimal_len(16, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CollectionDeposits::RemainingAmount)
                                .decimal_len(16, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(CollectionDeposits::Channel).string().not_null())
                        .col(
                            ColumnDef::new(CollectionDeposits::Approved)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(CollectionDeposits::ApprovedBy).integer().null())
                        .col(
                            ColumnDef::new(CollectionDeposits::ApprovedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(CollectionDeposits::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CollectionTransactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CollectionTransactions::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(CollectionTransactions::OrderId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CollectionTransactions::MemoNumber)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CollectionTransactions::CollectorId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CollectionTransactions::CollectionDate)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CollectionTransactions::Source)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CollectionTransactions::CollectedAmount)
                                .decimal_len(16, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CollectionTransactions::PendingAmount)
                                .decimal_len(16, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CollectionTransactions::DepositId)
                                .integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(CollectionTransactions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_collection_transactions_order_id")
                                .from(
                                    CollectionTransactions::Table,
                                    CollectionTransactions::OrderId,
                                )
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_collection_transactions_deposit_id")
                                .from(
                                    CollectionTransactions::Table,
                                    CollectionTransactions::DepositId,
                                )
                                .to(CollectionDeposits::Table, CollectionDeposits::Id)
                                .on_delete(ForeignKeyAction::SetNull)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_collection_transactions_collector_date")
                        .table(CollectionTransactions::Table)
                        .col(CollectionTransactions::CollectorId)
                        .col(CollectionTransactions::CollectionDate)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(DepositReceipts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DepositReceipts::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(DepositReceipts::DepositId).integer().not_null())
                        .col(
                            ColumnDef::new(DepositReceipts::Amount)
                                .decimal_len(16, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DepositReceipts::RemainingAfter)
                                .decimal_len(16, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(DepositReceipts::Note).string().null())
                        .col(
                            ColumnDef::new(DepositReceipts::ReceivedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_deposit_receipts_deposit_id")
                                .from(DepositReceipts::Table, DepositReceipts::DepositId)
                                .to(CollectionDeposits::Table, CollectionDeposits::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DepositReceipts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(CollectionTransactions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(CollectionDeposits::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum CollectionDeposits {
        Table,
        Id,
        CollectorId,
        DepositDate,
        TotalCollected,
        DepositedAmount,
        RemainingAmount,
        Channel,
        Approved,
        ApprovedBy,
        ApprovedAt,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum CollectionTransactions {
        Table,
        Id,
        OrderId,
        MemoNumber,
        CollectorId,
        CollectionDate,
        Source,
        CollectedAmount,
        PendingAmount,
        DepositId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum DepositReceipts {
        Table,
        Id,
        DepositId,
        Amount,
        RemainingAfter,
        Note,
        ReceivedAt,
    }
}

mod m20250101_000006_create_depot_transfer_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000006_create_depot_transfer_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DepotTransfers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DepotTransfers::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(DepotTransfers::TransferNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(DepotTransfers::SourceDepotId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DepotTransfers::DestinationDepotId)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DepotTransfers::Status).string().not_null())
                        .col(ColumnDef::new(DepotTransfers::Remarks).string().null())
                        .col(
                            ColumnDef::new(DepotTransfers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DepotTransfers::ApprovedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DepotTransfers::ReceivedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DepotTransfers::RejectedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(DepotTransferItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DepotTransferItems::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(DepotTransferItems::TransferId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DepotTransferItems::ProductId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DepotTransferItems::BatchDetailId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DepotTransferItems::BatchNumber)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DepotTransferItems::ExpiryDate).date().null())
                        .col(
                            ColumnDef::new(DepotTransferItems::ManufacturingDate)
                                .date()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DepotTransferItems::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_depot_transfer_items_transfer_id")
                                .from(DepotTransferItems::Table, DepotTransferItems::TransferId)
                                .to(DepotTransfers::Table, DepotTransfers::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DepotTransferItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(DepotTransfers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum DepotTransfers {
        Table,
        Id,
        TransferNumber,
        SourceDepotId,
        DestinationDepotId,
        Status,
        Remarks,
        CreatedAt,
        ApprovedAt,
        ReceivedAt,
        RejectedAt,
    }

    #[derive(DeriveIden)]
    enum DepotTransferItems {
        Table,
        Id,
        TransferId,
        ProductId,
        BatchDetailId,
        BatchNumber,
        ExpiryDate,
        ManufacturingDate,
        Quantity,
    }
}

mod m20250101_000007_create_number_registry_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000007_create_number_registry_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(NumberRegistry::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(NumberRegistry::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(NumberRegistry::Kind).string().not_null())
                        .col(ColumnDef::new(NumberRegistry::Value).string().not_null())
                        .col(
                            ColumnDef::new(NumberRegistry::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // Uniqueness authority for memo, loading and transfer numbers
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_number_registry_kind_value")
                        .table(NumberRegistry::Table)
                        .col(NumberRegistry::Kind)
                        .col(NumberRegistry::Value)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(NumberRegistry::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum NumberRegistry {
        Table,
        Id,
        Kind,
        Value,
        CreatedAt,
    }
}
