use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_tenants_table::Migration),
            Box::new(m20240601_000002_create_orders_table::Migration),
            Box::new(m20240601_000003_create_order_items_table::Migration),
            Box::new(m20240601_000004_create_tracking_events_table::Migration),
            Box::new(m20240601_000005_create_coupons_table::Migration),
            Box::new(m20240601_000006_create_product_reviews_table::Migration),
            Box::new(m20240601_000007_create_contracts_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240601_000001_create_tenants_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_tenants_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Tenants::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Tenants::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Tenants::BusinessName).string().not_null())
                        .col(ColumnDef::new(Tenants::OwnerEmail).string().not_null())
                        .col(
                            ColumnDef::new(Tenants::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Tenants::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_tenants_owner_email")
                        .table(Tenants::Table)
                        .col(Tenants::OwnerEmail)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Tenants::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Tenants {
        Table,
        Id,
        BusinessName,
        OwnerEmail,
        Active,
        CreatedAt,
    }
}

mod m20240601_000002_create_orders_table {

    use sea_orm_migration::prelude::*;

    use super::m20240601_000001_create_tenants_table::Tenants;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000002_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create orders table aligned with entities::order Model
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::TenantId).uuid().null())
                        .col(ColumnDef::new(Orders::CustomerName).string().not_null())
                        .col(ColumnDef::new(Orders::CustomerEmail).string().not_null())
                        .col(ColumnDef::new(Orders::CustomerPhone).string().null())
                        .col(ColumnDef::new(Orders::Status).string().not_null())
                        .col(
                            ColumnDef::new(Orders::TotalAmount)
                                .decimal_len(10, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::ShippingStreet).string().null())
                        .col(ColumnDef::new(Orders::ShippingNumber).string().null())
                        .col(ColumnDef::new(Orders::ShippingComplement).string().null())
                        .col(
                            ColumnDef::new(Orders::ShippingNeighborhood)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(Orders::ShippingCity).string().null())
                        .col(ColumnDef::new(Orders::ShippingState).string().null())
                        .col(ColumnDef::new(Orders::ShippingZip).string().null())
                        .col(ColumnDef::new(Orders::PaymentId).string().null())
                        .col(ColumnDef::new(Orders::CouponCode).string().null())
                        .col(ColumnDef::new(Orders::TrackingCode).string().null())
                        .col(ColumnDef::new(Orders::Notes).string().null())
                        .col(ColumnDef::new(Orders::DeliveredAt).timestamp().null())
                        .col(ColumnDef::new(Orders::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Orders::UpdatedAt).timestamp().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_tenant_id")
                                .from(Orders::Table, Orders::TenantId)
                                .to(Tenants::Table, Tenants::Id)
                                .on_delete(ForeignKeyAction::SetNull)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // Webhooks and the tracking query resolve orders by these columns
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_status")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_tracking_code")
                        .table(Orders::Table)
                        .col(Orders::TrackingCode)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_tenant_id")
                        .table(Orders::Table)
                        .col(Orders::TenantId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_created_at")
                        .table(Orders::Table)
                        .col(Orders::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Orders {
        Table,
        Id,
        TenantId,
        CustomerName,
        CustomerEmail,
        CustomerPhone,
        Status,
        TotalAmount,
        ShippingStreet,
        ShippingNumber,
        ShippingComplement,
        ShippingNeighborhood,
        ShippingCity,
        ShippingState,
        ShippingZip,
        PaymentId,
        CouponCode,
        TrackingCode,
        Notes,
        DeliveredAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000003_create_order_items_table {

    use sea_orm_migration::prelude::*;

    use super::m20240601_000002_create_orders_table::Orders;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000003_create_order_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create order_items table aligned with entities::order_item Model
            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::ProductId).uuid().null())
                        .col(ColumnDef::new(OrderItems::ProductName).string().not_null())
                        .col(
                            ColumnDef::new(OrderItems::Quantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(OrderItems::UnitPrice)
                                .decimal_len(10, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderItems::TotalPrice)
                                .decimal_len(10, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderItems::IsDigital)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(OrderItems::CustomizationData).json().null())
                        .col(
                            ColumnDef::new(OrderItems::CustomizationStatus)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(OrderItems::CustomizationDeadline)
                                .timestamp()
                                .null(),
                        )
                        .col(ColumnDef::new(OrderItems::CreatedAt).timestamp().not_null())
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
                .await
        }
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        ProductId,
        ProductName,
        Quantity,
        UnitPrice,
        TotalPrice,
        IsDigital,
        CustomizationData,
        CustomizationStatus,
        CustomizationDeadline,
        CreatedAt,
    }
}

mod m20240601_000004_create_tracking_events_table {

    use sea_orm_migration::prelude::*;

    use super::m20240601_000002_create_orders_table::Orders;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000004_create_tracking_events_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(TrackingEvents::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TrackingEvents::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TrackingEvents::OrderId).uuid().not_null())
                        .col(ColumnDef::new(TrackingEvents::Status).string().not_null())
                        .col(
                            ColumnDef::new(TrackingEvents::Description)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TrackingEvents::Location).string().null())
                        .col(
                            ColumnDef::new(TrackingEvents::EventDate)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TrackingEvents::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_tracking_events_order_id")
                                .from(TrackingEvents::Table, TrackingEvents::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // Non-unique on purpose: duplicate suppression is best-effort
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_tracking_events_order_event_date")
                        .table(TrackingEvents::Table)
                        .col(TrackingEvents::OrderId)
                        .col(TrackingEvents::EventDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TrackingEvents::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum TrackingEvents {
        Table,
        Id,
        OrderId,
        Status,
        Description,
        Location,
        EventDate,
        CreatedAt,
    }
}

mod m20240601_000005_create_coupons_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000005_create_coupons_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Coupons::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Coupons::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Coupons::TenantId).uuid().null())
                        .col(
                            ColumnDef::new(Coupons::Code)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Coupons::DiscountType).string().not_null())
                        .col(
                            ColumnDef::new(Coupons::DiscountValue)
                                .decimal_len(10, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Coupons::MinOrderAmount)
                                .decimal_len(10, 2)
                                .null(),
                        )
                        .col(ColumnDef::new(Coupons::MaxUses).integer().null())
                        .col(
                            ColumnDef::new(Coupons::UsedCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Coupons::StartsAt).timestamp().null())
                        .col(ColumnDef::new(Coupons::ExpiresAt).timestamp().null())
                        .col(
                            ColumnDef::new(Coupons::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Coupons::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Coupons::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Coupons {
        Table,
        Id,
        TenantId,
        Code,
        DiscountType,
        DiscountValue,
        MinOrderAmount,
        MaxUses,
        UsedCount,
        StartsAt,
        ExpiresAt,
        Active,
        CreatedAt,
    }
}

mod m20240601_000006_create_product_reviews_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000006_create_product_reviews_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ProductReviews::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductReviews::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductReviews::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(ProductReviews::CustomerName)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductReviews::CustomerEmail)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductReviews::Rating).integer().not_null())
                        .col(ColumnDef::new(ProductReviews::Comment).string().null())
                        .col(
                            ColumnDef::new(ProductReviews::VerifiedPurchase)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(ProductReviews::Approved)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(ProductReviews::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // Payment confirmation marks reviews by (product, email)
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_reviews_product_email")
                        .table(ProductReviews::Table)
                        .col(ProductReviews::ProductId)
                        .col(ProductReviews::CustomerEmail)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductReviews::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ProductReviews {
        Table,
        Id,
        ProductId,
        CustomerName,
        CustomerEmail,
        Rating,
        Comment,
        VerifiedPurchase,
        Approved,
        CreatedAt,
    }
}

mod m20240601_000007_create_contracts_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000007_create_contracts_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Contracts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Contracts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Contracts::TenantId).uuid().null())
                        .col(ColumnDef::new(Contracts::CustomerName).string().not_null())
                        .col(
                            ColumnDef::new(Contracts::CustomerEmail)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Contracts::EventDate).timestamp().null())
                        .col(ColumnDef::new(Contracts::Content).text().not_null())
                        .col(
                            ColumnDef::new(Contracts::Status)
                                .string()
                                .not_null()
                                .default("draft"),
                        )
                        .col(
                            ColumnDef::new(Contracts::SignatureToken)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Contracts::SignatureData).text().null())
                        .col(ColumnDef::new(Contracts::SignedAt).timestamp().null())
                        .col(ColumnDef::new(Contracts::SignerIp).string().null())
                        .col(ColumnDef::new(Contracts::SignerUserAgent).string().null())
                        .col(ColumnDef::new(Contracts::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_contracts_signature_token")
                        .table(Contracts::Table)
                        .col(Contracts::SignatureToken)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Contracts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Contracts {
        Table,
        Id,
        TenantId,
        CustomerName,
        CustomerEmail,
        EventDate,
        Content,
        Status,
        SignatureToken,
        SignatureData,
        SignedAt,
        SignerIp,
        SignerUserAgent,
        CreatedAt,
    }
}
