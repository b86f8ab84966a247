use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20260602_000001_create_users::User;
use super::m20260602_000002_create_drivers::{Driver, VehicleCategory};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create ride status enum
        manager
            .create_type(
                Type::create()
                    .as_enum(RideStatus::Enum)
                    .values([
                        RideStatus::Pending,
                        RideStatus::Assigned,
                        RideStatus::Accepted,
                        RideStatus::InProgress,
                        RideStatus::Completed,
                        RideStatus::Cancelled,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RideRequest::Table)
                    .if_not_exists()
                    .col(pk_auto(RideRequest::Id))
                    .col(integer(RideRequest::PassengerId).not_null())
                    .col(integer_null(RideRequest::DriverId))
                    .col(string_len(RideRequest::PickupAddress, 255).not_null())
                    .col(string_len(RideRequest::DropoffAddress, 255).not_null())
                    .col(double_null(RideRequest::PickupLat))
                    .col(double_null(RideRequest::PickupLng))
                    .col(double_null(RideRequest::DropoffLat))
                    .col(double_null(RideRequest::DropoffLng))
                    .col(
                        ColumnDef::new(RideRequest::VehicleCategory)
                            .custom(VehicleCategory::Enum)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RideRequest::Status)
                            .custom(RideStatus::Enum)
                            .not_null(),
                    )
                    .col(double_null(RideRequest::FareAmount))
                    .col(
                        timestamp_with_time_zone(RideRequest::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(RideRequest::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(RideRequest::AcceptedAt))
                    .col(timestamp_with_time_zone_null(RideRequest::CompletedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ride_request_passenger")
                            .from(RideRequest::Table, RideRequest::PassengerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ride_request_driver")
                            .from(RideRequest::Table, RideRequest::DriverId)
                            .to(Driver::Table, Driver::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // The open-request feed filters on status; acceptance races hit driver_id
        manager
            .create_index(
                Index::create()
                    .name("idx_ride_request_status")
                    .table(RideRequest::Table)
                    .col(RideRequest::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ride_request_driver_id")
                    .table(RideRequest::Table)
                    .col(RideRequest::DriverId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RideRequest::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(RideStatus::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum RideRequest {
    Table,
    Id,
    PassengerId,
    DriverId,
    PickupAddress,
    DropoffAddress,
    PickupLat,
    PickupLng,
    DropoffLat,
    DropoffLng,
    VehicleCategory,
    Status,
    FareAmount,
    CreatedAt,
    UpdatedAt,
    AcceptedAt,
    CompletedAt,
}

#[derive(DeriveIden)]
pub enum RideStatus {
    #[sea_orm(iden = "ride_status")]
    Enum,
    #[sea_orm(iden = "pending")]
    Pending,
    #[sea_orm(iden = "assigned")]
    Assigned,
    #[sea_orm(iden = "accepted")]
    Accepted,
    #[sea_orm(iden = "in_progress")]
    InProgress,
    #[sea_orm(iden = "completed")]
    Completed,
    #[sea_orm(iden = "cancelled")]
    Cancelled,
}
