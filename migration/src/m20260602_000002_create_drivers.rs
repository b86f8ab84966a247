use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20260602_000001_create_users::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create vehicle category enum
        manager
            .create_type(
                Type::create()
                    .as_enum(VehicleCategory::Enum)
                    .values([
                        VehicleCategory::Bike,
                        VehicleCategory::Mini,
                        VehicleCategory::Sedan,
                        VehicleCategory::Suv,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Driver::Table)
                    .if_not_exists()
                    .col(pk_auto(Driver::Id))
                    .col(integer(Driver::UserId).not_null().unique_key())
                    .col(
                        ColumnDef::new(Driver::VehicleCategory)
                            .custom(VehicleCategory::Enum)
                            .not_null(),
                    )
                    .col(string_len(Driver::VehicleNumber, 20).not_null().unique_key())
                    .col(boolean(Driver::Available).not_null().default(true))
                    .col(boolean(Driver::IsOnline).not_null().default(false))
                    .col(double_null(Driver::CurrentLat))
                    .col(double_null(Driver::CurrentLng))
                    .col(timestamp_with_time_zone_null(Driver::LocationUpdatedAt))
                    .col(
                        timestamp_with_time_zone(Driver::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_driver_user")
                            .from(Driver::Table, Driver::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Driver::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(VehicleCategory::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Driver {
    Table,
    Id,
    UserId,
    VehicleCategory,
    VehicleNumber,
    Available,
    IsOnline,
    CurrentLat,
    CurrentLng,
    LocationUpdatedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum VehicleCategory {
    #[sea_orm(iden = "vehicle_category")]
    Enum,
    #[sea_orm(iden = "bike")]
    Bike,
    #[sea_orm(iden = "mini")]
    Mini,
    #[sea_orm(iden = "sedan")]
    Sedan,
    #[sea_orm(iden = "suv")]
    Suv,
}
