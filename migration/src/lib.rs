pub use sea_orm_migration::prelude::*;

mod m20260602_000001_create_users;
mod m20260602_000002_create_drivers;
mod m20260602_000003_create_ride_requests;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260602_000001_create_users::Migration),
            Box::new(m20260602_000002_create_drivers::Migration),
            Box::new(m20260602_000003_create_ride_requests::Migration),
        ]
    }
}
