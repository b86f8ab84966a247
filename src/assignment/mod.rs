use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};

use crate::config::FareSettings;
use crate::entities::driver::{self, VehicleCategory};
use crate::entities::ride_request::{self, RideStatus};
use crate::error::{AppError, AppResult};
use crate::utils::geo::haversine_distance;
use crate::utils::pricing::compute_fare;

/// Assign a driver to a pending request (admin flow).
///
/// Runs in one transaction with exclusive locks on both rows, so two admins
/// assigning the same request serialize: the second observes the request as
/// no longer pending and gets a `Conflict`. The assigned driver is taken off
/// the open market immediately.
pub async fn assign_driver(
    db: &DatabaseConnection,
    request_id: i32,
    driver_id: i32,
) -> AppResult<ride_request::Model> {
    let txn = db.begin().await?;

    let request = ride_request::Entity::find_by_id(request_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Ride request not found".to_string()))?;

    if request.status != RideStatus::Pending || request.driver_id.is_some() {
        return Err(AppError::Conflict(
            "Ride request is no longer pending".to_string(),
        ));
    }

    let drv = driver::Entity::find_by_id(driver_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Driver not found".to_string()))?;

    if !drv.is_online || !drv.available {
        return Err(AppError::Conflict("Driver is not available".to_string()));
    }

    let now: DateTimeWithTimeZone = Utc::now().into();

    // Update applies only while the row is still pending and unbound
    let updated = ride_request::Entity::update_many()
        .set(ride_request::ActiveModel {
            driver_id: Set(Some(drv.id)),
            status: Set(RideStatus::Assigned),
            updated_at: Set(now),
            ..Default::default()
        })
        .filter(ride_request::Column::Id.eq(request_id))
        .filter(ride_request::Column::Status.eq(RideStatus::Pending))
        .filter(ride_request::Column::DriverId.is_null())
        .exec(&txn)
        .await?;

    if updated.rows_affected == 0 {
        return Err(AppError::Conflict(
            "Ride request is no longer pending".to_string(),
        ));
    }

    driver::Entity::update_many()
        .set(driver::ActiveModel {
            available: Set(false),
            ..Default::default()
        })
        .filter(driver::Column::Id.eq(drv.id))
        .exec(&txn)
        .await?;

    let assigned = ride_request::Entity::find_by_id(request_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::Internal("Ride request vanished during assignment".to_string()))?;

    txn.commit().await?;

    tracing::info!(request_id, driver_id = drv.id, "driver assigned to ride request");
    Ok(assigned)
}

/// Accept a pending request as the acting driver (self-service flow).
///
/// The caller's driver profile comes from the authenticated identity. The
/// bind itself is a single conditional update on (pending, unbound); of two
/// concurrent acceptors exactly one affects a row, and the loser returns a
/// `Conflict` with no side effects on its availability.
pub async fn accept_request(
    db: &DatabaseConnection,
    drv: &driver::Model,
    request_id: i32,
) -> AppResult<ride_request::Model> {
    if !drv.available {
        return Err(AppError::Conflict(
            "You already have an active ride".to_string(),
        ));
    }

    let txn = db.begin().await?;

    let request = ride_request::Entity::find_by_id(request_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Ride request not found".to_string()))?;

    if request.status != RideStatus::Pending || request.driver_id.is_some() {
        return Err(AppError::Conflict(
            "Ride request is no longer available".to_string(),
        ));
    }

    if request.vehicle_category != drv.vehicle_category {
        return Err(AppError::Conflict(
            "Ride request needs a different vehicle category".to_string(),
        ));
    }

    let now: DateTimeWithTimeZone = Utc::now().into();

    let updated = ride_request::Entity::update_many()
        .set(ride_request::ActiveModel {
            driver_id: Set(Some(drv.id)),
            status: Set(RideStatus::Accepted),
            accepted_at: Set(Some(now)),
            updated_at: Set(now),
            ..Default::default()
        })
        .filter(ride_request::Column::Id.eq(request_id))
        .filter(ride_request::Column::Status.eq(RideStatus::Pending))
        .filter(ride_request::Column::DriverId.is_null())
        .exec(&txn)
        .await?;

    if updated.rows_affected == 0 {
        // Another driver or an admin won the race
        return Err(AppError::Conflict(
            "Ride request is no longer available".to_string(),
        ));
    }

    driver::Entity::update_many()
        .set(driver::ActiveModel {
            available: Set(false),
            ..Default::default()
        })
        .filter(driver::Column::Id.eq(drv.id))
        .exec(&txn)
        .await?;

    let accepted = ride_request::Entity::find_by_id(request_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::Internal("Ride request vanished during acceptance".to_string()))?;

    txn.commit().await?;

    tracing::info!(request_id, driver_id = drv.id, "ride request accepted");
    Ok(accepted)
}

/// Move an accepted (or admin-assigned) ride to in-progress.
pub async fn start_ride(
    db: &DatabaseConnection,
    driver_id: i32,
    request_id: i32,
) -> AppResult<ride_request::Model> {
    let request = ride_request::Entity::find_by_id(request_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ride request not found".to_string()))?;

    if request.driver_id != Some(driver_id) {
        return Err(AppError::Forbidden(
            "You are not assigned to this ride".to_string(),
        ));
    }

    let now: DateTimeWithTimeZone = Utc::now().into();

    let updated = ride_request::Entity::update_many()
        .set(ride_request::ActiveModel {
            status: Set(RideStatus::InProgress),
            updated_at: Set(now),
            ..Default::default()
        })
        .filter(ride_request::Column::Id.eq(request_id))
        .filter(ride_request::Column::DriverId.eq(driver_id))
        .filter(
            ride_request::Column::Status
                .is_in([RideStatus::Assigned, RideStatus::Accepted]),
        )
        .exec(db)
        .await?;

    if updated.rows_affected == 0 {
        return Err(AppError::Conflict(
            "Ride cannot be started from its current state".to_string(),
        ));
    }

    ride_request::Entity::find_by_id(request_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::Internal("Ride request vanished during start".to_string()))
}

/// Complete a ride as its bound driver, finalizing the fare and freeing the
/// driver. A second completion attempt conflicts; a completion attempt by
/// anyone but the bound driver is an authorization failure.
pub async fn complete_request(
    db: &DatabaseConnection,
    fare: &FareSettings,
    driver_id: i32,
    request_id: i32,
) -> AppResult<ride_request::Model> {
    let txn = db.begin().await?;

    let request = ride_request::Entity::find_by_id(request_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Ride request not found".to_string()))?;

    if request.driver_id != Some(driver_id) {
        return Err(AppError::Forbidden(
            "You are not assigned to this ride".to_string(),
        ));
    }

    if !request.status.is_active() {
        return Err(AppError::Conflict(
            "Ride is not in a completable state".to_string(),
        ));
    }

    let now: DateTimeWithTimeZone = Utc::now().into();

    let distance_km = match (
        request.pickup_lat,
        request.pickup_lng,
        request.dropoff_lat,
        request.dropoff_lng,
    ) {
        (Some(plat), Some(plng), Some(dlat), Some(dlng)) => {
            haversine_distance(plat, plng, dlat, dlng)
        }
        _ => 0.0,
    };
    let duration_minutes = request
        .accepted_at
        .map(|t| (now - t).num_seconds() as f64 / 60.0)
        .unwrap_or(0.0);
    let amount = compute_fare(fare, distance_km, duration_minutes);

    let updated = ride_request::Entity::update_many()
        .set(ride_request::ActiveModel {
            status: Set(RideStatus::Completed),
            fare_amount: Set(Some(amount)),
            completed_at: Set(Some(now)),
            updated_at: Set(now),
            ..Default::default()
        })
        .filter(ride_request::Column::Id.eq(request_id))
        .filter(ride_request::Column::DriverId.eq(driver_id))
        .filter(ride_request::Column::Status.is_in([
            RideStatus::Assigned,
            RideStatus::Accepted,
            RideStatus::InProgress,
        ]))
        .exec(&txn)
        .await?;

    if updated.rows_affected == 0 {
        return Err(AppError::Conflict(
            "Ride is not in a completable state".to_string(),
        ));
    }

    driver::Entity::update_many()
        .set(driver::ActiveModel {
            available: Set(true),
            ..Default::default()
        })
        .filter(driver::Column::Id.eq(driver_id))
        .exec(&txn)
        .await?;

    let completed = ride_request::Entity::find_by_id(request_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::Internal("Ride request vanished during completion".to_string()))?;

    txn.commit().await?;

    tracing::info!(request_id, driver_id, fare = amount, "ride completed");
    Ok(completed)
}

/// Cancel a request (admin override). Clears the driver binding so the
/// binding invariant stays exact, and frees a previously bound driver.
pub async fn cancel_request(
    db: &DatabaseConnection,
    request_id: i32,
) -> AppResult<ride_request::Model> {
    let txn = db.begin().await?;

    let request = ride_request::Entity::find_by_id(request_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Ride request not found".to_string()))?;

    if request.status.is_terminal() {
        return Err(AppError::Conflict(
            "Ride request is already finalized".to_string(),
        ));
    }

    let now: DateTimeWithTimeZone = Utc::now().into();

    ride_request::Entity::update_many()
        .set(ride_request::ActiveModel {
            status: Set(RideStatus::Cancelled),
            driver_id: Set(None),
            updated_at: Set(now),
            ..Default::default()
        })
        .filter(ride_request::Column::Id.eq(request_id))
        .filter(ride_request::Column::Status.is_in([
            RideStatus::Pending,
            RideStatus::Assigned,
            RideStatus::Accepted,
            RideStatus::InProgress,
        ]))
        .exec(&txn)
        .await?;

    if let Some(bound_driver) = request.driver_id {
        driver::Entity::update_many()
            .set(driver::ActiveModel {
                available: Set(true),
                ..Default::default()
            })
            .filter(driver::Column::Id.eq(bound_driver))
            .exec(&txn)
            .await?;
    }

    let cancelled = ride_request::Entity::find_by_id(request_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::Internal("Ride request vanished during cancellation".to_string()))?;

    txn.commit().await?;

    tracing::info!(request_id, "ride request cancelled");
    Ok(cancelled)
}

/// Pending, unbound requests for a vehicle category, oldest first.
///
/// Read-only: concurrent viewers may race for the same candidate, and the
/// race is settled by `accept_request`'s conditional update.
pub async fn open_requests(
    db: &DatabaseConnection,
    category: VehicleCategory,
) -> AppResult<Vec<ride_request::Model>> {
    let requests = ride_request::Entity::find()
        .filter(ride_request::Column::Status.eq(RideStatus::Pending))
        .filter(ride_request::Column::DriverId.is_null())
        .filter(ride_request::Column::VehicleCategory.eq(category))
        .order_by_asc(ride_request::Column::CreatedAt)
        .all(db)
        .await?;

    Ok(requests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn fare_settings() -> FareSettings {
        FareSettings {
            base_fare: 2.5,
            per_km_rate: 1.2,
            per_minute_rate: 0.3,
        }
    }

    fn test_driver(id: i32) -> driver::Model {
        driver::Model {
            id,
            user_id: id + 100,
            vehicle_category: VehicleCategory::Sedan,
            vehicle_number: format!("DL-0{}-1234", id),
            available: true,
            is_online: true,
            current_lat: Some(28.61),
            current_lng: Some(77.21),
            location_updated_at: Some(Utc::now().fixed_offset()),
            created_at: Utc::now().fixed_offset(),
        }
    }

    fn pending_request(id: i32) -> ride_request::Model {
        let now = Utc::now().fixed_offset();
        ride_request::Model {
            id,
            passenger_id: 1,
            driver_id: None,
            pickup_address: "Connaught Place".to_string(),
            dropoff_address: "Cyber City".to_string(),
            pickup_lat: Some(28.6315),
            pickup_lng: Some(77.2167),
            dropoff_lat: Some(28.4950),
            dropoff_lng: Some(77.0890),
            vehicle_category: VehicleCategory::Sedan,
            status: RideStatus::Pending,
            fare_amount: None,
            created_at: now,
            updated_at: now,
            accepted_at: None,
            completed_at: None,
        }
    }

    fn bound_request(id: i32, driver_id: i32, status: RideStatus) -> ride_request::Model {
        let now = Utc::now().fixed_offset();
        ride_request::Model {
            driver_id: Some(driver_id),
            status,
            accepted_at: Some(now),
            ..pending_request(id)
        }
    }

    fn exec_ok(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    #[tokio::test]
    async fn test_accept_binds_driver() {
        let accepted = bound_request(1, 9, RideStatus::Accepted);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![pending_request(1)]])
            .append_query_results([vec![accepted.clone()]])
            .append_exec_results([exec_ok(1), exec_ok(1)])
            .into_connection();

        let result = accept_request(&db, &test_driver(9), 1).await.unwrap();
        assert_eq!(result.status, RideStatus::Accepted);
        assert_eq!(result.driver_id, Some(9));
        assert!(result.holds_binding_invariant());
    }

    #[tokio::test]
    async fn test_accept_loses_race_on_zero_rows() {
        // The request still read as pending, but the conditional update
        // finds it already taken
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![pending_request(1)]])
            .append_exec_results([exec_ok(0)])
            .into_connection();

        let err = accept_request(&db, &test_driver(9), 1).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_accept_rejects_bound_request() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![bound_request(1, 7, RideStatus::Accepted)]])
            .into_connection();

        let err = accept_request(&db, &test_driver(9), 1).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_accept_rejects_category_mismatch() {
        let mut request = pending_request(1);
        request.vehicle_category = VehicleCategory::Suv;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![request]])
            .into_connection();

        let err = accept_request(&db, &test_driver(9), 1).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_accept_rejects_busy_driver() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let mut busy = test_driver(9);
        busy.available = false;
        let err = accept_request(&db, &busy, 1).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_accept_missing_request_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<ride_request::Model>::new()])
            .into_connection();

        let err = accept_request(&db, &test_driver(9), 42).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_assign_marks_driver_unavailable() {
        let assigned = bound_request(1, 9, RideStatus::Assigned);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![pending_request(1)]])
            .append_query_results([vec![test_driver(9)]])
            .append_query_results([vec![assigned.clone()]])
            .append_exec_results([exec_ok(1), exec_ok(1)])
            .into_connection();

        let result = assign_driver(&db, 1, 9).await.unwrap();
        assert_eq!(result.status, RideStatus::Assigned);
        assert!(result.holds_binding_invariant());
    }

    #[tokio::test]
    async fn test_assign_rejects_non_pending_request() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![bound_request(1, 7, RideStatus::Assigned)]])
            .into_connection();

        let err = assign_driver(&db, 1, 9).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_assign_rejects_unavailable_driver() {
        let mut offline = test_driver(9);
        offline.is_online = false;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![pending_request(1)]])
            .append_query_results([vec![offline]])
            .into_connection();

        let err = assign_driver(&db, 1, 9).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_complete_requires_bound_driver() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![bound_request(1, 7, RideStatus::InProgress)]])
            .into_connection();

        let err = complete_request(&db, &fare_settings(), 9, 1).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_complete_twice_conflicts() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![bound_request(1, 9, RideStatus::Completed)]])
            .into_connection();

        let err = complete_request(&db, &fare_settings(), 9, 1).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_complete_finalizes_fare() {
        let mut done = bound_request(1, 9, RideStatus::Completed);
        done.fare_amount = Some(27.4);
        done.completed_at = Some(Utc::now().fixed_offset());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![bound_request(1, 9, RideStatus::InProgress)]])
            .append_query_results([vec![done]])
            .append_exec_results([exec_ok(1), exec_ok(1)])
            .into_connection();

        let result = complete_request(&db, &fare_settings(), 9, 1).await.unwrap();
        assert_eq!(result.status, RideStatus::Completed);
        assert!(result.fare_amount.is_some());
        assert!(result.holds_binding_invariant());
    }

    #[tokio::test]
    async fn test_start_requires_acceptable_state() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![bound_request(1, 9, RideStatus::InProgress)]])
            .append_exec_results([exec_ok(0)])
            .into_connection();

        let err = start_ride(&db, 9, 1).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_cancel_frees_bound_driver() {
        let mut cancelled = pending_request(1);
        cancelled.status = RideStatus::Cancelled;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![bound_request(1, 9, RideStatus::Assigned)]])
            .append_query_results([vec![cancelled]])
            .append_exec_results([exec_ok(1), exec_ok(1)])
            .into_connection();

        let result = cancel_request(&db, 1).await.unwrap();
        assert_eq!(result.status, RideStatus::Cancelled);
        assert_eq!(result.driver_id, None);
        assert!(result.holds_binding_invariant());
    }

    #[tokio::test]
    async fn test_cancel_terminal_conflicts() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![bound_request(1, 9, RideStatus::Completed)]])
            .into_connection();

        let err = cancel_request(&db, 1).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
