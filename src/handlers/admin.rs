use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveEnum, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};

use crate::assignment;
use crate::entities::driver::{self, VehicleCategory};
use crate::entities::ride_request::{self, RideStatus};
use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::utils::csv::write_record;
use crate::AppState;

// ============ Ride Request Management ============

#[derive(Debug, Serialize)]
pub struct AdminRideRequestResponse {
    pub id: i32,
    pub passenger_name: String,
    pub passenger_phone: String,
    pub driver_name: Option<String>,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub vehicle_category: VehicleCategory,
    pub status: RideStatus,
    pub fare_amount: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

fn joined_response(
    r: ride_request::Model,
    users: &[user::Model],
    profiles: &[driver::Model],
) -> AdminRideRequestResponse {
    let passenger = users.iter().find(|u| u.id == r.passenger_id);
    let driver_name = r.driver_id.and_then(|did| {
        let profile = profiles.iter().find(|p| p.id == did)?;
        users.iter().find(|u| u.id == profile.user_id).map(|u| u.name.clone())
    });

    AdminRideRequestResponse {
        id: r.id,
        passenger_name: passenger.map(|u| u.name.clone()).unwrap_or_default(),
        passenger_phone: passenger.map(|u| u.phone.clone()).unwrap_or_default(),
        driver_name,
        pickup_address: r.pickup_address,
        dropoff_address: r.dropoff_address,
        vehicle_category: r.vehicle_category,
        status: r.status,
        fare_amount: r.fare_amount,
        created_at: r.created_at.with_timezone(&Utc),
        completed_at: r.completed_at.map(|t| t.with_timezone(&Utc)),
    }
}

/// List all ride requests with passenger and driver names (admin)
pub async fn list_requests(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<AdminRideRequestResponse>>> {
    let requests = ride_request::Entity::find()
        .order_by_desc(ride_request::Column::CreatedAt)
        .all(&state.db)
        .await?;
    let users = user::Entity::find().all(&state.db).await?;
    let profiles = driver::Entity::find().all(&state.db).await?;

    let responses: Vec<AdminRideRequestResponse> = requests
        .into_iter()
        .map(|r| joined_response(r, &users, &profiles))
        .collect();

    Ok(Json(responses))
}

#[derive(Debug, Deserialize)]
pub struct AssignDriverRequest {
    pub driver_id: i32,
}

/// Assign a driver to a pending ride request (admin)
pub async fn assign_driver(
    State(state): State<AppState>,
    Path(request_id): Path<i32>,
    Json(payload): Json<AssignDriverRequest>,
) -> AppResult<Json<ride_request::Model>> {
    let assigned = assignment::assign_driver(&state.db, request_id, payload.driver_id).await?;
    Ok(Json(assigned))
}

/// Cancel a ride request (admin)
pub async fn cancel_request(
    State(state): State<AppState>,
    Path(request_id): Path<i32>,
) -> AppResult<Json<ride_request::Model>> {
    let cancelled = assignment::cancel_request(&state.db, request_id).await?;
    Ok(Json(cancelled))
}

/// Delete a ride request outright (admin override, outside the lifecycle)
pub async fn delete_request(
    State(state): State<AppState>,
    Path(request_id): Path<i32>,
) -> AppResult<Json<serde_json::Value>> {
    let result = ride_request::Entity::delete_by_id(request_id)
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Ride request not found".to_string()));
    }

    Ok(Json(serde_json::json!({ "message": "Ride request deleted" })))
}

// ============ Driver Management ============

#[derive(Debug, Serialize)]
pub struct AdminDriverResponse {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub vehicle_category: VehicleCategory,
    pub vehicle_number: String,
    pub available: bool,
    pub is_online: bool,
    pub current_lat: Option<f64>,
    pub current_lng: Option<f64>,
    pub location_updated_at: Option<DateTime<Utc>>,
}

/// List all drivers with contact and availability (admin)
pub async fn list_drivers(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<AdminDriverResponse>>> {
    let profiles = driver::Entity::find().all(&state.db).await?;
    let users = user::Entity::find().all(&state.db).await?;

    let responses: Vec<AdminDriverResponse> = profiles
        .into_iter()
        .map(|p| {
            let account = users.iter().find(|u| u.id == p.user_id);
            AdminDriverResponse {
                id: p.id,
                name: account.map(|u| u.name.clone()).unwrap_or_default(),
                email: account.map(|u| u.email.clone()).unwrap_or_default(),
                phone: account.map(|u| u.phone.clone()).unwrap_or_default(),
                vehicle_category: p.vehicle_category,
                vehicle_number: p.vehicle_number,
                available: p.available,
                is_online: p.is_online,
                current_lat: p.current_lat,
                current_lng: p.current_lng,
                location_updated_at: p.location_updated_at.map(|t| t.with_timezone(&Utc)),
            }
        })
        .collect();

    Ok(Json(responses))
}

// ============ User Management ============

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub phone: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// List all users (admin)
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserResponse>>> {
    let users = user::Entity::find().all(&state.db).await?;

    let responses: Vec<UserResponse> = users
        .into_iter()
        .map(|u| UserResponse {
            id: u.id,
            email: u.email,
            name: u.name,
            phone: u.phone,
            role: u.role,
            created_at: u.created_at.with_timezone(&Utc),
        })
        .collect();

    Ok(Json(responses))
}

/// Delete a user account (admin)
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> AppResult<Json<serde_json::Value>> {
    let account = user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if account.role == UserRole::Driver {
        // Cancel rides the driver still holds so no bound ride outlives its driver
        let profile = driver::Entity::find()
            .filter(driver::Column::UserId.eq(user_id))
            .one(&state.db)
            .await?;

        if let Some(profile) = profile {
            ride_request::Entity::update_many()
                .set(ride_request::ActiveModel {
                    status: Set(RideStatus::Cancelled),
                    driver_id: Set(None),
                    updated_at: Set(Utc::now().into()),
                    ..Default::default()
                })
                .filter(ride_request::Column::DriverId.eq(profile.id))
                .filter(ride_request::Column::Status.is_in([
                    RideStatus::Assigned,
                    RideStatus::Accepted,
                    RideStatus::InProgress,
                ]))
                .exec(&state.db)
                .await?;
        }
    }

    // Driver profiles and passenger requests fall with the user row
    user::Entity::delete_by_id(user_id).exec(&state.db).await?;

    Ok(Json(serde_json::json!({ "message": "User deleted" })))
}

// ============ Analytics ============

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    pub total_requests: usize,
    pub pending: usize,
    pub assigned: usize,
    pub accepted: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub total_revenue: f64,
    pub total_drivers: usize,
    pub online_drivers: usize,
    pub available_drivers: usize,
}

/// Dashboard aggregates over requests and drivers (admin)
pub async fn analytics(State(state): State<AppState>) -> AppResult<Json<AnalyticsResponse>> {
    let requests = ride_request::Entity::find().all(&state.db).await?;
    let profiles = driver::Entity::find().all(&state.db).await?;

    let count = |s: RideStatus| requests.iter().filter(|r| r.status == s).count();

    let total_revenue: f64 = requests
        .iter()
        .filter(|r| r.status == RideStatus::Completed)
        .filter_map(|r| r.fare_amount)
        .sum();

    Ok(Json(AnalyticsResponse {
        total_requests: requests.len(),
        pending: count(RideStatus::Pending),
        assigned: count(RideStatus::Assigned),
        accepted: count(RideStatus::Accepted),
        in_progress: count(RideStatus::InProgress),
        completed: count(RideStatus::Completed),
        cancelled: count(RideStatus::Cancelled),
        total_revenue,
        total_drivers: profiles.len(),
        online_drivers: profiles.iter().filter(|p| p.is_online).count(),
        available_drivers: profiles.iter().filter(|p| p.available).count(),
    }))
}

// ============ CSV Export ============

/// Export all ride requests as CSV (admin)
pub async fn export_requests_csv(
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let requests = ride_request::Entity::find()
        .order_by_asc(ride_request::Column::Id)
        .all(&state.db)
        .await?;
    let users = user::Entity::find().all(&state.db).await?;
    let profiles = driver::Entity::find().all(&state.db).await?;

    let mut lines = vec![write_record(&[
        "id".to_string(),
        "passenger".to_string(),
        "driver".to_string(),
        "pickup".to_string(),
        "dropoff".to_string(),
        "category".to_string(),
        "status".to_string(),
        "fare".to_string(),
        "created_at".to_string(),
        "completed_at".to_string(),
    ])];

    for r in requests {
        let passenger = users.iter().find(|u| u.id == r.passenger_id);
        let driver_name = r.driver_id.and_then(|did| {
            let profile = profiles.iter().find(|p| p.id == did)?;
            users.iter().find(|u| u.id == profile.user_id).map(|u| u.name.clone())
        });

        lines.push(write_record(&[
            r.id.to_string(),
            passenger.map(|u| u.name.clone()).unwrap_or_default(),
            driver_name.unwrap_or_default(),
            r.pickup_address,
            r.dropoff_address,
            r.vehicle_category.to_value(),
            r.status.to_value(),
            r.fare_amount.map(|f| format!("{:.2}", f)).unwrap_or_default(),
            r.created_at.with_timezone(&Utc).to_rfc3339(),
            r.completed_at
                .map(|t| t.with_timezone(&Utc).to_rfc3339())
                .unwrap_or_default(),
        ]));
    }

    let body = lines.join("\n");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"ride_requests.csv\"",
            ),
        ],
        body,
    ))
}
