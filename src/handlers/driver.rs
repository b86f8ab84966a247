use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};

use crate::assignment;
use crate::entities::driver::{self, VehicleCategory};
use crate::entities::ride_request::{self, RideStatus};
use crate::entities::user;
use crate::error::{AppError, AppResult};
use crate::utils::geo::is_valid_coordinate;
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct OpenRequestResponse {
    pub id: i32,
    pub passenger_name: String,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub pickup_lat: Option<f64>,
    pub pickup_lng: Option<f64>,
    pub vehicle_category: VehicleCategory,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct DriverRideResponse {
    pub id: i32,
    pub passenger_name: String,
    pub passenger_phone: String,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub status: RideStatus,
    pub fare_amount: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Look up the acting driver's profile from the authenticated identity
async fn driver_profile(state: &AppState, claims: &Claims) -> AppResult<driver::Model> {
    driver::Entity::find()
        .filter(driver::Column::UserId.eq(claims.sub))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Driver profile not found".to_string()))
}

/// List open requests matching the driver's vehicle category, oldest first
pub async fn open_requests(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<OpenRequestResponse>>> {
    let profile = driver_profile(&state, &claims).await?;

    let requests = assignment::open_requests(&state.db, profile.vehicle_category).await?;
    let users = user::Entity::find().all(&state.db).await?;

    let responses: Vec<OpenRequestResponse> = requests
        .into_iter()
        .map(|r| {
            let passenger = users.iter().find(|u| u.id == r.passenger_id);
            OpenRequestResponse {
                id: r.id,
                passenger_name: passenger.map(|u| u.name.clone()).unwrap_or_default(),
                pickup_address: r.pickup_address,
                dropoff_address: r.dropoff_address,
                pickup_lat: r.pickup_lat,
                pickup_lng: r.pickup_lng,
                vehicle_category: r.vehicle_category,
                created_at: r.created_at.with_timezone(&Utc),
            }
        })
        .collect();

    Ok(Json(responses))
}

/// Accept an open ride request
pub async fn accept_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(request_id): Path<i32>,
) -> AppResult<Json<ride_request::Model>> {
    let profile = driver_profile(&state, &claims).await?;

    let accepted = assignment::accept_request(&state.db, &profile, request_id).await?;
    Ok(Json(accepted))
}

/// Start an accepted ride
pub async fn start_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(request_id): Path<i32>,
) -> AppResult<Json<ride_request::Model>> {
    let profile = driver_profile(&state, &claims).await?;

    let started = assignment::start_ride(&state.db, profile.id, request_id).await?;
    Ok(Json(started))
}

/// Complete a ride, finalizing the fare
pub async fn complete_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(request_id): Path<i32>,
) -> AppResult<Json<ride_request::Model>> {
    let profile = driver_profile(&state, &claims).await?;

    let completed =
        assignment::complete_request(&state.db, &state.config.fare, profile.id, request_id).await?;
    Ok(Json(completed))
}

/// List rides bound to the logged-in driver
pub async fn my_rides(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<DriverRideResponse>>> {
    let profile = driver_profile(&state, &claims).await?;

    let rides = ride_request::Entity::find()
        .filter(ride_request::Column::DriverId.eq(profile.id))
        .all(&state.db)
        .await?;

    let users = user::Entity::find().all(&state.db).await?;

    let responses: Vec<DriverRideResponse> = rides
        .into_iter()
        .map(|r| {
            let passenger = users.iter().find(|u| u.id == r.passenger_id);
            DriverRideResponse {
                id: r.id,
                passenger_name: passenger.map(|u| u.name.clone()).unwrap_or_default(),
                passenger_phone: passenger.map(|u| u.phone.clone()).unwrap_or_default(),
                pickup_address: r.pickup_address,
                dropoff_address: r.dropoff_address,
                status: r.status,
                fare_amount: r.fare_amount,
                created_at: r.created_at.with_timezone(&Utc),
                accepted_at: r.accepted_at.map(|t| t.with_timezone(&Utc)),
                completed_at: r.completed_at.map(|t| t.with_timezone(&Utc)),
            }
        })
        .collect();

    Ok(Json(responses))
}

#[derive(Debug, Deserialize)]
pub struct LocationUpdateRequest {
    pub lat: f64,
    pub lng: f64,
}

/// Record the driver's last-known location; a ping also marks them online
pub async fn update_location(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<LocationUpdateRequest>,
) -> AppResult<Json<driver::Model>> {
    if !is_valid_coordinate(payload.lat, payload.lng) {
        return Err(AppError::BadRequest("Coordinates are out of range".to_string()));
    }

    let profile = driver_profile(&state, &claims).await?;

    let mut active: driver::ActiveModel = profile.into();
    active.current_lat = Set(Some(payload.lat));
    active.current_lng = Set(Some(payload.lng));
    active.location_updated_at = Set(Some(Utc::now().into()));
    active.is_online = Set(true);

    let updated = active.update(&state.db).await?;
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub is_online: Option<bool>,
    pub available: Option<bool>,
}

/// Toggle online presence and availability
pub async fn update_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<StatusUpdateRequest>,
) -> AppResult<Json<driver::Model>> {
    let profile = driver_profile(&state, &claims).await?;

    if payload.available == Some(true) {
        // Availability cannot be reclaimed while holding an active ride
        let active_ride = ride_request::Entity::find()
            .filter(ride_request::Column::DriverId.eq(profile.id))
            .filter(ride_request::Column::Status.is_in([
                RideStatus::Assigned,
                RideStatus::Accepted,
                RideStatus::InProgress,
            ]))
            .one(&state.db)
            .await?;

        if active_ride.is_some() {
            return Err(AppError::Conflict(
                "Cannot become available while a ride is active".to_string(),
            ));
        }
    }

    let mut active: driver::ActiveModel = profile.into();
    if let Some(is_online) = payload.is_online {
        active.is_online = Set(is_online);
    }
    if let Some(available) = payload.available {
        active.available = Set(available);
    }

    let updated = active.update(&state.db).await?;
    Ok(Json(updated))
}
