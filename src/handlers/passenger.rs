use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};

use crate::entities::driver::{self, VehicleCategory};
use crate::entities::ride_request::{self, RideStatus};
use crate::entities::user;
use crate::error::{AppError, AppResult};
use crate::utils::geo::is_valid_coordinate;
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateRideRequest {
    pub pickup_address: String,
    pub dropoff_address: String,
    pub pickup_lat: Option<f64>,
    pub pickup_lng: Option<f64>,
    pub dropoff_lat: Option<f64>,
    pub dropoff_lng: Option<f64>,
    pub vehicle_category: VehicleCategory,
}

#[derive(Debug, Serialize)]
pub struct RideRequestResponse {
    pub id: i32,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub vehicle_category: VehicleCategory,
    pub status: RideStatus,
    pub driver_name: Option<String>,
    pub fare_amount: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

fn to_response(r: ride_request::Model, driver_name: Option<String>) -> RideRequestResponse {
    RideRequestResponse {
        id: r.id,
        pickup_address: r.pickup_address,
        dropoff_address: r.dropoff_address,
        vehicle_category: r.vehicle_category,
        status: r.status,
        driver_name,
        fare_amount: r.fare_amount,
        created_at: r.created_at.with_timezone(&Utc),
        accepted_at: r.accepted_at.map(|t| t.with_timezone(&Utc)),
        completed_at: r.completed_at.map(|t| t.with_timezone(&Utc)),
    }
}

fn validate_coordinate_pair(
    lat: Option<f64>,
    lng: Option<f64>,
    which: &str,
) -> AppResult<()> {
    match (lat, lng) {
        (None, None) => Ok(()),
        (Some(lat), Some(lng)) => {
            if is_valid_coordinate(lat, lng) {
                Ok(())
            } else {
                Err(AppError::BadRequest(format!(
                    "{} coordinates are out of range",
                    which
                )))
            }
        }
        _ => Err(AppError::BadRequest(format!(
            "{} latitude and longitude must be provided together",
            which
        ))),
    }
}

/// Resolve the display name of a bound driver, if any
async fn driver_name_for(
    state: &AppState,
    driver_id: Option<i32>,
) -> AppResult<Option<String>> {
    let Some(driver_id) = driver_id else {
        return Ok(None);
    };

    let Some(profile) = driver::Entity::find_by_id(driver_id).one(&state.db).await? else {
        return Ok(None);
    };

    let name = user::Entity::find_by_id(profile.user_id)
        .one(&state.db)
        .await?
        .map(|u| u.name);

    Ok(name)
}

/// Create a ride request (passenger)
pub async fn create_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateRideRequest>,
) -> AppResult<Json<RideRequestResponse>> {
    if payload.pickup_address.trim().is_empty() || payload.dropoff_address.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Pickup and dropoff addresses are required".to_string(),
        ));
    }

    validate_coordinate_pair(payload.pickup_lat, payload.pickup_lng, "Pickup")?;
    validate_coordinate_pair(payload.dropoff_lat, payload.dropoff_lng, "Dropoff")?;

    let new_request = ride_request::ActiveModel {
        passenger_id: Set(claims.sub),
        driver_id: Set(None),
        pickup_address: Set(payload.pickup_address.trim().to_string()),
        dropoff_address: Set(payload.dropoff_address.trim().to_string()),
        pickup_lat: Set(payload.pickup_lat),
        pickup_lng: Set(payload.pickup_lng),
        dropoff_lat: Set(payload.dropoff_lat),
        dropoff_lng: Set(payload.dropoff_lng),
        vehicle_category: Set(payload.vehicle_category),
        status: Set(RideStatus::Pending),
        fare_amount: Set(None),
        ..Default::default()
    };

    let request = new_request.insert(&state.db).await?;

    Ok(Json(to_response(request, None)))
}

/// List the logged-in passenger's ride requests, newest first
pub async fn my_requests(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<RideRequestResponse>>> {
    let requests = ride_request::Entity::find()
        .filter(ride_request::Column::PassengerId.eq(claims.sub))
        .order_by_desc(ride_request::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let profiles = driver::Entity::find().all(&state.db).await?;
    let users = user::Entity::find().all(&state.db).await?;

    let responses: Vec<RideRequestResponse> = requests
        .into_iter()
        .map(|r| {
            let driver_name = r.driver_id.and_then(|did| {
                let profile = profiles.iter().find(|p| p.id == did)?;
                users.iter().find(|u| u.id == profile.user_id).map(|u| u.name.clone())
            });
            to_response(r, driver_name)
        })
        .collect();

    Ok(Json(responses))
}

/// Get one of the passenger's own ride requests
pub async fn get_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(request_id): Path<i32>,
) -> AppResult<Json<RideRequestResponse>> {
    let request = ride_request::Entity::find_by_id(request_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ride request not found".to_string()))?;

    if request.passenger_id != claims.sub {
        return Err(AppError::Forbidden(
            "You can only view your own ride requests".to_string(),
        ));
    }

    let driver_name = driver_name_for(&state, request.driver_id).await?;

    Ok(Json(to_response(request, driver_name)))
}
