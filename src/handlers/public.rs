use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::utils::geo::{haversine_distance, is_valid_coordinate};
use crate::utils::pricing::compute_fare;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FareEstimateRequest {
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub dropoff_lat: f64,
    pub dropoff_lng: f64,
}

#[derive(Debug, Serialize)]
pub struct FareEstimateResponse {
    pub distance_km: f64,
    pub estimated_fare: f64,
}

/// Straight-line fare estimate; the final fare also charges ride duration
pub async fn fare_estimate(
    State(state): State<AppState>,
    Json(payload): Json<FareEstimateRequest>,
) -> AppResult<Json<FareEstimateResponse>> {
    if !is_valid_coordinate(payload.pickup_lat, payload.pickup_lng)
        || !is_valid_coordinate(payload.dropoff_lat, payload.dropoff_lng)
    {
        return Err(AppError::BadRequest("Coordinates are out of range".to_string()));
    }

    let distance_km = haversine_distance(
        payload.pickup_lat,
        payload.pickup_lng,
        payload.dropoff_lat,
        payload.dropoff_lng,
    );

    Ok(Json(FareEstimateResponse {
        distance_km: (distance_km * 100.0).round() / 100.0,
        estimated_fare: compute_fare(&state.config.fare, distance_km, 0.0),
    }))
}
