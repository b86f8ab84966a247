use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, Json};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};

use crate::entities::driver::{self, VehicleCategory};
use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::utils::jwt::create_token;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterDriverRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: String,
    pub vehicle_category: VehicleCategory,
    pub vehicle_number: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

async fn ensure_email_free(state: &AppState, email: &str) -> AppResult<()> {
    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(&state.db)
        .await?;

    if existing.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }
    Ok(())
}

/// Register a new passenger account
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<Json<AuthResponse>> {
    if payload.name.trim().is_empty() || payload.phone.trim().is_empty() {
        return Err(AppError::BadRequest("Name and phone are required".to_string()));
    }

    ensure_email_free(&state, &payload.email).await?;

    let password_hash = hash_password(&payload.password)?;

    let new_user = user::ActiveModel {
        email: Set(payload.email.clone()),
        password_hash: Set(password_hash),
        name: Set(payload.name.clone()),
        phone: Set(payload.phone.clone()),
        role: Set(UserRole::Passenger),
        ..Default::default()
    };

    let user = new_user.insert(&state.db).await?;

    let token = create_token(
        user.id,
        &user.email,
        user.role.clone(),
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )?;

    Ok(Json(AuthResponse {
        token,
        user: UserInfo {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
        },
    }))
}

/// Register a new driver account with a vehicle profile
pub async fn register_driver(
    State(state): State<AppState>,
    Json(payload): Json<RegisterDriverRequest>,
) -> AppResult<Json<AuthResponse>> {
    if payload.name.trim().is_empty() || payload.phone.trim().is_empty() {
        return Err(AppError::BadRequest("Name and phone are required".to_string()));
    }

    if payload.vehicle_number.trim().is_empty() {
        return Err(AppError::BadRequest("Vehicle number is required".to_string()));
    }

    ensure_email_free(&state, &payload.email).await?;

    let existing_vehicle = driver::Entity::find()
        .filter(driver::Column::VehicleNumber.eq(payload.vehicle_number.trim()))
        .one(&state.db)
        .await?;

    if existing_vehicle.is_some() {
        return Err(AppError::Conflict(
            "Vehicle number already registered".to_string(),
        ));
    }

    let password_hash = hash_password(&payload.password)?;

    let new_user = user::ActiveModel {
        email: Set(payload.email.clone()),
        password_hash: Set(password_hash),
        name: Set(payload.name.clone()),
        phone: Set(payload.phone.clone()),
        role: Set(UserRole::Driver),
        ..Default::default()
    };

    let user = new_user.insert(&state.db).await?;

    let profile = driver::ActiveModel {
        user_id: Set(user.id),
        vehicle_category: Set(payload.vehicle_category),
        vehicle_number: Set(payload.vehicle_number.trim().to_string()),
        available: Set(true),
        is_online: Set(false),
        ..Default::default()
    };

    profile.insert(&state.db).await?;

    let token = create_token(
        user.id,
        &user.email,
        user.role.clone(),
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )?;

    Ok(Json(AuthResponse {
        token,
        user: UserInfo {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
        },
    }))
}

/// Login with email and password
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = user::Entity::find()
        .filter(user::Column::Email.eq(&payload.email))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|e| AppError::Internal(format!("Failed to parse password hash: {}", e)))?;

    Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::Unauthorized("Invalid email or password".to_string()))?;

    let token = create_token(
        user.id,
        &user.email,
        user.role.clone(),
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )?;

    Ok(Json(AuthResponse {
        token,
        user: UserInfo {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
        },
    }))
}
