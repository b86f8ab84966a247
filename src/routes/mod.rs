use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::handlers::{admin, auth, driver, passenger, public};
use crate::middleware::auth::{auth_middleware, require_admin, require_driver, require_passenger};
use crate::middleware::rate_limit::create_public_governor;
use crate::middleware::role_rate_limit::{create_role_governor, RateLimitedRole};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Create role-specific governor layers
    let driver_governor = create_role_governor(RateLimitedRole::Driver);
    let passenger_governor = create_role_governor(RateLimitedRole::Passenger);
    // Create IP-based governor for public routes (with passenger-level limits)
    let public_governor = create_public_governor();

    // Public routes (with passenger-level rate limiting per IP)
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/register-driver", post(auth::register_driver))
        .route("/login", post(auth::login))
        .layer(public_governor.clone());

    // Public fare estimation
    let public_routes = Router::new()
        .route("/fare-estimate", post(public::fare_estimate))
        .layer(public_governor);

    // Admin routes (requires auth + admin role)
    let admin_routes = Router::new()
        // Ride request management
        .route("/requests", get(admin::list_requests))
        .route("/requests/{id}/assign-driver", post(admin::assign_driver))
        .route("/requests/{id}/cancel", post(admin::cancel_request))
        .route("/requests/{id}", delete(admin::delete_request))
        .route("/requests/export", get(admin::export_requests_csv))
        // Drivers
        .route("/drivers", get(admin::list_drivers))
        // User management
        .route("/users", get(admin::list_users))
        .route("/users/{id}", delete(admin::delete_user))
        // Dashboards
        .route("/analytics", get(admin::analytics))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Driver routes (requires auth + driver role)
    let driver_routes = Router::new()
        .route("/requests", get(driver::open_requests))
        .route("/requests/{id}/accept", post(driver::accept_request))
        .route("/requests/{id}/start", post(driver::start_ride))
        .route("/requests/{id}/complete", post(driver::complete_ride))
        .route("/rides", get(driver::my_rides))
        .route("/location", put(driver::update_location))
        .route("/status", put(driver::update_status))
        .layer(driver_governor)
        .layer(middleware::from_fn(require_driver))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Passenger routes (requires auth + passenger role)
    let passenger_routes = Router::new()
        .route("/", post(passenger::create_request))
        .route("/", get(passenger::my_requests))
        .route("/{id}", get(passenger::get_request))
        .layer(passenger_governor)
        .layer(middleware::from_fn(require_passenger))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Combine all routes
    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api", public_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/driver", driver_routes)
        .nest("/api/rides", passenger_routes)
        .with_state(state)
}
