use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub server_host: String,
    pub server_port: u16,
    pub fare: FareSettings,
}

/// Pricing inputs for completed rides. Distance is straight-line between
/// pickup and dropoff; duration runs from acceptance to completion.
#[derive(Clone, Copy)]
pub struct FareSettings {
    pub base_fare: f64,
    pub per_km_rate: f64,
    pub per_minute_rate: f64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET")
                .expect("JWT_SECRET must be set"),
            jwt_expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("JWT_EXPIRATION_HOURS must be a number"),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            fare: FareSettings {
                base_fare: env::var("BASE_FARE")
                    .unwrap_or_else(|_| "2.5".to_string())
                    .parse()
                    .expect("BASE_FARE must be a number"),
                per_km_rate: env::var("PER_KM_RATE")
                    .unwrap_or_else(|_| "1.2".to_string())
                    .parse()
                    .expect("PER_KM_RATE must be a number"),
                per_minute_rate: env::var("PER_MINUTE_RATE")
                    .unwrap_or_else(|_| "0.3".to_string())
                    .parse()
                    .expect("PER_MINUTE_RATE must be a number"),
            },
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
