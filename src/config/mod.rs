use serde::Deserialize;
use std::env;

// Container for all runtime settings, loaded once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub booking: BookingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Tunables for the booking core. The sweep cadences are deliberately
// configuration, not constants: the lock sweep wants to run often, while the
// booking-expiry sweep period is an ops choice.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    /// How long a seat lock is held before the sweep may reclaim it.
    pub seat_lock_ttl_minutes: i64,
    /// Flat online booking fee, in minor currency units.
    pub booking_fee: i64,
    pub currency: String,
    /// Cadence of the expired-lock sweep.
    pub lock_sweep_interval_secs: u64,
    /// Cadence of the stale-booking sweep.
    pub booking_sweep_interval_secs: u64,
    /// Check-in opens this many minutes before the showtime starts.
    pub checkin_window_minutes: i64,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .expect("PORT must be a valid number"),
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "cinema_booking=debug,tower_http=debug".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
                pool_size: env::var("DB_POOL_SIZE")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .expect("DB_POOL_SIZE must be a valid number"),
            },
            booking: BookingConfig {
                seat_lock_ttl_minutes: env::var("SEAT_LOCK_TTL_MINUTES")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .expect("SEAT_LOCK_TTL_MINUTES must be a valid number"),
                booking_fee: env::var("BOOKING_FEE")
                    .unwrap_or_else(|_| "5000".to_string())
                    .parse()
                    .expect("BOOKING_FEE must be a valid number"),
                currency: env::var("CURRENCY").unwrap_or_else(|_| "INR".to_string()),
                lock_sweep_interval_secs: env::var("LOCK_SWEEP_INTERVAL_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .expect("LOCK_SWEEP_INTERVAL_SECS must be a valid number"),
                booking_sweep_interval_secs: env::var("BOOKING_SWEEP_INTERVAL_SECS")
                    .unwrap_or_else(|_| "600".to_string())
                    .parse()
                    .expect("BOOKING_SWEEP_INTERVAL_SECS must be a valid number"),
                checkin_window_minutes: env::var("CHECKIN_WINDOW_MINUTES")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .expect("CHECKIN_WINDOW_MINUTES must be a valid number"),
            },
        }
    }
}
