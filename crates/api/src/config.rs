//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use reservations::{DEFAULT_RESERVATION_TTL, DEFAULT_SWEEP_INTERVAL};
use shipping::DEFAULT_PRICING_TTL;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `DATABASE_URL` — Postgres URL for reservations (default: in-memory)
/// - `RESERVATION_TTL_SECS` — lease length (default: `1200`)
/// - `SWEEP_INTERVAL_SECS` — pause between expiry sweeps (default: `120`)
/// - `CARRIER_CONFIG_PATH` — carrier pricing JSON (default: bundled document)
/// - `PRICING_CACHE_TTL_SECS` — pricing cache lifetime (default: `60`)
/// - `CATALOG_PATH` — JSON seed for the in-memory catalog
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub reservation_ttl: Duration,
    pub sweep_interval: Duration,
    pub carrier_config_path: Option<PathBuf>,
    pub pricing_cache_ttl: Duration,
    pub catalog_path: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: non_empty_var("DATABASE_URL"),
            reservation_ttl: secs_var("RESERVATION_TTL_SECS").unwrap_or(defaults.reservation_ttl),
            sweep_interval: secs_var("SWEEP_INTERVAL_SECS")
                .filter(|d| !d.is_zero())
                .unwrap_or(defaults.sweep_interval),
            carrier_config_path: non_empty_var("CARRIER_CONFIG_PATH").map(PathBuf::from),
            pricing_cache_ttl: secs_var("PRICING_CACHE_TTL_SECS")
                .unwrap_or(defaults.pricing_cache_ttl),
            catalog_path: non_empty_var("CATALOG_PATH").map(PathBuf::from),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            reservation_ttl: DEFAULT_RESERVATION_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            carrier_config_path: None,
            pricing_cache_ttl: DEFAULT_PRICING_TTL,
            catalog_path: None,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn secs_var(key: &str) -> Option<Duration> {
    non_empty_var(key).and_then(|v| parse_secs(&v))
}

fn parse_secs(raw: &str) -> Option<Duration> {
    raw.trim().parse::<u64>().ok().map(Duration::from_secs)
}
