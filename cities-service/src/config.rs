use std::env;
use std::str::FromStr;
use std::time::Duration;

pub struct Config {
    pub port: u16,
    pub database_url: Option<String>,
    pub cities_file: Option<String>,
    pub open_meteo_url: String,
    pub forecast_timeout_seconds: u64,
    pub cache_ttl_seconds: u64,
    pub cache_eviction_interval_seconds: u64,
    pub max_concurrent_fetches: usize,
    pub jwt_secret: String,
    pub log_format: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: parse_or("PORT", 3002),
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            cities_file: env::var("CITIES_FILE").ok().filter(|s| !s.is_empty()),
            open_meteo_url: env::var("OPEN_METEO_URL")
                .unwrap_or_else(|_| "https://api.open-meteo.com/v1/forecast".to_string()),
            forecast_timeout_seconds: parse_or("FORECAST_TIMEOUT_SECONDS", 5),
            cache_ttl_seconds: parse_or("CACHE_TTL_SECONDS", 3600), // 1 hour
            cache_eviction_interval_seconds: parse_or("CACHE_EVICTION_INTERVAL_SECONDS", 600),
            max_concurrent_fetches: parse_or("MAX_CONCURRENT_FETCHES", 10),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| "jwt-secret".to_string()),
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
        }
    }

    pub fn forecast_timeout(&self) -> Duration {
        Duration::from_secs(self.forecast_timeout_seconds.max(1))
    }

    /// `None` disables the background sweeper.
    pub fn eviction_interval(&self) -> Option<Duration> {
        (self.cache_eviction_interval_seconds > 0)
            .then(|| Duration::from_secs(self.cache_eviction_interval_seconds))
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
