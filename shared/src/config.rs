//! Runtime configuration handed to the core by the shell at start-up.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::error::{AppError, ErrorKind};
use crate::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_DATE_WINDOW_DAYS, DEFAULT_DISTANCE_KM, DEFAULT_PAGE_SIZE,
    END_REACHED_THRESHOLD, LOCATION_MAXIMUM_AGE_MS, LOCATION_TIMEOUT_MS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    #[default]
    Android,
    Ios,
}

impl Platform {
    /// Android gates geolocation behind an explicit runtime permission;
    /// iOS asks implicitly on first use.
    #[must_use]
    pub const fn requires_location_permission(self) -> bool {
        matches!(self, Self::Android)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub graphql_endpoint: String,
    pub geocoding_endpoint: String,
    pub platform: Platform,
    pub page_size: u32,
    pub default_distance_km: u32,
    pub default_date_window_days: Option<u32>,
    pub location_timeout_ms: u64,
    pub location_maximum_age_ms: Option<u64>,
    pub end_reached_threshold: usize,
    pub cache_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            graphql_endpoint: "http://localhost:5000/graphql".into(),
            geocoding_endpoint: "https://maps.google.com/maps/api/geocode/json".into(),
            platform: Platform::default(),
            page_size: DEFAULT_PAGE_SIZE,
            default_distance_km: DEFAULT_DISTANCE_KM,
            default_date_window_days: Some(DEFAULT_DATE_WINDOW_DAYS),
            location_timeout_ms: LOCATION_TIMEOUT_MS,
            location_maximum_age_ms: Some(LOCATION_MAXIMUM_AGE_MS),
            end_reached_threshold: END_REACHED_THRESHOLD,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid JSON configuration: {0}")]
    Parse(String),
    #[error("{field} must be an absolute http(s) URL, got {value:?}")]
    InvalidEndpoint { field: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::new(ErrorKind::Configuration, e.to_string())
    }
}

impl AppConfig {
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_slice(bytes).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_endpoint("graphql_endpoint", &self.graphql_endpoint)?;
        check_endpoint("geocoding_endpoint", &self.geocoding_endpoint)?;

        if self.page_size == 0 {
            return Err(ConfigError::Zero("page_size"));
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::Zero("cache_capacity"));
        }
        if self.location_timeout_ms == 0 {
            return Err(ConfigError::Zero("location_timeout_ms"));
        }
        Ok(())
    }
}

fn check_endpoint(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidEndpoint {
        field,
        value: value.to_string(),
    };
    let parsed = Url::parse(value).map_err(|_| invalid())?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(invalid());
    }
    Ok(())
}
