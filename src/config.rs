use std::env;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_format: LogFormat,
    pub max_starting_point_km: f64,
    pub average_speed_kmh: f64,
    pub default_search_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
            max_starting_point_km: 3.0,
            average_speed_kmh: 40.0,
            default_search_limit: 5,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        let config = Self {
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: parse_log_format(env::var("LOG_FORMAT").ok().as_deref())?,
            max_starting_point_km: parse_or_default(
                "MAX_STARTING_POINT_KM",
                defaults.max_starting_point_km,
            )?,
            average_speed_kmh: parse_or_default("AVERAGE_SPEED_KMH", defaults.average_speed_kmh)?,
            default_search_limit: parse_or_default(
                "DEFAULT_SEARCH_LIMIT",
                defaults.default_search_limit,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.average_speed_kmh > 0.0) {
            return Err(AppError::Config(
                "AVERAGE_SPEED_KMH must be > 0".to_string(),
            ));
        }
        if !(self.max_starting_point_km > 0.0) {
            return Err(AppError::Config(
                "MAX_STARTING_POINT_KM must be > 0".to_string(),
            ));
        }
        if self.default_search_limit == 0 {
            return Err(AppError::Config(
                "DEFAULT_SEARCH_LIMIT must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_log_format(raw: Option<&str>) -> Result<LogFormat, AppError> {
    match raw.map(|value| value.trim().to_ascii_lowercase()) {
        None => Ok(LogFormat::Compact),
        Some(value) if value.is_empty() || value == "compact" => Ok(LogFormat::Compact),
        Some(value) if value == "json" => Ok(LogFormat::Json),
        Some(other) => Err(AppError::Config(format!(
            "invalid LOG_FORMAT: {other}, expected compact/json"
        ))),
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Config(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
