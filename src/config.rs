use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub ml_service_url: String,
    pub ml_timeout_secs: u64,
    pub db_statement_timeout_secs: u64,
    pub db_max_connections: u32,
    pub request_timeout_secs: u64,
    pub count_cache_ttl_secs: u64,
    pub cors_allowed_origin: Option<String>,
    pub log_level: String,
    pub log_json: bool,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let ml_service_url = get_env_or("ML_SERVICE_URL", "http://localhost:5000");
        url::Url::parse(&ml_service_url)
            .map_err(|e| Error::Config(format!("Invalid value for ML_SERVICE_URL: {}", e)))?;

        Ok(Self {
            server_address: get_env_or("SERVER_ADDRESS", "0.0.0.0:8080"),
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            ml_service_url: ml_service_url.trim_end_matches('/').to_string(),
            ml_timeout_secs: get_env_parse_or("ML_TIMEOUT_SECS", 10)?,
            db_statement_timeout_secs: get_env_parse_or("DB_STATEMENT_TIMEOUT_SECS", 15)?,
            db_max_connections: get_env_parse_or("DB_MAX_CONNECTIONS", 20)?,
            request_timeout_secs: get_env_parse_or("REQUEST_TIMEOUT_SECS", 30)?,
            count_cache_ttl_secs: get_env_parse_or("COUNT_CACHE_TTL_SECS", 60)?,
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN").ok().filter(|v| !v.is_empty()),
            log_level: get_env_or("LOG_LEVEL", "info"),
            log_json: get_env_or("LOG_FORMAT", "text").eq_ignore_ascii_case("json"),
        })
    }

    pub fn ml_timeout(&self) -> Duration {
        Duration::from_secs(self.ml_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn count_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.count_cache_ttl_secs)
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.is_empty() => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        _ => Ok(default),
    }
}

pub fn init_config() -> Result<&'static Config> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    get_config()
}

pub fn get_config() -> Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| Error::Config("Configuration has not been initialized".to_string()))
}
