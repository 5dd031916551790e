use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

use crate::feed::Login;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub log_level: String,
    pub tour_settle_days: i64,
    pub retry_min_age_days: i64,
}

/// Provider settings, only needed by the commands that talk to TX-TANGO.
#[derive(Debug, Clone)]
pub struct TxConfig {
    pub host: String,
    pub login: Login,
    pub timeout: Duration,
    pub request_delay: Duration,
}

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("missing required setting {}", name))
}

fn number<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let db_host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
        let db_port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
        let db_name = env::var("DB_DATABASE").unwrap_or_else(|_| "fleet".to_string());
        let db_user = env::var("DB_USER").unwrap_or_else(|_| "fleet".to_string());
        let db_pwd = env::var("DB_PWD").unwrap_or_else(|_| "fleet".to_string());

        let database_url = format!(
            "postgres://{}:{}@{}:{}/{}",
            db_user, db_pwd, db_host, db_port, db_name
        );

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            database_url,
            db_max_connections: number("DB_MAX_CONNECTIONS", 10),
            log_level,
            tour_settle_days: number("TOUR_SETTLE_DAYS", 3),
            retry_min_age_days: number("RETRY_MIN_AGE_DAYS", 3),
        })
    }
}

impl TxConfig {
    /// Call after `AppConfig::load`, which reads the `.env` file.
    pub fn load() -> Result<Self> {
        let login = Login {
            dispatcher: required("TX_USERNAME")?,
            password: required("TX_PASSWORD")?,
            integrator: required("TX_INTEGRATOR")?,
            system_nr: required("TX_SYSTEM_NR")?,
            language: env::var("TX_LANGUAGE").unwrap_or_else(|_| "EN".to_string()),
        };

        Ok(Self {
            host: required("TX_HOST")?,
            login,
            timeout: Duration::from_secs(number("TX_TIMEOUT_SECS", 60)),
            request_delay: Duration::from_secs(number("TX_REQUEST_DELAY_SECS", 5)),
        })
    }
}
