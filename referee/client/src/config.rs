use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::error::AppError;

pub const DEFAULT_API_URL: &str = "http://localhost:9000/";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub session_file: PathBuf,
    pub tick: Duration,
    pub penalty_max: Option<u32>,
    pub auth_failure_limit: u32,
    pub request_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        let penalty_max: u32 = try_load("REFEREE_PENALTY_MAX", "0")?;

        Ok(Self {
            api_url: try_load("REFEREE_API_URL", DEFAULT_API_URL)?,
            session_file: try_load("REFEREE_SESSION_FILE", "referee-session.json")?,
            tick: Duration::from_millis(try_load("REFEREE_TICK_MS", "100")?),
            penalty_max: (penalty_max > 0).then_some(penalty_max),
            auth_failure_limit: try_load("REFEREE_AUTH_FAILURE_LIMIT", "3")?,
            request_timeout: Duration::from_millis(try_load("REFEREE_REQUEST_TIMEOUT_MS", "10000")?),
        })
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, AppError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");

            AppError::Config {
                key: key.to_string(),
                reason: e.to_string(),
            }
        })
}
