use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Forecast execution settings
#[derive(Debug, Clone)]
pub struct ForecastConfig {
    pub max_concurrent_fits: usize,
    pub fit_timeout: Duration,
    pub trend_model_enabled: bool,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fits: 4,
            fit_timeout: Duration::from_secs(30),
            trend_model_enabled: true,
        }
    }
}

impl ForecastConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            max_concurrent_fits: env_or("FORECAST_MAX_CONCURRENT_FITS", defaults.max_concurrent_fits)?,
            fit_timeout: Duration::from_secs(env_or(
                "FORECAST_FIT_TIMEOUT_SECS",
                defaults.fit_timeout.as_secs(),
            )?),
            trend_model_enabled: env_or("TREND_MODEL_ENABLED", defaults.trend_model_enabled)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_fits == 0 {
            bail!("FORECAST_MAX_CONCURRENT_FITS must be at least 1");
        }
        if self.fit_timeout.is_zero() {
            bail!("FORECAST_FIT_TIMEOUT_SECS must be at least 1");
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: SocketAddr,
    pub forecast: ForecastConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let bind_addr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .context("BIND_ADDR must be a socket address such as 0.0.0.0:3000")?;

        let config = Self {
            database_url,
            database_max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10)?,
            bind_addr,
            forecast: ForecastConfig::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            bail!("DATABASE_URL must not be empty");
        }
        if self.database_max_connections == 0 {
            bail!("DATABASE_MAX_CONNECTIONS must be at least 1");
        }
        self.forecast.validate()
    }
}

/// Parse `key` from the environment, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}
