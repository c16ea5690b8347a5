//! Process configuration from environment variables.

use std::{env, fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr};

use anyhow::{Context, bail};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(format!("expected 'json' or 'pretty', got '{other}'")),
        }
    }
}

impl LogFormat {
    /// `LOG_FORMAT` on its own, so logging can start before the full config is loaded.
    /// Invalid values fall back to JSON here and are reported by [`Config::from_env`].
    pub fn from_env() -> Self {
        env::var("LOG_FORMAT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(Self::Json)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub jwt_ttl_minutes: i64,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub admin_username: String,
    pub admin_password: String,
    pub low_stock_notify: bool,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup (the environment in production, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set, using the development secret");
            "dev-secret".to_string()
        });
        let admin_password = lookup("ADMIN_PASSWORD").unwrap_or_else(|| {
            warn!("ADMIN_PASSWORD not set, bootstrap admin uses the default password");
            "admin123".to_string()
        });

        let config = Self {
            bind_addr: try_load(&lookup, "BIND_ADDR", "0.0.0.0:8080")?,
            jwt_secret,
            jwt_ttl_minutes: try_load(&lookup, "JWT_TTL_MINUTES", "720")?,
            database_url: lookup("DATABASE_URL").filter(|u| !u.trim().is_empty()),
            database_max_connections: try_load(&lookup, "DATABASE_MAX_CONNECTIONS", "5")?,
            upload_dir: try_load(&lookup, "UPLOAD_DIR", "./uploads")?,
            max_upload_bytes: try_load(&lookup, "MAX_UPLOAD_BYTES", "2097152")?,
            admin_username: try_load(&lookup, "ADMIN_USERNAME", "admin")?,
            admin_password,
            low_stock_notify: try_load(&lookup, "LOW_STOCK_NOTIFY", "true")?,
            log_format: try_load(&lookup, "LOG_FORMAT", "json")?,
        };

        if config.jwt_ttl_minutes <= 0 {
            bail!("JWT_TTL_MINUTES must be positive");
        }
        if config.max_upload_bytes == 0 {
            bail!("MAX_UPLOAD_BYTES must be positive");
        }
        Ok(config)
    }
}

fn try_load<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("invalid {key} value '{raw}'"))
}
