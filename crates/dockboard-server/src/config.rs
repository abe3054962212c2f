use dockboard_common::{InventoryError, Result};
use dockboard_inventory::{InspectorConfig, DEFAULT_REFRESH_PERIOD};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 5001;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub refresh_period: Duration,
    pub inspector: InspectorConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            data_dir: PathBuf::from("./data"),
            refresh_period: DEFAULT_REFRESH_PERIOD,
            inspector: InspectorConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads `PORT` and the `DOCKBOARD_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let refresh_secs: u64 = parse_var(&lookup, "DOCKBOARD_REFRESH_SECS")?
            .unwrap_or(defaults.refresh_period.as_secs());
        if refresh_secs == 0 {
            return Err(InventoryError::Config(
                "DOCKBOARD_REFRESH_SECS must be greater than zero".to_string(),
            ));
        }

        let timeout_secs: u64 = parse_var(&lookup, "DOCKBOARD_COMMAND_TIMEOUT_SECS")?
            .unwrap_or(defaults.inspector.timeout.as_secs());
        if timeout_secs == 0 {
            return Err(InventoryError::Config(
                "DOCKBOARD_COMMAND_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            host: lookup("DOCKBOARD_HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT")?.unwrap_or(defaults.port),
            data_dir: lookup("DOCKBOARD_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            refresh_period: Duration::from_secs(refresh_secs),
            inspector: InspectorConfig {
                binary: lookup("DOCKBOARD_DOCKER_BIN").unwrap_or(defaults.inspector.binary),
                timeout: Duration::from_secs(timeout_secs),
                ..defaults.inspector
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| InventoryError::Config(format!("{key}={raw:?}: {e}"))),
    }
}
