use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};

pub const CONFIG_FILE: &str = "showrunner.toml";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_DATABASE_URL: &str = "sqlite:showrunner.db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

/// Event bus and socket tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub bus_capacity: usize,
    /// Envelopes kept for SSE and socket replay.
    pub replay_log_size: usize,
    pub heartbeat_secs: u64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            bus_capacity: events::DEFAULT_CAPACITY,
            replay_log_size: events::DEFAULT_REPLAY_LOG_SIZE,
            heartbeat_secs: websocket::DEFAULT_HEARTBEAT_INTERVAL.as_secs(),
        }
    }
}

impl LiveConfig {
    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs.max(1))
    }
}

/// Contents of `showrunner.toml`. Missing sections and fields take defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub live: LiveConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to encode config: {0}")]
    Encode(#[from] toml::ser::Error),
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reads `path`, falling back to defaults when the file is absent.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file does not exist, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).await?;
        let config = Self::from_toml_str(&content).map_err(|e| {
            warn!(path = %path.display(), error = %e, "Failed to parse config");
            e
        })?;
        debug!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    pub async fn write(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await?;
        }
        fs::write(path, self.to_toml_string()?).await?;
        debug!(path = %path.display(), "Config saved");
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
