use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use thiserror::Error;

const CONFIG_FILE_PATH: &str = "../config.json";
const FALLBACK_CONFIG_FILE_PATH: &str = "../_config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("could not parse {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("invalid setting `{0}`: must be greater than zero")]
    Zero(&'static str),
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    pub address: String,
    #[serde(default = "default_controller_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    pub poll_interval_ms: u64,
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,
    #[serde(default = "default_reconnect_backoff_ms")]
    pub reconnect_backoff_ms: u64,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct DispatcherConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherConfig { tick_ms: default_tick_ms() }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub controller: ControllerConfig,
    pub broker: BrokerConfig,
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
}

fn default_controller_timeout_ms() -> u64 {
    2000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_heartbeat_timeout_ms() -> u64 {
    2000
}

fn default_reconnect_backoff_ms() -> u64 {
    5000
}

fn default_tick_ms() -> u64 {
    100
}

impl Config {
    /// Reads `path` if given, otherwise `../config.json` with the shipped
    /// `../_config.json` as fallback.
    pub fn get(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Config::load(&path),
            None => {
                let path = Path::new(CONFIG_FILE_PATH);
                if path.exists() {
                    Config::load(path)
                } else {
                    info!("No configuration file provided, using default settings...");
                    Config::load(Path::new(FALLBACK_CONFIG_FILE_PATH))
                }
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Config::parse(&contents).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse { path: path.to_path_buf(), source },
            other => other,
        })
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(contents).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let nonzero = [
            ("controller.timeout_ms", self.controller.timeout_ms),
            ("broker.port", self.broker.port as u64),
            ("broker.connect_timeout_ms", self.broker.connect_timeout_ms),
            ("bridge.poll_interval_ms", self.bridge.poll_interval_ms),
            ("bridge.heartbeat_timeout_ms", self.bridge.heartbeat_timeout_ms),
            ("bridge.reconnect_backoff_ms", self.bridge.reconnect_backoff_ms),
            ("dispatcher.tick_ms", self.dispatcher.tick_ms),
        ];
        for (name, value) in nonzero {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }
        Ok(())
    }

    pub fn controller_timeout(&self) -> Duration {
        Duration::from_millis(self.controller.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.broker.connect_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.bridge.poll_interval_ms)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.bridge.heartbeat_timeout_ms)
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.bridge.reconnect_backoff_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.dispatcher.tick_ms)
    }
}
