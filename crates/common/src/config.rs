//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where the persisted click thresholds live.
    #[serde(default = "default_thresholds_path")]
    pub thresholds_path: PathBuf,

    /// Default control settings.
    #[serde(default)]
    pub control: ControlDefaults,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Default control parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlDefaults {
    /// Motion controller variant: "accel", "gyro_responsive" or "gyro_smooth".
    pub variant: String,

    /// Whether pointer motion is gated by EMG activation.
    pub emg_gate_enabled: bool,

    /// Number of recent readings kept for display consumers.
    pub telemetry_capacity: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "myopoint=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            thresholds_path: default_thresholds_path(),
            control: ControlDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ControlDefaults {
    fn default() -> Self {
        Self {
            variant: "gyro_responsive".to_string(),
            emg_gate_enabled: false,
            telemetry_capacity: 1000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }

    /// Location the config is read from and saved to.
    pub fn path() -> PathBuf {
        config_file_path()
    }
}

fn config_base_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        })
        .join("myopoint")
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    config_base_dir().join("config.json")
}

/// Default threshold record location.
fn default_thresholds_path() -> PathBuf {
    config_base_dir().join("threshold_config.json")
}
