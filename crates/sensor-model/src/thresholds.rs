//! Click thresholds and their persisted record.
//!
//! The classifier reads a [`ThresholdConfig`]. Amplitude levels are
//! persisted separately as a small JSON record that an external settings
//! tool edits; the core only reads it at construction or reconfiguration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// How EMG amplitudes are turned into actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClickMode {
    /// Hold > right > left priority, strong contractions toggle drag.
    #[default]
    Duration,
    /// Single impulses only: right > left, no drag.
    Impulse,
}

/// Thresholds and timing for the gesture classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Left click level (µV).
    pub left_threshold: f64,

    /// Right click level (µV).
    pub right_threshold: f64,

    /// Drag toggle level (µV).
    pub hold_threshold: f64,

    /// Minimum time between two emitted actions.
    pub cooldown_secs: f64,

    /// Maximum gap between two right-level peaks in impulse mode.
    pub right_double_max_gap_secs: f64,

    /// Contraction length separating a click from a hold. Stored with the
    /// profile; classification does not use it yet.
    pub hold_threshold_secs: f64,

    /// Classification mode.
    #[serde(default)]
    pub mode: ClickMode,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            left_threshold: 150.0,
            right_threshold: 250.0,
            hold_threshold: 225.0,
            cooldown_secs: 0.5,
            right_double_max_gap_secs: 1.5,
            hold_threshold_secs: 0.3,
            mode: ClickMode::Duration,
        }
    }
}

impl ThresholdConfig {
    /// Defaults with the given amplitude levels.
    pub fn with_levels(left: f64, right: f64, hold: f64) -> Self {
        Self {
            left_threshold: left,
            right_threshold: right,
            hold_threshold: hold,
            ..Self::default()
        }
    }

    /// Reject values the classifier cannot work with.
    pub fn validate(&self) -> Result<(), ThresholdError> {
        for (name, value) in [
            ("left_threshold", self.left_threshold),
            ("right_threshold", self.right_threshold),
            ("hold_threshold", self.hold_threshold),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ThresholdError::Invalid {
                    message: format!("{name} must be a positive finite amplitude, got {value}"),
                });
            }
        }
        for (name, value) in [
            ("cooldown_secs", self.cooldown_secs),
            ("right_double_max_gap_secs", self.right_double_max_gap_secs),
            ("hold_threshold_secs", self.hold_threshold_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ThresholdError::Invalid {
                    message: format!("{name} must be a non-negative duration, got {value}"),
                });
            }
        }
        Ok(())
    }
}

fn default_left() -> f64 {
    ThresholdConfig::default().left_threshold
}

fn default_right() -> f64 {
    ThresholdConfig::default().right_threshold
}

fn default_hold() -> f64 {
    ThresholdConfig::default().hold_threshold
}

/// On-disk threshold record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRecord {
    #[serde(default = "default_left")]
    pub left_threshold: f64,

    #[serde(default = "default_right")]
    pub right_threshold: f64,

    #[serde(default = "default_hold")]
    pub hold_threshold: f64,

    /// When the record was last written. Older files call this `timestamp`.
    #[serde(default, alias = "timestamp")]
    pub updated_at: Option<String>,
}

impl ThresholdRecord {
    /// Capture the levels of a config, stamped with the current time.
    pub fn from_config(config: &ThresholdConfig) -> Self {
        Self {
            left_threshold: config.left_threshold,
            right_threshold: config.right_threshold,
            hold_threshold: config.hold_threshold,
            updated_at: Some(chrono::Utc::now().to_rfc3339()),
        }
    }

    /// Overlay the stored levels on a base config.
    pub fn apply_to(&self, base: &ThresholdConfig) -> ThresholdConfig {
        ThresholdConfig {
            left_threshold: self.left_threshold,
            right_threshold: self.right_threshold,
            hold_threshold: self.hold_threshold,
            ..base.clone()
        }
    }
}

/// Result of a load that never fails.
#[derive(Debug)]
pub struct ThresholdLoad {
    /// Config to use: stored levels, or the base config on failure.
    pub config: ThresholdConfig,

    /// The record that was read, if any.
    pub record: Option<ThresholdRecord>,

    /// Why the base config was used instead of stored values.
    pub fallback_reason: Option<ThresholdError>,
}

impl ThresholdLoad {
    pub fn used_fallback(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

/// Reads and writes the threshold record at a fixed path.
#[derive(Debug, Clone)]
pub struct ThresholdStore {
    path: PathBuf,
}

impl ThresholdStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the record.
    pub fn load(&self) -> Result<ThresholdRecord, ThresholdError> {
        if !self.path.exists() {
            return Err(ThresholdError::NotFound {
                path: self.path.clone(),
            });
        }
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| ThresholdError::IoError {
                path: self.path.clone(),
                source: e,
            })?;
        serde_json::from_str(&content).map_err(|e| ThresholdError::ParseError {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Read the record and overlay it on `base`, falling back to `base`
    /// when the file is missing, unreadable or holds invalid levels.
    pub fn load_or_default(&self, base: &ThresholdConfig) -> ThresholdLoad {
        let record = match self.load() {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Using default click thresholds");
                return ThresholdLoad {
                    config: base.clone(),
                    record: None,
                    fallback_reason: Some(e),
                };
            }
        };

        let config = record.apply_to(base);
        if let Err(e) = config.validate() {
            tracing::warn!(path = %self.path.display(), error = %e, "Stored click thresholds rejected");
            return ThresholdLoad {
                config: base.clone(),
                record: Some(record),
                fallback_reason: Some(e),
            };
        }

        tracing::info!(
            left = config.left_threshold,
            right = config.right_threshold,
            hold = config.hold_threshold,
            "Loaded click thresholds"
        );
        ThresholdLoad {
            config,
            record: Some(record),
            fallback_reason: None,
        }
    }

    /// Write the record as pretty JSON, creating parent directories.
    pub fn save(&self, record: &ThresholdRecord) -> Result<(), ThresholdError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ThresholdError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json =
            serde_json::to_string_pretty(record).map_err(|e| ThresholdError::ParseError {
                path: self.path.clone(),
                source: e,
            })?;
        std::fs::write(&self.path, json).map_err(|e| ThresholdError::IoError {
            path: self.path.clone(),
            source: e,
        })
    }
}

/// Errors that can occur when reading or writing thresholds.
#[derive(Debug, thiserror::Error)]
pub enum ThresholdError {
    #[error("Threshold file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid thresholds: {message}")]
    Invalid { message: String },
}

impl From<ThresholdError> for myopoint_common::MyopointError {
    fn from(e: ThresholdError) -> Self {
        match e {
            ThresholdError::NotFound { path } => Self::FileNotFound { path },
            ThresholdError::IoError { source, .. } => Self::Io(source),
            ThresholdError::ParseError { source, .. } => Self::Json(source),
            ThresholdError::Invalid { message } => Self::thresholds(message),
        }
    }
}
