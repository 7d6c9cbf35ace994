//! Error types shared across Myopoint crates.

use std::path::PathBuf;

/// Top-level error type for Myopoint operations.
#[derive(Debug, thiserror::Error)]
pub enum MyopointError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Calibration error: {message}")]
    Calibration { message: String },

    #[error("Pointer sink error: {message}")]
    Sink { message: String },

    #[error("Threshold store error: {message}")]
    Thresholds { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using MyopointError.
pub type MyopointResult<T> = Result<T, MyopointError>;

impl MyopointError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn calibration(msg: impl Into<String>) -> Self {
        Self::Calibration {
            message: msg.into(),
        }
    }

    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink {
            message: msg.into(),
        }
    }

    pub fn thresholds(msg: impl Into<String>) -> Self {
        Self::Thresholds {
            message: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_concern() {
        assert_eq!(
            MyopointError::calibration("neutral sample count must be at least 1").to_string(),
            "Calibration error: neutral sample count must be at least 1"
        );
        assert_eq!(
            MyopointError::sink("injection refused").to_string(),
            "Pointer sink error: injection refused"
        );
        let missing = MyopointError::FileNotFound {
            path: PathBuf::from("/tmp/none.jsonl"),
        };
        assert_eq!(missing.to_string(), "File not found: /tmp/none.jsonl");
    }
}
