//! Core error types for the scoring engine.
//!
//! Only fatal conditions live here. Encoding anomalies are logged and counted
//! (see `batch::detect_anomaly`) but never abort a run.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoreError {
    /// The keyword taxonomy (or its marker scheme) is malformed.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A record lacks its text field. `row` is the 1-based input position.
    #[error("Missing field error: row {row} has no `{field}` value")]
    MissingField { row: usize, field: String },
}

impl ScoreError {
    pub fn config(message: impl Into<String>) -> Self {
        ScoreError::Configuration {
            message: message.into(),
        }
    }

    pub fn missing_text(row: usize) -> Self {
        ScoreError::MissingField {
            row,
            field: crate::batch::TEXT_FIELD.to_string(),
        }
    }
}

impl From<toml::de::Error> for ScoreError {
    fn from(err: toml::de::Error) -> Self {
        ScoreError::config(format!("taxonomy TOML: {err}"))
    }
}

impl From<serde_json::Error> for ScoreError {
    fn from(err: serde_json::Error) -> Self {
        ScoreError::config(format!("taxonomy JSON: {err}"))
    }
}

impl From<regex::Error> for ScoreError {
    fn from(err: regex::Error) -> Self {
        ScoreError::config(format!("keyword pattern: {err}"))
    }
}
