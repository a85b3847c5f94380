// core/src/error.rs
use std::collections::BTreeMap;

use thiserror::Error;

use crate::models::SoilField;

/// Field-level validation failures, one message per offending field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("invalid soil sample: {}", describe(.0))]
pub struct ValidationError(pub BTreeMap<SoilField, String>);

fn describe(errors: &BTreeMap<SoilField, String>) -> String {
    errors
        .iter()
        .map(|(field, msg)| format!("{}: {}", field.wire_name(), msg))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    pub fn fields(&self) -> &BTreeMap<SoilField, String> {
        &self.0
    }

    pub fn message_for(&self, field: SoilField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeatherError {
    #[error("weather unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeoError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable: {0}")]
    PositionUnavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredictionError {
    #[error("{message}")]
    RequestFailed {
        message: String,
        status: Option<u16>,
    },
}

impl PredictionError {
    pub const GENERIC_MESSAGE: &'static str = "Failed to get crop prediction. Please try again.";

    pub fn generic(status: Option<u16>) -> Self {
        PredictionError::RequestFailed {
            message: Self::GENERIC_MESSAGE.to_string(),
            status,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            PredictionError::RequestFailed { message, .. } => message,
        }
    }
}

#[derive(Debug, Error)]
pub enum GuideError {
    #[error("guide request failed: {0}")]
    Request(String),
    #[error("no prediction available to build a guide from")]
    NoPrediction,
    #[error("form was closed")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("guide store request failed: {0}")]
    Request(String),
    #[error("guide store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("guide store json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse at {path}: {message}")]
    Parse { path: String, message: String },
}
