use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::GrowingGuide;

/// `prediction` as the backend sends it: a bare label or a nested object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PredictionField {
    Label(String),
    Detailed {
        #[serde(alias = "crop_name", alias = "name")]
        crop: String,
        #[serde(default, alias = "probability")]
        confidence: Option<f64>,
    },
}

/// `/api/crops/predict` response body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PredictionResponse {
    pub prediction: PredictionField,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub probability: Option<f64>,
    #[serde(default)]
    pub model_version: Option<String>,
    // "<1s" from the backend, sometimes a number of seconds
    #[serde(default)]
    pub processing_time: Option<Value>,
    #[serde(default, alias = "prediction_id")]
    pub id: Option<Value>,
}

/// Body of `POST /api/growing-guides`.
#[derive(Debug, Clone, Serialize)]
pub struct SaveGuideRequest<'a> {
    pub prediction_id: &'a str,
    #[serde(flatten)]
    pub guide: &'a GrowingGuide,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveGuideResponse {
    #[serde(alias = "id")]
    pub guide_id: String,
    #[serde(default)]
    pub prediction_id: Option<String>,
}

/// Scalar JSON value as text; other shapes yield `None`.
pub fn value_as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
