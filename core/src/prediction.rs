// core/src/prediction.rs
use std::time::Duration;

use log::{info, warn};
use ureq::Agent;

use crate::error::PredictionError;
use crate::http::{build_agent, join_url, CallError};
use crate::models::{Recommendation, SoilSample};
use crate::types::{value_as_text, PredictionField, PredictionResponse};

pub const PREDICT_PATH: &str = "/api/crops/predict";

/// Crop recommendation backend (prod: HttpPredictionClient).
pub trait CropPredictor: Send + Sync {
    fn predict(&self, sample: &SoilSample) -> Result<Recommendation, PredictionError>;
}

/// Confidence as a percentage with one decimal.
/// Values in 0..=1 are fractions; larger values are already percentages.
pub fn confidence_percent(raw: f64) -> Option<f64> {
    if !raw.is_finite() || raw < 0.0 {
        return None;
    }
    let pct = if raw <= 1.0 { raw * 100.0 } else { raw };
    Some(((pct.min(100.0)) * 10.0).round() / 10.0)
}

/// The one place response variance is resolved.
pub fn normalize(resp: PredictionResponse) -> Result<Recommendation, PredictionError> {
    let (crop, nested_conf) = match resp.prediction {
        PredictionField::Label(crop) => (crop, None),
        PredictionField::Detailed { crop, confidence } => (crop, confidence),
    };
    let crop = crop.trim().to_string();
    if crop.is_empty() {
        return Err(PredictionError::RequestFailed {
            message: "Prediction response did not include a crop".into(),
            status: None,
        });
    }

    let confidence_pct = nested_conf
        .or(resp.confidence)
        .or(resp.probability)
        .and_then(confidence_percent);

    Ok(Recommendation {
        crop,
        confidence_pct,
        model_version: resp.model_version.filter(|s| !s.trim().is_empty()),
        processing_time: resp.processing_time.as_ref().and_then(value_as_text),
        id: resp.id.as_ref().and_then(value_as_text),
    })
}

pub fn parse_prediction_body(body: &str) -> Result<Recommendation, PredictionError> {
    let mut de = serde_json::Deserializer::from_str(body);
    let resp: PredictionResponse = serde_path_to_error::deserialize(&mut de).map_err(|e| {
        warn!("[predict] unexpected response at {}: {}", e.path(), e);
        PredictionError::generic(None)
    })?;
    normalize(resp)
}

pub struct HttpPredictionClient {
    agent: Agent,
    url: String,
    auth_token: Option<String>,
}

impl HttpPredictionClient {
    pub fn new(api_base_url: &str, timeout: Duration) -> Self {
        Self {
            agent: build_agent(timeout),
            url: join_url(api_base_url, PREDICT_PATH),
            auth_token: None,
        }
    }

    /// Bearer token; the backend saves predictions only for signed-in users.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }
}

impl CropPredictor for HttpPredictionClient {
    fn predict(&self, sample: &SoilSample) -> Result<Recommendation, PredictionError> {
        let mut req = self.agent.post(&self.url).set("Content-Type", "application/json");
        if let Some(token) = &self.auth_token {
            req = req.set("Authorization", &format!("Bearer {}", token));
        }

        let resp = req.send_json(sample).map_err(|e| {
            let err = CallError::from(e);
            warn!("[predict] request failed: {}", err);
            match err.server_message() {
                Some(message) => PredictionError::RequestFailed { message, status: err.status() },
                None => PredictionError::generic(err.status()),
            }
        })?;

        let body = resp.into_string().map_err(|e| {
            warn!("[predict] body read failed: {}", e);
            PredictionError::generic(None)
        })?;
        let rec = parse_prediction_body(&body)?;
        info!(
            "[predict] {} => {} ({:?}%)",
            sample.location, rec.crop, rec.confidence_pct
        );
        Ok(rec)
    }
}
