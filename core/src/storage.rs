use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use ureq::Agent;

use crate::error::PersistenceError;
use crate::http::{build_agent, join_url, CallError};
use crate::models::GrowingGuide;
use crate::types::{SaveGuideRequest, SaveGuideResponse};

pub const GUIDES_PATH: &str = "/api/growing-guides";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedGuide {
    pub guide_id: String,
    pub prediction_id: String,
    pub saved_at: String,
    pub guide: GrowingGuide,
}

/// Document store for guides, addressed only by prediction id.
pub trait GuideStore: Send + Sync {
    fn save_guide(&self, prediction_id: &str, guide: &GrowingGuide) -> Result<SavedGuide, PersistenceError>;
    fn guide_for_prediction(&self, prediction_id: &str) -> Result<Option<SavedGuide>, PersistenceError>;
}

/// Reads guides from disk (JSON map keyed by prediction id).
/// A missing file is an empty store.
pub fn load_guides(path: &Path) -> Result<BTreeMap<String, SavedGuide>, PersistenceError> {
    if path.exists() {
        let contents = std::fs::read_to_string(path)?;
        let guides: BTreeMap<String, SavedGuide> = serde_json::from_str(&contents)?;
        info!("[store] {} guide(s) loaded from {}", guides.len(), path.display());
        Ok(guides)
    } else {
        info!("[store] no guide file at {}, starting empty", path.display());
        Ok(BTreeMap::new())
    }
}

/// Writes guides to disk as pretty JSON.
pub fn save_guides(guides: &BTreeMap<String, SavedGuide>, path: &Path) -> Result<(), PersistenceError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let json = serde_json::to_string_pretty(guides)?;
    std::fs::write(path, json)?;
    info!("[store] {} guide(s) written to {}", guides.len(), path.display());
    Ok(())
}

pub struct JsonFileGuideStore {
    path: PathBuf,
    // serializes read-modify-write within this process
    lock: Mutex<()>,
}

impl JsonFileGuideStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GuideStore for JsonFileGuideStore {
    fn save_guide(&self, prediction_id: &str, guide: &GrowingGuide) -> Result<SavedGuide, PersistenceError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut guides = load_guides(&self.path)?;
        let now = Utc::now();
        let saved = SavedGuide {
            guide_id: format!("guide-{}-{}", prediction_id, now.timestamp_millis()),
            prediction_id: prediction_id.to_string(),
            saved_at: now.to_rfc3339(),
            guide: guide.clone(),
        };
        guides.insert(prediction_id.to_string(), saved.clone());
        save_guides(&guides, &self.path)?;
        Ok(saved)
    }

    fn guide_for_prediction(&self, prediction_id: &str) -> Result<Option<SavedGuide>, PersistenceError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(load_guides(&self.path)?.remove(prediction_id))
    }
}

/// Backend `/api/growing-guides` collection.
pub struct HttpGuideStore {
    agent: Agent,
    base: String,
    auth_token: Option<String>,
}

impl HttpGuideStore {
    pub fn new(api_base_url: &str, timeout: Duration, auth_token: Option<String>) -> Self {
        Self {
            agent: build_agent(timeout),
            base: join_url(api_base_url, GUIDES_PATH),
            auth_token,
        }
    }

    fn authorized(&self, req: ureq::Request) -> ureq::Request {
        match &self.auth_token {
            Some(t) => req.set("Authorization", &format!("Bearer {}", t)),
            None => req,
        }
    }
}

fn store_error(err: CallError) -> PersistenceError {
    warn!("[store] request failed: {}", err);
    PersistenceError::Request(err.server_message().unwrap_or_else(|| err.to_string()))
}

impl GuideStore for HttpGuideStore {
    fn save_guide(&self, prediction_id: &str, guide: &GrowingGuide) -> Result<SavedGuide, PersistenceError> {
        let body = SaveGuideRequest { prediction_id, guide };
        let resp = self
            .authorized(self.agent.post(&self.base))
            .send_json(&body)
            .map_err(|e| store_error(CallError::from(e)))?;
        let text = resp.into_string()?;
        let parsed: SaveGuideResponse = serde_json::from_str(&text)?;
        Ok(SavedGuide {
            guide_id: parsed.guide_id,
            prediction_id: parsed.prediction_id.unwrap_or_else(|| prediction_id.to_string()),
            saved_at: Utc::now().to_rfc3339(),
            guide: guide.clone(),
        })
    }

    fn guide_for_prediction(&self, prediction_id: &str) -> Result<Option<SavedGuide>, PersistenceError> {
        let url = format!("{}/prediction/{}", self.base, prediction_id);
        let resp = match self.authorized(self.agent.get(&url)).call() {
            Ok(r) => r,
            Err(ureq::Error::Status(404, _)) => return Ok(None),
            Err(e) => return Err(store_error(CallError::from(e))),
        };
        let value: serde_json::Value = serde_json::from_str(&resp.into_string()?)?;
        let guide: GrowingGuide = serde_json::from_value(value.clone())?;
        let text = |k: &str| value.get(k).and_then(serde_json::Value::as_str).unwrap_or_default().to_string();
        Ok(Some(SavedGuide {
            guide_id: text("id"),
            prediction_id: prediction_id.to_string(),
            saved_at: text("created_at"),
            guide,
        }))
    }
}
