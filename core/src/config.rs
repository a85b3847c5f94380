// core/src/config.rs
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geolocation::ConfiguredLocator;
use crate::http::join_url;
use crate::llm::{ChatCompletionsClient, LlmClient, ProxyClient};
use crate::models::{FarmProfile, GeoPosition};
use crate::prediction::HttpPredictionClient;
use crate::storage::{GuideStore, HttpGuideStore, JsonFileGuideStore};
use crate::weather_api::{BackendWeatherClient, WeatherApiStyle};

pub const WEATHER_PATH: &str = "/api/weather-enhanced/current";
pub const OPENWEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmKind {
    /// OpenAI-compatible `/chat/completions`
    ChatCompletions,
    /// Local proxy taking `{prompt}`
    Proxy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub kind: LlmKind,
    pub url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            kind: LlmKind::ChatCompletions,
            url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            api_key: None,
            model: "llama-3.1-8b-instant".to_string(),
            temperature: 0.7,
            max_tokens: 4096,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GuideStoreConfig {
    File { path: String },
    Backend,
    Disabled,
}

impl Default for GuideStoreConfig {
    fn default() -> Self {
        GuideStoreConfig::File { path: "growing_guides.json".to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub name: Option<String>,
    pub sharing_allowed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    pub api_base_url: String,
    /// Overrides the backend route (or OpenWeatherMap when a key is set).
    pub weather_url: Option<String>,
    /// When set, `weather_url` is queried as OpenWeatherMap.
    pub openweather_api_key: Option<String>,
    pub auth_token: Option<String>,
    pub request_timeout_secs: u64,
    pub weather_timeout_secs: u64,
    pub weather_retries: u32,
    pub weather_enhancement: bool,
    pub llm: LlmConfig,
    pub guide_store: GuideStoreConfig,
    pub location: LocationConfig,
    pub farm: FarmProfile,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            weather_url: None,
            openweather_api_key: None,
            auth_token: None,
            request_timeout_secs: 15,
            weather_timeout_secs: 5,
            weather_retries: 1,
            weather_enhancement: false,
            llm: LlmConfig::default(),
            guide_store: GuideStoreConfig::default(),
            location: LocationConfig::default(),
            farm: FarmProfile::default(),
        }
    }
}

/// Reads config from disk (JSON). A missing file gives the defaults.
pub fn load_config(path: &Path) -> Result<AdvisorConfig, ConfigError> {
    if !path.exists() {
        info!("[config] no config at {}, using defaults", path.display());
        return Ok(AdvisorConfig::default());
    }
    let contents = std::fs::read_to_string(path)?;
    let mut de = serde_json::Deserializer::from_str(&contents);
    let cfg: AdvisorConfig = serde_path_to_error::deserialize(&mut de).map_err(|e| ConfigError::Parse {
        path: e.path().to_string(),
        message: e.inner().to_string(),
    })?;
    info!("[config] loaded {}", path.display());
    Ok(cfg)
}

impl AdvisorConfig {
    /// Applies environment-style overrides from `lookup` (normally `std::env::var`).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("CROP_ADVISOR_API_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = get("CROP_ADVISOR_WEATHER_URL") {
            self.weather_url = Some(v);
        }
        if let Some(v) = get("OPENWEATHER_API_KEY") {
            self.openweather_api_key = Some(v);
        }
        if let Some(v) = get("CROP_ADVISOR_TOKEN") {
            self.auth_token = Some(v);
        }
        if let Some(v) = get("CROP_ADVISOR_LLM_URL") {
            self.llm.url = v;
        }
        if let Some(v) = get("GROQ_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get("CROP_ADVISOR_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = get("CROP_ADVISOR_WEATHER_RETRIES") {
            match v.parse() {
                Ok(n) => self.weather_retries = n,
                Err(_) => warn!("[config] ignoring CROP_ADVISOR_WEATHER_RETRIES={}", v),
            }
        }
    }

    pub fn from_env(path: &Path) -> Result<AdvisorConfig, ConfigError> {
        let mut cfg = load_config(path)?;
        cfg.apply_overrides(|k| std::env::var(k).ok());
        Ok(cfg)
    }

    /// Explicit `weather_url`, else OpenWeatherMap when a key is set, else the backend route.
    pub fn resolved_weather_url(&self) -> String {
        match (&self.weather_url, &self.openweather_api_key) {
            (Some(url), _) => url.clone(),
            (None, Some(_)) => OPENWEATHER_URL.to_string(),
            (None, None) => join_url(&self.api_base_url, WEATHER_PATH),
        }
    }

    pub fn weather_client(&self) -> BackendWeatherClient {
        let client = BackendWeatherClient::new(
            self.resolved_weather_url(),
            Duration::from_secs(self.weather_timeout_secs),
            self.weather_retries,
        );
        match &self.openweather_api_key {
            Some(key) => client.with_style(WeatherApiStyle::OpenWeatherMap { api_key: key.clone() }),
            None => client,
        }
    }

    pub fn prediction_client(&self) -> HttpPredictionClient {
        let client = HttpPredictionClient::new(&self.api_base_url, Duration::from_secs(self.request_timeout_secs));
        match &self.auth_token {
            Some(t) => client.with_auth_token(t.clone()),
            None => client,
        }
    }

    pub fn locator(&self) -> ConfiguredLocator {
        let position = match (self.location.latitude, self.location.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPosition {
                latitude,
                longitude,
                location_name: self.location.name.clone(),
            }),
            _ => None,
        };
        ConfiguredLocator::new(position, self.location.sharing_allowed)
    }

    pub fn llm_client(&self) -> Arc<dyn LlmClient> {
        let timeout = Duration::from_secs(self.llm.timeout_secs);
        match self.llm.kind {
            LlmKind::ChatCompletions => Arc::new(
                ChatCompletionsClient::new(
                    self.llm.url.clone(),
                    self.llm.api_key.clone().unwrap_or_default(),
                    self.llm.model.clone(),
                    timeout,
                )
                .with_sampling(self.llm.temperature, self.llm.max_tokens),
            ),
            LlmKind::Proxy => Arc::new(ProxyClient::new(self.llm.url.clone(), timeout)),
        }
    }

    pub fn guide_store(&self) -> Option<Arc<dyn GuideStore>> {
        match &self.guide_store {
            GuideStoreConfig::File { path } => Some(Arc::new(JsonFileGuideStore::new(path.clone()))),
            GuideStoreConfig::Backend => Some(Arc::new(HttpGuideStore::new(
                &self.api_base_url,
                Duration::from_secs(self.request_timeout_secs),
                self.auth_token.clone(),
            ))),
            GuideStoreConfig::Disabled => None,
        }
    }
}
