// core/src/lib.rs
pub mod cli;
pub mod config;
pub mod controller;
pub mod enhance;
pub mod error;
pub mod events;
pub mod geolocation;
pub mod guide;
pub mod http;
pub mod insights;
pub mod llm;
pub mod metrics;
pub mod models;
pub mod prediction;
pub mod storage;
pub mod types;
pub mod validation;
pub mod weather;
pub mod weather_api;

pub use config::{load_config, AdvisorConfig};
pub use controller::{CancelHandle, FormController, FormState, SubmitMode};
pub use enhance::{checked_merge, enhance_sample, merge_weather, predict_with_weather, EnhancedPrediction};
pub use error::{GeoError, GuideError, PersistenceError, PredictionError, ValidationError, WeatherError};
pub use events::{EventBus, Notice, NoticeKind};
pub use geolocation::{ConfiguredLocator, GeoLocator};
pub use guide::{current_season, GuideGenerator, ParsedGuide};
pub use metrics::Metrics;
pub use models::{
    FarmProfile, GeoPosition, GrowingGuide, GuideSection, Recommendation, Season, SoilField, SoilForm,
    SoilSample, WeatherReading,
};
pub use prediction::{normalize, CropPredictor, HttpPredictionClient};
pub use storage::{load_guides, save_guides, GuideStore, JsonFileGuideStore, SavedGuide};
pub use validation::validate;
pub use weather::{StaticWeatherProvider, WeatherProvider};
pub use weather_api::BackendWeatherClient;
