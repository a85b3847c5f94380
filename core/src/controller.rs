// core/src/controller.rs
//! Form state machine:
//! Idle -> Validating -> Submitting(WithWeather|WithoutWeather) -> Result | Error.
//! Error is not terminal; resubmitting leaves it.
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};

use crate::enhance::predict_with_weather;
use crate::error::{GeoError, GuideError};
use crate::events::{EventBus, Notice, NoticeKind};
use crate::geolocation::{notice_text, GeoLocator};
use crate::guide::{GuideGenerator, PersistHandle};
use crate::metrics::Metrics;
use crate::models::{GeoPosition, GrowingGuide, Recommendation, SoilField, SoilForm, SoilSample, WeatherReading};
use crate::prediction::CropPredictor;
use crate::validation;
use crate::weather::WeatherProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    WithWeather,
    WithoutWeather,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormState {
    Idle,
    Validating,
    Submitting(SubmitMode),
    Result(Recommendation),
    Error(String),
}

/// Cancels a controller from another thread (view teardown).
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct GuideOutcome {
    pub guide: GrowingGuide,
    pub fallback: bool,
    /// Background save; `None` when no store is configured.
    pub persist: Option<PersistHandle>,
}

pub struct FormController {
    form: SoilForm,
    touched: BTreeSet<SoilField>,
    errors: BTreeMap<SoilField, String>,
    state: FormState,
    weather_enhanced: bool,
    position: Option<GeoPosition>,
    result: Option<Recommendation>,
    submitted: Option<SoilSample>,
    weather_used: Option<WeatherReading>,
    weather: Arc<dyn WeatherProvider>,
    predictor: Arc<dyn CropPredictor>,
    locator: Arc<dyn GeoLocator>,
    guides: Option<GuideGenerator>,
    bus: EventBus,
    metrics: Option<Metrics>,
    cancel: CancelHandle,
}

impl FormController {
    pub fn new(
        weather: Arc<dyn WeatherProvider>,
        predictor: Arc<dyn CropPredictor>,
        locator: Arc<dyn GeoLocator>,
        bus: EventBus,
    ) -> Self {
        let form = SoilForm::default();
        let errors = validation::field_errors(&form);
        Self {
            form,
            touched: BTreeSet::new(),
            errors,
            state: FormState::Idle,
            weather_enhanced: false,
            position: None,
            result: None,
            submitted: None,
            weather_used: None,
            weather,
            predictor,
            locator,
            guides: None,
            bus,
            metrics: None,
            cancel: CancelHandle::default(),
        }
    }

    pub fn with_guides(mut self, guides: GuideGenerator) -> Self {
        self.guides = Some(guides);
        self
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn form(&self) -> &SoilForm {
        &self.form
    }

    pub fn result(&self) -> Option<&Recommendation> {
        self.result.as_ref()
    }

    /// Sample sent with the last successful prediction (after any weather merge).
    pub fn submitted_sample(&self) -> Option<&SoilSample> {
        self.submitted.as_ref()
    }

    pub fn weather_used(&self) -> Option<&WeatherReading> {
        self.weather_used.as_ref()
    }

    pub fn position(&self) -> Option<&GeoPosition> {
        self.position.as_ref()
    }

    pub fn weather_enhanced(&self) -> bool {
        self.weather_enhanced
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Updates one field and re-validates the whole form.
    pub fn set_field(&mut self, field: SoilField, value: impl Into<String>) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.form.set(field, value);
        self.touched.insert(field);
        self.errors = validation::field_errors(&self.form);
        self.state = FormState::Validating;
    }

    /// Loads a whole form at once (every field counts as touched).
    pub fn fill(&mut self, form: SoilForm) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.form = form;
        self.touched.extend(SoilField::ALL);
        self.errors = validation::field_errors(&self.form);
        self.state = FormState::Validating;
    }

    /// Message for a field the user has edited.
    pub fn field_error(&self, field: SoilField) -> Option<&str> {
        if self.touched.contains(&field) {
            self.errors.get(&field).map(String::as_str)
        } else {
            None
        }
    }

    pub fn errors(&self) -> &BTreeMap<SoilField, String> {
        &self.errors
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.state, FormState::Submitting(_))
    }

    /// Submit control enablement.
    pub fn can_submit(&self) -> bool {
        self.is_valid() && !self.is_submitting() && !self.cancel.is_cancelled()
    }

    /// Switches the submission path only; entered values stay as they are.
    pub fn set_weather_enhancement(&mut self, enabled: bool) {
        self.weather_enhanced = enabled;
        debug!("[form] weather enhancement {}", if enabled { "on" } else { "off" });
    }

    pub fn set_position(&mut self, position: GeoPosition) {
        self.position = Some(position);
    }

    /// Explicit "use my location". Failure is a notice, never fatal.
    pub fn use_current_location(&mut self) -> Result<GeoPosition, GeoError> {
        match self.locator.locate() {
            Ok(pos) => {
                if self.form.location.trim().is_empty() {
                    if let Some(name) = &pos.location_name {
                        self.set_field(SoilField::Location, name.clone());
                    }
                }
                self.position = Some(pos.clone());
                Ok(pos)
            }
            Err(e) => {
                warn!("[form] location lookup failed: {}", e);
                self.bus.publish(Notice::new(NoticeKind::Location, notice_text(&e)));
                Err(e)
            }
        }
    }

    /// Runs one submission. Returns the resulting state.
    pub fn submit(&mut self) -> &FormState {
        if self.cancel.is_cancelled() || self.is_submitting() {
            return &self.state;
        }

        let sample = match validation::validate(&self.form) {
            Ok(s) => s,
            Err(e) => {
                self.touched.extend(e.fields().keys().copied());
                self.errors = e.0.clone();
                self.state = FormState::Validating;
                self.bus.publish(Notice::new(NoticeKind::Validation, e.to_string()));
                return &self.state;
            }
        };

        let position = if self.weather_enhanced { self.position.clone() } else { None };
        if self.weather_enhanced && position.is_none() {
            self.bus.publish(Notice::new(
                NoticeKind::PartialEnhancementFailure,
                "No location for live weather; using your manual readings.",
            ));
        }
        let mode = match position {
            Some(_) => SubmitMode::WithWeather,
            None => SubmitMode::WithoutWeather,
        };
        self.state = FormState::Submitting(mode);
        info!("[form] submitting {:?} for {}", mode, sample.location);

        let (submitted, weather_used, result) = match position {
            Some(pos) => {
                let out = predict_with_weather(
                    self.weather.as_ref(),
                    self.predictor.as_ref(),
                    &sample,
                    pos.latitude,
                    pos.longitude,
                    self.metrics.as_ref(),
                );
                if let Some(e) = &out.weather_error {
                    self.bus.publish(Notice::new(
                        NoticeKind::PartialEnhancementFailure,
                        format!("Live weather unavailable ({}); using your manual readings.", e),
                    ));
                }
                (out.submitted, out.weather_used, out.result)
            }
            None => {
                let result = self.predictor.predict(&sample);
                if let Some(m) = &self.metrics {
                    m.prediction(result.is_ok());
                }
                (sample, None, result)
            }
        };

        if self.cancel.is_cancelled() {
            debug!("[form] torn down during submit, discarding result");
            return &self.state;
        }

        match result {
            Ok(rec) => {
                self.result = Some(rec.clone());
                self.submitted = Some(submitted);
                self.weather_used = weather_used;
                self.state = FormState::Result(rec);
            }
            Err(e) => {
                // the previous result stays displayed
                self.bus.publish(Notice::new(NoticeKind::Network, e.message().to_string()));
                self.state = FormState::Error(e.message().to_string());
            }
        }
        &self.state
    }

    pub fn clear_result(&mut self) {
        self.result = None;
        self.submitted = None;
        self.weather_used = None;
        if matches!(self.state, FormState::Result(_) | FormState::Error(_)) {
            self.state = FormState::Idle;
        }
    }

    /// Builds a guide for the current result, then saves it in the background.
    pub fn generate_guide(&mut self) -> Result<GuideOutcome, GuideError> {
        if self.cancel.is_cancelled() {
            return Err(GuideError::Cancelled);
        }
        let (rec, sample) = match (&self.result, &self.submitted) {
            (Some(r), Some(s)) => (r.clone(), s.clone()),
            _ => return Err(GuideError::NoPrediction),
        };
        let guides = self
            .guides
            .as_ref()
            .ok_or_else(|| GuideError::Request("guide generation is not configured".into()))?;

        let parsed = guides.generate(&rec.crop, &sample.location, &sample).map_err(|e| {
            self.bus.publish(Notice::new(NoticeKind::Network, e.to_string()));
            e
        })?;
        if parsed.fallback {
            self.bus.publish(Notice::new(
                NoticeKind::Info,
                "The guide could not be fully structured; showing the raw advice.",
            ));
        }

        let key = rec
            .id
            .clone()
            .unwrap_or_else(|| format!("local-{}", Utc::now().timestamp_millis()));
        let persist = guides.persist_in_background(&key, &parsed.guide);

        Ok(GuideOutcome { guide: parsed.guide, fallback: parsed.fallback, persist })
    }

    /// View teardown: outstanding work may finish but sets no more state.
    pub fn teardown(&mut self) {
        self.cancel.cancel();
        info!("[form] controller torn down");
    }
}
