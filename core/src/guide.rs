// core/src/guide.rs
use std::sync::Arc;
use std::thread::JoinHandle;

use chrono::{Datelike, Local, Utc};
use log::{info, warn};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{GuideError, PersistenceError};
use crate::events::{EventBus, Notice, NoticeKind};
use crate::llm::LlmClient;
use crate::metrics::Metrics;
use crate::models::{FarmProfile, GrowingGuide, GuideSection, Season, SoilSample};
use crate::storage::{GuideStore, SavedGuide};

/// The eight sections every guide must carry, in order.
pub const SECTION_TITLES: [&str; 8] = [
    "Land Preparation",
    "Seed Selection & Sowing",
    "Nutrient Management",
    "Irrigation Schedule",
    "Weed Management",
    "Pest & Disease Control",
    "Harvesting",
    "Post-Harvest & Marketing",
];

pub const FALLBACK_SECTION_TITLE: &str = "Growing Guide";

const SYSTEM_PROMPT: &str = "You are an agricultural extension expert for Indian farming conditions. \
Answer with a single JSON object and nothing else: no markdown, no commentary.";

/// Cropping season for the current local month.
pub fn current_season() -> Season {
    Season::from_month(Local::now().month())
}

/// Everything the prompt embeds.
#[derive(Debug, Clone)]
pub struct GuideRequest {
    pub crop: String,
    pub location: String,
    pub season: Season,
    pub soil: SoilSample,
    pub farm: FarmProfile,
}

pub fn build_prompt(req: &GuideRequest) -> String {
    let mut farm = Vec::new();
    if let Some(size) = req.farm.farm_size_acres {
        farm.push(format!("- Farm size: {} acres", size));
    }
    if let Some(s) = &req.farm.soil_type {
        farm.push(format!("- Soil type: {}", s));
    }
    if let Some(i) = &req.farm.irrigation {
        farm.push(format!("- Irrigation: {}", i));
    }
    if let Some(e) = &req.farm.experience {
        farm.push(format!("- Farmer experience: {}", e));
    }
    if farm.is_empty() {
        farm.push("- Not provided".to_string());
    }

    let titles = SECTION_TITLES
        .iter()
        .map(|t| format!("    {{\"title\": \"{}\", \"content\": \"...\"}}", t))
        .collect::<Vec<_>>()
        .join(",\n");

    let s = &req.soil;
    format!(
        "Create a complete growing guide for {crop} in {location} for the {season} season.\n\
\n\
FARM PROFILE:\n{farm}\n\
\n\
CURRENT SOIL READINGS:\n\
- Nitrogen (N): {n} kg/ha\n\
- Phosphorus (P): {p} kg/ha\n\
- Potassium (K): {k} kg/ha\n\
- Temperature: {t} °C\n\
- Humidity: {h} %\n\
- pH: {ph}\n\
- Rainfall: {r} mm\n\
\n\
Respond with strict JSON in exactly this shape, with all 8 sections in this order:\n\
{{\n\
  \"summary\": {{\"overview\": \"...\", \"duration\": \"...\", \"difficulty\": \"...\", \"expectedYield\": \"...\"}},\n\
  \"timeline\": {{\"sowing\": \"...\", \"growth\": \"...\", \"harvest\": \"...\"}},\n\
  \"sections\": [\n{titles}\n  ],\n\
  \"resources\": {{\"contacts\": [\"...\"], \"schemes\": [\"...\"]}}\n\
}}",
        crop = req.crop,
        location = req.location,
        season = req.season,
        farm = farm.join("\n"),
        n = s.n,
        p = s.p,
        k = s.k,
        t = s.temperature,
        h = s.humidity,
        ph = s.ph,
        r = s.rainfall,
        titles = titles,
    )
}

#[derive(Debug, Deserialize)]
struct GuideBody {
    #[serde(default, rename = "cropName")]
    crop_name: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    season: Option<String>,
    summary: Value,
    timeline: Value,
    sections: Vec<GuideSection>,
    #[serde(default)]
    resources: Value,
}

/// The JSON object inside a reply: first `{` to last `}`. Drops code fences
/// (fenced on one line or several) and any prose around them.
fn json_payload(raw: &str) -> &str {
    let t = raw.trim();
    match (t.find('{'), t.rfind('}')) {
        (Some(start), Some(end)) if start < end => &t[start..=end],
        _ => t,
    }
}

fn parse_strict(raw: &str) -> Result<GuideBody, String> {
    let mut de = serde_json::Deserializer::from_str(json_payload(raw));
    let body: GuideBody = serde_path_to_error::deserialize(&mut de)
        .map_err(|e| format!("guide parse at {}: {}", e.path(), e))?;
    if body.sections.len() != SECTION_TITLES.len() {
        return Err(format!(
            "expected {} sections, got {}",
            SECTION_TITLES.len(),
            body.sections.len()
        ));
    }
    if body.sections.iter().any(|s| s.title.trim().is_empty()) {
        return Err("section without title".into());
    }
    if !body.summary.is_object() || !body.timeline.is_object() {
        return Err("summary and timeline must be objects".into());
    }
    Ok(body)
}

/// Minimal guide that carries the model's raw text in one section.
pub fn fallback_guide(req: &GuideRequest, raw: &str, generated_at: &str) -> GrowingGuide {
    GrowingGuide {
        crop_name: req.crop.clone(),
        location: req.location.clone(),
        season: req.season.to_string(),
        generated_at: generated_at.to_string(),
        summary: json!({
            "overview": format!("General growing guide for {} in {}", req.crop, req.location),
        }),
        timeline: json!({}),
        sections: vec![GuideSection {
            title: FALLBACK_SECTION_TITLE.to_string(),
            content: raw.trim().to_string(),
        }],
        resources: json!({}),
    }
}

#[derive(Debug, Clone)]
pub struct ParsedGuide {
    pub guide: GrowingGuide,
    pub fallback: bool,
}

/// Strict parse of the model reply; any failure yields the fallback guide.
pub fn parse_guide(req: &GuideRequest, raw: &str, generated_at: &str) -> ParsedGuide {
    match parse_strict(raw) {
        Ok(body) => ParsedGuide {
            guide: GrowingGuide {
                crop_name: body.crop_name.filter(|c| !c.trim().is_empty()).unwrap_or_else(|| req.crop.clone()),
                location: body.location.filter(|l| !l.trim().is_empty()).unwrap_or_else(|| req.location.clone()),
                season: body.season.filter(|s| !s.trim().is_empty()).unwrap_or_else(|| req.season.to_string()),
                generated_at: generated_at.to_string(),
                summary: body.summary,
                timeline: body.timeline,
                sections: body.sections,
                resources: if body.resources.is_null() { json!({}) } else { body.resources },
            },
            fallback: false,
        },
        Err(reason) => {
            warn!("[guide] unusable model reply ({}), using fallback guide", reason);
            ParsedGuide { guide: fallback_guide(req, raw, generated_at), fallback: true }
        }
    }
}

pub type PersistHandle = JoinHandle<Result<SavedGuide, PersistenceError>>;

pub struct GuideGenerator {
    llm: Arc<dyn LlmClient>,
    store: Option<Arc<dyn GuideStore>>,
    bus: Option<EventBus>,
    metrics: Option<Metrics>,
    farm: FarmProfile,
}

impl GuideGenerator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm, store: None, bus: None, metrics: None, farm: FarmProfile::default() }
    }

    pub fn with_store(mut self, store: Arc<dyn GuideStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_farm_profile(mut self, farm: FarmProfile) -> Self {
        self.farm = farm;
        self
    }

    /// Guide for the current season.
    pub fn generate(&self, crop: &str, location: &str, soil: &SoilSample) -> Result<ParsedGuide, GuideError> {
        self.generate_for_season(crop, location, soil, current_season())
    }

    pub fn generate_for_season(
        &self,
        crop: &str,
        location: &str,
        soil: &SoilSample,
        season: Season,
    ) -> Result<ParsedGuide, GuideError> {
        let req = GuideRequest {
            crop: crop.to_string(),
            location: location.to_string(),
            season,
            soil: soil.clone(),
            farm: self.farm.clone(),
        };
        info!("[guide] generating {} guide for {} ({})", req.crop, req.location, req.season);

        let raw = self.llm.complete(SYSTEM_PROMPT, &build_prompt(&req))?;
        let parsed = parse_guide(&req, &raw, &Utc::now().to_rfc3339());
        if let Some(m) = &self.metrics {
            m.guide_generated(parsed.fallback);
        }
        Ok(parsed)
    }

    /// Fire-and-forget save keyed by prediction id. Failure is published as a
    /// notice; the guide the caller already holds is unaffected.
    pub fn persist_in_background(&self, prediction_id: &str, guide: &GrowingGuide) -> Option<PersistHandle> {
        let store = self.store.clone()?;
        let bus = self.bus.clone();
        let metrics = self.metrics.clone();
        let prediction_id = prediction_id.to_string();
        let guide = guide.clone();

        Some(std::thread::spawn(move || {
            let result = store.save_guide(&prediction_id, &guide);
            if let Some(m) = &metrics {
                m.guide_persist(result.is_ok());
            }
            match &result {
                Ok(saved) => info!("[guide] saved {} for prediction {}", saved.guide_id, prediction_id),
                Err(e) => {
                    warn!("[guide] save failed for prediction {}: {}", prediction_id, e);
                    if let Some(bus) = &bus {
                        bus.publish(Notice::new(
                            NoticeKind::PersistenceFailure,
                            format!("Guide generated but could not be saved: {}", e),
                        ));
                    }
                }
            }
            result
        }))
    }
}
