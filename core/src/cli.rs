use std::fmt::Write as _;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use crate::guide::SECTION_TITLES;
use crate::insights::{analyze_soil, crop_growing_season, suitability_reasons};
use crate::models::{GrowingGuide, Recommendation, SoilForm, SoilSample, WeatherReading};

pub const DEFAULT_CONFIG_PATH: &str = "crop_advisor.json";

#[derive(Parser, Debug)]
#[command(name = "crop-advisor", version, about = "Crop recommendation and growing guides")]
pub struct Cli {
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH, help = "Path to JSON config")]
    pub config: String,
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check a soil sample without calling the backend
    Validate {
        #[command(flatten)]
        form: FormArgs,
    },
    /// Recommend a crop, optionally with live weather
    Predict {
        #[command(flatten)]
        form: FormArgs,
        #[arg(long, help = "Replace temperature/humidity/rainfall with live weather")]
        weather: bool,
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        lon: Option<f64>,
        #[arg(long, help = "Use the configured device location")]
        use_location: bool,
        #[arg(long, help = "Generate a growing guide for the result")]
        guide: bool,
    },
    /// Generate a growing guide for a known crop
    Guide {
        #[arg(long)]
        crop: String,
        #[command(flatten)]
        form: FormArgs,
        #[arg(long)]
        prediction_id: Option<String>,
    },
    /// Cropping season for a month (default: now)
    Season {
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
    },
}

/// Form fields as raw text, validated by the library.
#[derive(Args, Debug, Clone, Default)]
pub struct FormArgs {
    #[arg(long = "n", default_value = "")]
    pub n: String,
    #[arg(long = "p", default_value = "")]
    pub p: String,
    #[arg(long = "k", default_value = "")]
    pub k: String,
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub temperature: String,
    #[arg(long, default_value = "")]
    pub humidity: String,
    #[arg(long, default_value = "")]
    pub ph: String,
    #[arg(long, default_value = "")]
    pub rainfall: String,
    #[arg(long, default_value = "")]
    pub location: String,
}

impl From<FormArgs> for SoilForm {
    fn from(a: FormArgs) -> Self {
        SoilForm {
            n: a.n,
            p: a.p,
            k: a.k,
            temperature: a.temperature,
            humidity: a.humidity,
            ph: a.ph,
            rainfall: a.rainfall,
            location: a.location,
        }
    }
}

/// Routes `log` records to stderr. `RUST_LOG` wins over `default_filter`.
pub fn init_logging(default_filter: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
}

pub fn render_recommendation(rec: &Recommendation, sample: &SoilSample, weather: Option<&WeatherReading>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "--- Crop Recommendation ---");
    let _ = writeln!(out, "Crop: {}", rec.crop);
    match rec.confidence_pct {
        Some(c) => {
            let _ = writeln!(out, "Confidence: {:.1}%", c);
        }
        None => {
            let _ = writeln!(out, "Confidence: n/a");
        }
    }
    if let Some(v) = &rec.model_version {
        let _ = writeln!(out, "Model: {}", v);
    }
    let _ = writeln!(out, "Season: {}", crop_growing_season(&rec.crop));
    if let Some(w) = weather {
        let _ = writeln!(
            out,
            "Live weather: {:.1}°C, {:.0}% humidity, rain {:?} mm",
            w.temperature,
            w.humidity,
            w.rain_1h.or(w.rain_3h)
        );
    }
    let _ = writeln!(
        out,
        "Submitted: N={} P={} K={} T={} H={} pH={} rain={} @ {}",
        sample.n, sample.p, sample.k, sample.temperature, sample.humidity, sample.ph, sample.rainfall, sample.location
    );
    out.push_str(&render_analysis(sample));
    out
}

pub fn render_analysis(sample: &SoilSample) -> String {
    let a = analyze_soil(sample);
    let mut out = String::new();
    let _ = writeln!(out, "Soil fertility: {}", a.soil_fertility);
    let _ = writeln!(out, "Climate: {}", a.climate_conditions);
    let _ = writeln!(out, "Water: {}", a.water_requirements);
    for r in suitability_reasons(sample) {
        let _ = writeln!(out, "  + {}", r);
    }
    for r in a.recommendations {
        let _ = writeln!(out, "  ! {}", r);
    }
    out
}

pub fn render_guide(guide: &GrowingGuide) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} in {} ({}) ===", guide.crop_name, guide.location, guide.season);
    if let Some(o) = guide.summary.get("overview").and_then(|v| v.as_str()) {
        let _ = writeln!(out, "{}\n", o);
    }
    for (i, s) in guide.sections.iter().enumerate() {
        let _ = writeln!(out, "{}. {}\n{}\n", i + 1, s.title, s.content);
    }
    if guide.sections.len() != SECTION_TITLES.len() {
        let _ = writeln!(out, "(unstructured guide)");
    }
    out
}
