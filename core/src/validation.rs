// core/src/validation.rs
use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ValidationError;
use crate::models::{SoilField, SoilForm, SoilSample};

pub const MAX_LOCATION_CHARS: usize = 100;

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)$").expect("number regex"));

// At most two fractional digits.
static PRECISION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d*\.?\d{0,2}$").expect("precision regex"));

/// Inclusive bounds for numeric fields; `None` for location.
pub fn bounds(field: SoilField) -> Option<(f64, f64)> {
    match field {
        SoilField::N | SoilField::P | SoilField::K => Some((0.0, 300.0)),
        SoilField::Temperature => Some((-10.0, 60.0)),
        SoilField::Humidity => Some((0.0, 100.0)),
        SoilField::Ph => Some((0.0, 14.0)),
        SoilField::Rainfall => Some((0.0, 4000.0)),
        SoilField::Location => None,
    }
}

fn unit(field: SoilField) -> &'static str {
    match field {
        SoilField::N | SoilField::P | SoilField::K => " kg/ha",
        SoilField::Temperature => "°C",
        SoilField::Humidity => "%",
        SoilField::Rainfall => " mm",
        SoilField::Ph | SoilField::Location => "",
    }
}

/// Parses one numeric field, in rule order: required, numeric, range, precision.
pub fn parse_number(field: SoilField, raw: &str) -> Result<f64, String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(format!("{} is required", field.label()));
    }
    if !NUMBER_RE.is_match(text) {
        return Err(format!("{} must be a number", field.label()));
    }
    let value: f64 = text
        .parse()
        .map_err(|_| format!("{} must be a number", field.label()))?;

    if let Some((min, max)) = bounds(field) {
        if value < min || value > max {
            let u = unit(field);
            return Err(format!(
                "{} must be between {}{} and {}{}",
                field.label(),
                min,
                u,
                max,
                u
            ));
        }
    }
    if !PRECISION_RE.is_match(text) {
        return Err(format!(
            "{} can have at most 2 decimal places",
            field.label()
        ));
    }
    Ok(value)
}

pub fn validate_location(raw: &str) -> Result<String, String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err("Location is required".to_string());
    }
    if text.chars().count() > MAX_LOCATION_CHARS {
        return Err(format!(
            "Location must be at most {} characters",
            MAX_LOCATION_CHARS
        ));
    }
    Ok(text.to_string())
}

/// Checks a single field; used for real-time feedback on every edit.
pub fn validate_field(field: SoilField, raw: &str) -> Result<(), String> {
    match field {
        SoilField::Location => validate_location(raw).map(|_| ()),
        _ => parse_number(field, raw).map(|_| ()),
    }
}

/// Validates the whole form. Either a sample or a map with one message per bad field.
pub fn validate(form: &SoilForm) -> Result<SoilSample, ValidationError> {
    let mut errors = BTreeMap::new();
    let mut num = |field: SoilField| match parse_number(field, form.get(field)) {
        Ok(v) => v,
        Err(msg) => {
            errors.insert(field, msg);
            0.0
        }
    };

    let n = num(SoilField::N);
    let p = num(SoilField::P);
    let k = num(SoilField::K);
    let temperature = num(SoilField::Temperature);
    let humidity = num(SoilField::Humidity);
    let ph = num(SoilField::Ph);
    let rainfall = num(SoilField::Rainfall);

    let location = match validate_location(&form.location) {
        Ok(l) => l,
        Err(msg) => {
            errors.insert(SoilField::Location, msg);
            String::new()
        }
    };

    if !errors.is_empty() {
        return Err(ValidationError(errors));
    }

    Ok(SoilSample { n, p, k, temperature, humidity, ph, rainfall, location })
}

/// Field errors only; empty map means the form is submittable.
pub fn field_errors(form: &SoilForm) -> BTreeMap<SoilField, String> {
    match validate(form) {
        Ok(_) => BTreeMap::new(),
        Err(e) => e.0,
    }
}
