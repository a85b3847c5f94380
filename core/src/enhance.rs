// core/src/enhance.rs
use log::{info, warn};

use crate::error::{PredictionError, WeatherError};
use crate::metrics::Metrics;
use crate::models::{Recommendation, SoilField, SoilSample, WeatherReading};
use crate::validation::bounds;
use crate::prediction::CropPredictor;
use crate::weather::{recent_rain_mm, WeatherProvider};

/// Nearest integer, halves toward +inf (-2.5 -> -2, 2.5 -> 3).
fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

/// Live weather overrides temperature, humidity and rainfall (all rounded).
/// Rainfall: rain_1h, else rain_3h, else 0. N/P/K/pH/location are kept.
pub fn merge_weather(sample: &SoilSample, reading: &WeatherReading) -> SoilSample {
    SoilSample {
        temperature: round_half_up(reading.temperature),
        humidity: round_half_up(reading.humidity),
        rainfall: recent_rain_mm(reading).map(round_half_up).unwrap_or(0.0),
        ..sample.clone()
    }
}

/// Merged values must sit inside the same bounds as manual input.
fn check_merged(merged: &SoilSample) -> Result<(), WeatherError> {
    for (field, value) in [
        (SoilField::Temperature, merged.temperature),
        (SoilField::Humidity, merged.humidity),
        (SoilField::Rainfall, merged.rainfall),
    ] {
        if let Some((min, max)) = bounds(field) {
            if !(min..=max).contains(&value) {
                return Err(WeatherError::Unavailable(format!(
                    "live {} {} outside {}..={}",
                    field.wire_name(),
                    value,
                    min,
                    max
                )));
            }
        }
    }
    Ok(())
}

/// Weather reading merged into `sample`, rejected when out of bounds.
pub fn checked_merge(sample: &SoilSample, reading: &WeatherReading) -> Result<SoilSample, WeatherError> {
    let merged = merge_weather(sample, reading);
    check_merged(&merged)?;
    Ok(merged)
}

/// Fetches weather for (lat, lon) and merges it. Weather failure is returned, not swallowed.
pub fn enhance_sample(
    weather: &dyn WeatherProvider,
    sample: &SoilSample,
    lat: f64,
    lon: f64,
) -> Result<SoilSample, WeatherError> {
    let reading = weather.current_weather(lat, lon)?;
    checked_merge(sample, &reading)
}

#[derive(Debug, Clone)]
pub struct EnhancedPrediction {
    /// Sample actually sent to the predictor.
    pub submitted: SoilSample,
    /// Weather used (None when the fetch failed).
    pub weather_used: Option<WeatherReading>,
    /// Set when enhancement fell back to the manual sample.
    pub weather_error: Option<WeatherError>,
    pub result: Result<Recommendation, PredictionError>,
}

impl EnhancedPrediction {
    pub fn fell_back(&self) -> bool {
        self.weather_error.is_some()
    }
}

/// Weather first, then prediction. If weather fails, predict with the manual sample.
pub fn predict_with_weather(
    weather: &dyn WeatherProvider,
    predictor: &dyn CropPredictor,
    sample: &SoilSample,
    lat: f64,
    lon: f64,
    metrics: Option<&Metrics>,
) -> EnhancedPrediction {
    let fetched = weather
        .current_weather(lat, lon)
        .and_then(|reading| checked_merge(sample, &reading).map(|merged| (reading, merged)));
    let (submitted, weather_used, weather_error) = match fetched {
        Ok((reading, merged)) => {
            if let Some(m) = metrics {
                m.weather_fetch(true);
            }
            info!(
                "[enhance] weather merged: {:.0}°C, {:.0}%, {:.0} mm",
                merged.temperature, merged.humidity, merged.rainfall
            );
            (merged, Some(reading), None)
        }
        Err(e) => {
            if let Some(m) = metrics {
                m.weather_fetch(false);
            }
            warn!("[enhance] {} - falling back to manual values", e);
            (sample.clone(), None, Some(e))
        }
    };

    let result = predictor.predict(&submitted);
    if let Some(m) = metrics {
        m.prediction(result.is_ok());
    }

    EnhancedPrediction { submitted, weather_used, weather_error, result }
}
