use crate::error::WeatherError;
use crate::models::{valid_coordinates, WeatherReading};

/// Source of current conditions (prod: BackendWeatherClient, test: StaticWeatherProvider).
pub trait WeatherProvider: Send + Sync {
    fn current_weather(&self, lat: f64, lon: f64) -> Result<WeatherReading, WeatherError>;
}

/// Fixed reading, or a fixed failure when `reading` is `None`.
#[derive(Debug, Clone, Default)]
pub struct StaticWeatherProvider {
    pub reading: Option<WeatherReading>,
}

impl StaticWeatherProvider {
    pub fn new(reading: WeatherReading) -> Self {
        Self { reading: Some(reading) }
    }

    pub fn unavailable() -> Self {
        Self { reading: None }
    }
}

impl WeatherProvider for StaticWeatherProvider {
    fn current_weather(&self, lat: f64, lon: f64) -> Result<WeatherReading, WeatherError> {
        check_coordinates(lat, lon)?;
        self.reading
            .clone()
            .ok_or_else(|| WeatherError::Unavailable("no static reading configured".into()))
    }
}

pub(crate) fn check_coordinates(lat: f64, lon: f64) -> Result<(), WeatherError> {
    if valid_coordinates(lat, lon) {
        Ok(())
    } else {
        Err(WeatherError::Unavailable(format!(
            "invalid coordinates lat={} lon={}",
            lat, lon
        )))
    }
}

/// Rainfall figure used for enhancement: last hour, else last 3 hours, else none.
pub fn recent_rain_mm(reading: &WeatherReading) -> Option<f64> {
    reading.rain_1h.or(reading.rain_3h)
}
