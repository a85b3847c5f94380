// core/src/weather_api.rs
use std::time::Duration;

use log::{debug, info, warn};
use serde::Deserialize;
use ureq::Agent;

use crate::error::WeatherError;
use crate::http::{build_agent, CallError};
use crate::models::WeatherReading;
use crate::weather::{check_coordinates, WeatherProvider};

/// Flat shape served by the advisory backend.
#[derive(Debug, Clone, Deserialize)]
struct FlatWeather {
    #[serde(alias = "temp")]
    temperature: f64,
    humidity: f64,
    #[serde(default)]
    rain_1h: Option<f64>,
    #[serde(default)]
    rain_3h: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct OwmMain {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct OwmRain {
    #[serde(default, rename = "1h")]
    one_hour: Option<f64>,
    #[serde(default, rename = "3h")]
    three_hours: Option<f64>,
}

/// Raw OpenWeatherMap `/weather` shape.
#[derive(Debug, Clone, Deserialize)]
struct OwmCurrent {
    main: OwmMain,
    #[serde(default)]
    rain: Option<OwmRain>,
}

// Try the nested provider shape first, then the flat one
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum WeatherBody {
    OpenWeatherMap(OwmCurrent),
    Flat(FlatWeather),
}

impl From<WeatherBody> for WeatherReading {
    fn from(body: WeatherBody) -> Self {
        match body {
            WeatherBody::Flat(f) => WeatherReading {
                temperature: f.temperature,
                humidity: f.humidity,
                rain_1h: f.rain_1h,
                rain_3h: f.rain_3h,
            },
            WeatherBody::OpenWeatherMap(o) => {
                let rain = o.rain.unwrap_or_default();
                WeatherReading {
                    temperature: o.main.temp,
                    humidity: o.main.humidity,
                    rain_1h: rain.one_hour,
                    rain_3h: rain.three_hours,
                }
            }
        }
    }
}

pub fn parse_weather_body(body: &str) -> Result<WeatherReading, WeatherError> {
    let mut de = serde_json::Deserializer::from_str(body);
    let parsed: WeatherBody = serde_path_to_error::deserialize(&mut de)
        .map_err(|e| WeatherError::Unavailable(format!("weather parse at {}: {}", e.path(), e)))?;
    Ok(parsed.into())
}

/// Which query contract the weather URL speaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeatherApiStyle {
    /// `?latitude=..&longitude=..`
    Backend,
    /// `?lat=..&lon=..&appid=..&units=metric`
    OpenWeatherMap { api_key: String },
}

/// Blocking weather client with one bounded retry by default.
pub struct BackendWeatherClient {
    agent: Agent,
    url: String,
    style: WeatherApiStyle,
    retries: u32,
    retry_pause: Duration,
}

impl BackendWeatherClient {
    pub fn new(url: impl Into<String>, timeout: Duration, retries: u32) -> Self {
        Self {
            agent: build_agent(timeout),
            url: url.into(),
            style: WeatherApiStyle::Backend,
            retries,
            retry_pause: Duration::from_millis(250),
        }
    }

    pub fn with_style(mut self, style: WeatherApiStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_retry_pause(mut self, pause: Duration) -> Self {
        self.retry_pause = pause;
        self
    }

    fn fetch_once(&self, lat: f64, lon: f64) -> Result<WeatherReading, Attempt> {
        let (lat_s, lon_s) = (lat.to_string(), lon.to_string());
        let req = match &self.style {
            WeatherApiStyle::Backend => self
                .agent
                .get(&self.url)
                .query("latitude", &lat_s)
                .query("longitude", &lon_s),
            WeatherApiStyle::OpenWeatherMap { api_key } => self
                .agent
                .get(&self.url)
                .query("lat", &lat_s)
                .query("lon", &lon_s)
                .query("appid", api_key)
                .query("units", "metric"),
        };

        let resp = req.call().map_err(|e| {
            let err = CallError::from(e);
            Attempt {
                retry: err.status().map_or(true, |code| code >= 500),
                error: WeatherError::Unavailable(err.to_string()),
            }
        })?;
        let body = resp.into_string().map_err(|e| Attempt {
            retry: true,
            error: WeatherError::Unavailable(format!("weather body: {}", e)),
        })?;
        parse_weather_body(&body).map_err(|error| Attempt { retry: false, error })
    }
}

/// Failed attempt; only transport errors and 5xx are worth another try.
struct Attempt {
    retry: bool,
    error: WeatherError,
}

impl WeatherProvider for BackendWeatherClient {
    fn current_weather(&self, lat: f64, lon: f64) -> Result<WeatherReading, WeatherError> {
        check_coordinates(lat, lon)?;

        let attempts = self.retries + 1;
        let mut last_err = WeatherError::Unavailable("no attempt made".into());
        for attempt in 1..=attempts {
            match self.fetch_once(lat, lon) {
                Ok(reading) => {
                    info!(
                        "[weather] lat={:.3}, lon={:.3} => {:.1}°C, {:.0}% rh, rain1h={:?}",
                        lat, lon, reading.temperature, reading.humidity, reading.rain_1h
                    );
                    return Ok(reading);
                }
                Err(Attempt { retry, error }) => {
                    warn!("[weather] attempt {}/{} failed: {}", attempt, attempts, error);
                    last_err = error;
                    if !retry {
                        break;
                    }
                    if attempt < attempts {
                        debug!("[weather] retrying in {:?}", self.retry_pause);
                        std::thread::sleep(self.retry_pause);
                    }
                }
            }
        }
        Err(last_err)
    }
}
