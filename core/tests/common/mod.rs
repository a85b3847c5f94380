#![allow(dead_code)]
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};

use cropadvisor_core::error::{GuideError, PersistenceError, PredictionError, WeatherError};
use cropadvisor_core::llm::LlmClient;
use cropadvisor_core::storage::{GuideStore, SavedGuide};
use cropadvisor_core::{CropPredictor, GrowingGuide, Recommendation, SoilForm, SoilSample, WeatherProvider, WeatherReading};

pub fn sample() -> SoilSample {
    SoilSample {
        n: 90.0,
        p: 42.0,
        k: 43.0,
        temperature: 20.88,
        humidity: 82.0,
        ph: 6.5,
        rainfall: 202.94,
        location: "Pune".to_string(),
    }
}

pub fn valid_form() -> SoilForm {
    SoilForm {
        n: "90".into(),
        p: "42".into(),
        k: "43".into(),
        temperature: "20.88".into(),
        humidity: "82".into(),
        ph: "6.5".into(),
        rainfall: "202.94".into(),
        location: "Pune".into(),
    }
}

pub fn rec(crop: &str, id: Option<&str>) -> Recommendation {
    Recommendation {
        crop: crop.to_string(),
        confidence_pct: Some(97.0),
        model_version: Some("RandomForest-v1.0".into()),
        processing_time: None,
        id: id.map(str::to_string),
    }
}

/// Records every sample it is asked about.
pub struct RecordingPredictor {
    pub seen: Mutex<Vec<SoilSample>>,
    pub reply: Mutex<Result<Recommendation, PredictionError>>,
}

impl RecordingPredictor {
    pub fn ok(r: Recommendation) -> Arc<Self> {
        Arc::new(Self { seen: Mutex::new(Vec::new()), reply: Mutex::new(Ok(r)) })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
            reply: Mutex::new(Err(PredictionError::RequestFailed { message: message.into(), status: Some(500) })),
        })
    }

    pub fn set_reply(&self, reply: Result<Recommendation, PredictionError>) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn calls(&self) -> Vec<SoilSample> {
        self.seen.lock().unwrap().clone()
    }
}

impl CropPredictor for RecordingPredictor {
    fn predict(&self, sample: &SoilSample) -> Result<Recommendation, PredictionError> {
        self.seen.lock().unwrap().push(sample.clone());
        self.reply.lock().unwrap().clone()
    }
}

pub struct FailingWeather;

impl WeatherProvider for FailingWeather {
    fn current_weather(&self, _lat: f64, _lon: f64) -> Result<WeatherReading, WeatherError> {
        Err(WeatherError::Unavailable("HTTP 503".into()))
    }
}

pub struct CannedLlm(pub String);

impl LlmClient for CannedLlm {
    fn complete(&self, _system: &str, _prompt: &str) -> Result<String, GuideError> {
        Ok(self.0.clone())
    }
}

pub struct FailingStore;

impl GuideStore for FailingStore {
    fn save_guide(&self, _id: &str, _guide: &GrowingGuide) -> Result<SavedGuide, PersistenceError> {
        Err(PersistenceError::Request("firestore unavailable".into()))
    }

    fn guide_for_prediction(&self, _id: &str) -> Result<Option<SavedGuide>, PersistenceError> {
        Ok(None)
    }
}

pub fn eight_section_guide_json() -> String {
    let sections: Vec<serde_json::Value> = cropadvisor_core::guide::SECTION_TITLES
        .iter()
        .map(|t| serde_json::json!({ "title": t, "content": format!("{} steps", t) }))
        .collect();
    serde_json::json!({
        "summary": { "overview": "Rice thrives in wet Kharif fields" },
        "timeline": { "sowing": "June", "harvest": "October" },
        "sections": sections,
        "resources": { "contacts": ["KVK Pune"] }
    })
    .to_string()
}

/// Local HTTP server answering one canned `(status, content type, body)` per
/// connection, in order. Raw requests come back on the channel.
pub fn serve(responses: Vec<(u16, &'static str, String)>) -> (String, Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        for (status, content_type, body) in responses {
            let mut stream = match listener.accept() {
                Ok((stream, _)) => stream,
                Err(_) => return,
            };
            let _ = tx.send(read_request(&mut stream));
            let reply = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                reason(status),
                content_type,
                body.len(),
                body
            );
            let _ = stream.write_all(reply.as_bytes());
        }
    });
    (base, rx)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        404 => "Not Found",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + len {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Body of a raw request, parsed as JSON.
pub fn request_json(raw: &str) -> serde_json::Value {
    let body = raw.split_once("\r\n\r\n").map(|(_, b)| b).unwrap_or("");
    serde_json::from_str(body).unwrap()
}
