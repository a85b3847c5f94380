use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ureq::Agent;

use crate::error::GuideError;
use crate::http::{build_agent, CallError};

/// Text completion backend for guide generation.
pub trait LlmClient: Send + Sync {
    fn complete(&self, system: &str, prompt: &str) -> Result<String, GuideError>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

/// OpenAI-compatible `/chat/completions` endpoint (Groq and friends).
pub struct ChatCompletionsClient {
    agent: Agent,
    url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl ChatCompletionsClient {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            agent: build_agent(timeout),
            url: url.into(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.7,
            max_tokens: 4096,
        }
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }
}

impl LlmClient for ChatCompletionsClient {
    fn complete(&self, system: &str, prompt: &str) -> Result<String, GuideError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: prompt },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        debug!("[llm] POST {} model={}", self.url, self.model);

        let resp = self
            .agent
            .post(&self.url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(&body)
            .map_err(|e| request_error(CallError::from(e)))?;

        let parsed: ChatResponse = resp
            .into_json()
            .map_err(|e| GuideError::Request(format!("completion body: {}", e)))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GuideError::Request("completion had no choices".into()))
    }
}

/// Local proxy that forwards `{prompt, system}` to a hosted model.
pub struct ProxyClient {
    agent: Agent,
    url: String,
}

impl ProxyClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self { agent: build_agent(timeout), url: url.into() }
    }
}

impl LlmClient for ProxyClient {
    fn complete(&self, system: &str, prompt: &str) -> Result<String, GuideError> {
        let resp = self
            .agent
            .post(&self.url)
            .send_json(serde_json::json!({ "prompt": prompt, "system": system }))
            .map_err(|e| request_error(CallError::from(e)))?;
        let body = resp
            .into_string()
            .map_err(|e| GuideError::Request(format!("proxy body: {}", e)))?;
        Ok(proxy_text(&body))
    }
}

/// `content` / `response` / `text` from a proxy reply; the raw body otherwise.
pub fn proxy_text(body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["content", "response", "text"] {
            if let Some(Value::String(s)) = map.get(key) {
                return s.clone();
            }
        }
    }
    body.to_string()
}

fn request_error(err: CallError) -> GuideError {
    warn!("[llm] request failed: {}", err);
    match err.server_message() {
        Some(msg) => GuideError::Request(msg),
        None => GuideError::Request(err.to_string()),
    }
}
