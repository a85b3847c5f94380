// core/src/http.rs
use std::time::Duration;

use serde_json::Value;
use ureq::Agent;

/// One ureq agent per client; ureq uses rustls when "tls" is enabled.
pub fn build_agent(timeout: Duration) -> Agent {
    ureq::AgentBuilder::new().timeout(timeout).build()
}

/// A failed call, reduced to what callers report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    Status { code: u16, body: String },
    Transport(String),
}

impl CallError {
    pub fn status(&self) -> Option<u16> {
        match self {
            CallError::Status { code, .. } => Some(*code),
            CallError::Transport(_) => None,
        }
    }

    /// Server-provided message from the error body, if any.
    pub fn server_message(&self) -> Option<String> {
        match self {
            CallError::Status { body, .. } => server_message(body),
            CallError::Transport(_) => None,
        }
    }
}

impl std::fmt::Display for CallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallError::Status { code, .. } => write!(f, "HTTP {}", code),
            CallError::Transport(msg) => write!(f, "{}", msg),
        }
    }
}

impl From<ureq::Error> for CallError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, resp) => CallError::Status {
                code,
                body: resp.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(t) => CallError::Transport(t.to_string()),
        }
    }
}

/// Extracts `detail` / `message` / `error` from a JSON error body.
/// FastAPI validation errors carry `detail` as a list of `{msg}` objects.
pub fn server_message(body: &str) -> Option<String> {
    let v: Value = serde_json::from_str(body).ok()?;
    for key in ["detail", "message", "error"] {
        match v.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.clone()),
            Some(Value::Array(items)) => {
                let msgs: Vec<&str> = items
                    .iter()
                    .filter_map(|i| i.get("msg").and_then(Value::as_str))
                    .collect();
                if !msgs.is_empty() {
                    return Some(msgs.join("; "));
                }
            }
            Some(Value::Object(o)) => {
                if let Some(Value::String(s)) = o.get("message") {
                    return Some(s.clone());
                }
            }
            _ => {}
        }
    }
    None
}

pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
