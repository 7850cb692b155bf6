use std::collections::HashMap;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::{Value, json};

use super::payload::Payload;

/// A per-protocol payload representation inside an [`Item`](super::Item).
///
/// `name` is the wire discriminator (`http-response`, `http-stream`,
/// `ws-message`); `export` produces the JSON object the proxy reads.
/// Callers may implement this for proxy extensions beyond the built-ins.
pub trait Format: Send + Sync {
    fn name(&self) -> &str;
    fn export(&self) -> Value;
}

/// Payload delivered to held long-poll connections as a full HTTP response
#[derive(Debug, Clone, Default)]
pub struct HttpResponseFormat {
    pub code: Option<u16>,
    pub reason: Option<String>,
    pub headers: Option<HashMap<String, String>>,
    pub body: Option<Payload>,
}

impl HttpResponseFormat {
    pub fn new(body: impl Into<Payload>) -> Self {
        Self {
            body: Some(body.into()),
            ..Default::default()
        }
    }
}

impl From<&str> for HttpResponseFormat {
    fn from(body: &str) -> Self {
        HttpResponseFormat::new(body)
    }
}

impl From<String> for HttpResponseFormat {
    fn from(body: String) -> Self {
        HttpResponseFormat::new(body)
    }
}

impl Format for HttpResponseFormat {
    fn name(&self) -> &str {
        "http-response"
    }

    fn export(&self) -> Value {
        let mut out = serde_json::Map::new();
        if let Some(code) = self.code {
            out.insert("code".to_string(), json!(code));
        }
        if let Some(reason) = &self.reason {
            out.insert("reason".to_string(), json!(reason));
        }
        if let Some(headers) = &self.headers {
            out.insert("headers".to_string(), json!(headers));
        }
        match &self.body {
            Some(Payload::Text(s)) => {
                out.insert("body".to_string(), json!(s));
            }
            Some(Payload::Bytes(b)) => {
                out.insert("body-bin".to_string(), json!(STANDARD.encode(b)));
            }
            None => {}
        }
        Value::Object(out)
    }
}

/// Payload appended to held streaming connections, or an instruction to
/// close them
#[derive(Debug, Clone)]
pub enum HttpStreamFormat {
    Content(Payload),
    Close,
}

impl HttpStreamFormat {
    pub fn content(content: impl Into<Payload>) -> Self {
        HttpStreamFormat::Content(content.into())
    }
}

impl From<&str> for HttpStreamFormat {
    fn from(content: &str) -> Self {
        HttpStreamFormat::content(content)
    }
}

impl From<String> for HttpStreamFormat {
    fn from(content: String) -> Self {
        HttpStreamFormat::content(content)
    }
}

impl Format for HttpStreamFormat {
    fn name(&self) -> &str {
        "http-stream"
    }

    fn export(&self) -> Value {
        match self {
            HttpStreamFormat::Content(Payload::Text(s)) => json!({ "content": s }),
            HttpStreamFormat::Content(Payload::Bytes(b)) => {
                json!({ "content-bin": STANDARD.encode(b) })
            }
            HttpStreamFormat::Close => json!({ "action": "close" }),
        }
    }
}

/// A WebSocket message delivered to held WebSocket-over-HTTP sessions, or
/// an instruction to close them with an optional close code
#[derive(Debug, Clone)]
pub enum WebSocketMessageFormat {
    Message(Payload),
    Close(Option<u16>),
}

impl WebSocketMessageFormat {
    pub fn message(content: impl Into<Payload>) -> Self {
        WebSocketMessageFormat::Message(content.into())
    }
}

impl Format for WebSocketMessageFormat {
    fn name(&self) -> &str {
        "ws-message"
    }

    fn export(&self) -> Value {
        match self {
            WebSocketMessageFormat::Message(Payload::Text(s)) => json!({ "content": s }),
            WebSocketMessageFormat::Message(Payload::Bytes(b)) => {
                json!({ "content-bin": STANDARD.encode(b) })
            }
            WebSocketMessageFormat::Close(None) => json!({ "action": "close" }),
            WebSocketMessageFormat::Close(Some(code)) => {
                json!({ "action": "close", "code": code })
            }
        }
    }
}
