//! Header-based hold instructions
//!
//! [`GripInstruct`] accumulates hold state and serializes it as `Grip-*`
//! response headers, the modern alternative to the JSON instruction body
//! in [`crate::hold`].

use std::collections::HashMap;

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::hold::{HoldMode, create_grip_channel_header};
use crate::models::{Channel, Payload};

/// Builder for `Grip-*` hold instruction headers
#[derive(Debug, Default)]
pub struct GripInstruct {
    channels: Vec<Channel>,
    status: Option<u16>,
    hold: Option<HoldMode>,
    timeout: u32,
    keep_alive: Option<(Payload, u32)>,
    next_link: Option<String>,
    next_link_timeout: u32,
    /// Free-form connection metadata, emitted as `Grip-Set-Meta`
    pub meta: HashMap<String, String>,
}

impl GripInstruct {
    pub fn new(channel: impl Into<Channel>) -> Self {
        Self {
            channels: vec![channel.into()],
            ..Default::default()
        }
    }

    pub fn with_channels<I, C>(channels: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Channel>,
    {
        Self {
            channels: channels.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn add_channel(&mut self, channel: impl Into<Channel>) -> &mut Self {
        self.channels.push(channel.into());
        self
    }

    /// Status code the proxy should use when serving the held response
    pub fn set_status(&mut self, status: u16) -> &mut Self {
        self.status = Some(status);
        self
    }

    /// Hold the connection as a long-poll, with an optional timeout in
    /// seconds
    pub fn set_hold_longpoll(&mut self, timeout: Option<u32>) -> &mut Self {
        self.hold = Some(HoldMode::Response);
        self.timeout = timeout.unwrap_or(0);
        self
    }

    /// Hold the connection open as a stream
    pub fn set_hold_stream(&mut self) -> &mut Self {
        self.hold = Some(HoldMode::Stream);
        self
    }

    /// Periodic keep-alive payload the proxy writes after `timeout` seconds
    /// of silence
    pub fn set_keep_alive(&mut self, data: impl Into<Payload>, timeout: u32) -> &mut Self {
        self.keep_alive = Some((data.into(), timeout));
        self
    }

    /// URI the proxy fetches next when the hold ends
    pub fn set_next_link(&mut self, uri: impl Into<String>, timeout: u32) -> &mut Self {
        self.next_link = Some(uri.into());
        self.next_link_timeout = timeout;
        self
    }

    pub fn set_meta(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.meta.insert(name.into(), value.into());
        self
    }

    /// Serialize to `Grip-*` headers
    pub fn to_headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::new();

        headers.push((
            "Grip-Channel".to_string(),
            create_grip_channel_header(self.channels.iter().cloned()),
        ));

        if let Some(status) = self.status {
            headers.push(("Grip-Status".to_string(), status.to_string()));
        }

        if let Some(hold) = self.hold {
            headers.push(("Grip-Hold".to_string(), hold.as_str().to_string()));

            if self.timeout > 0 {
                headers.push(("Grip-Timeout".to_string(), self.timeout.to_string()));
            }

            if let Some((data, timeout)) = &self.keep_alive {
                let value = match keep_alive_cstring(data) {
                    Some(encoded) => format!("{}; format=cstring; timeout={}", encoded, timeout),
                    None => format!(
                        "{}; format=base64; timeout={}",
                        STANDARD.encode(data.as_bytes()),
                        timeout
                    ),
                };
                headers.push(("Grip-Keep-Alive".to_string(), value));
            }

            if !self.meta.is_empty() {
                let value = self
                    .meta
                    .iter()
                    .map(|(name, value)| format!("{}=\"{}\"", name, escape_quotes(value)))
                    .collect::<Vec<_>>()
                    .join(", ");
                headers.push(("Grip-Set-Meta".to_string(), value));
            }
        }

        // Grip-Link is independent of the hold mode
        if let Some(uri) = &self.next_link {
            let mut value = format!("<{}>; rel=next", uri);
            if self.next_link_timeout > 0 {
                value.push_str(&format!("; timeout={}", self.next_link_timeout));
            }
            headers.push(("Grip-Link".to_string(), value));
        }

        headers
    }
}

/// C-string-escape a text keep-alive payload. Returns `None` for binary
/// payloads or text with control characters that have no escape, in which
/// case the caller falls back to base64.
fn keep_alive_cstring(data: &Payload) -> Option<String> {
    let text = match data {
        Payload::Text(s) => s,
        Payload::Bytes(_) => return None,
    };
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => return None,
            c => out.push(c),
        }
    }
    Some(out)
}

fn escape_quotes(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
