//! Legacy body-based hold instructions
//!
//! The older GRIP wire format carries hold instructions in a JSON response
//! body instead of `Grip-*` headers. Both paths share the [`Channel`]
//! normalization and export; [`crate::instruct::GripInstruct`] is the
//! header-based serializer.

use serde_json::json;

use crate::error::Result;
use crate::models::{Channel, Format, HttpResponseFormat};

/// Hold mode: long-poll until a publish, or stream publishes as they come
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldMode {
    Response,
    Stream,
}

impl HoldMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HoldMode::Response => "response",
            HoldMode::Stream => "stream",
        }
    }
}

/// Build the `Grip-Channel` header value:
/// `name[; prev-id=ID]` entries joined by `, `
pub fn create_grip_channel_header<I, C>(channels: I) -> String
where
    I: IntoIterator<Item = C>,
    C: Into<Channel>,
{
    channels
        .into_iter()
        .map(|channel| {
            let channel = channel.into();
            match &channel.prev_id {
                Some(prev_id) => format!("{}; prev-id={}", channel.name, prev_id),
                None => channel.name,
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build a JSON hold-instruction body.
///
/// The initial response payload, when given, rides along under `response`;
/// use [`HttpResponseFormat::from`] to wrap a bare string body.
pub fn create_hold<I, C>(
    mode: HoldMode,
    channels: I,
    response: Option<&HttpResponseFormat>,
    timeout: Option<u32>,
) -> Result<String>
where
    I: IntoIterator<Item = C>,
    C: Into<Channel>,
{
    let channels: Vec<Channel> = channels.into_iter().map(Into::into).collect();

    let mut hold = serde_json::Map::new();
    hold.insert("mode".to_string(), json!(mode.as_str()));
    hold.insert("channels".to_string(), serde_json::to_value(&channels)?);
    if let Some(timeout) = timeout {
        hold.insert("timeout".to_string(), json!(timeout));
    }

    let mut instruct = serde_json::Map::new();
    instruct.insert("hold".to_string(), serde_json::Value::Object(hold));
    if let Some(response) = response {
        instruct.insert("response".to_string(), response.export());
    }

    Ok(serde_json::Value::Object(instruct).to_string())
}

/// Hold a long-poll connection open until the next publish
pub fn create_hold_response<I, C>(
    channels: I,
    response: Option<&HttpResponseFormat>,
    timeout: Option<u32>,
) -> Result<String>
where
    I: IntoIterator<Item = C>,
    C: Into<Channel>,
{
    create_hold(HoldMode::Response, channels, response, timeout)
}

/// Hold a streaming connection open, appending published content
pub fn create_hold_stream<I, C>(
    channels: I,
    response: Option<&HttpResponseFormat>,
) -> Result<String>
where
    I: IntoIterator<Item = C>,
    C: Into<Channel>,
{
    create_hold(HoldMode::Stream, channels, response, None)
}
