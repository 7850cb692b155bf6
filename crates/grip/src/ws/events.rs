//! WebSocket-over-HTTP event framing
//!
//! GRIP transports WebSocket traffic as HTTP bodies using a simple frame
//! grammar: `TYPE SP HEXLEN CRLF CONTENT CRLF` for events with content,
//! `TYPE CRLF` for events without. Frames are concatenated with no
//! separator.
//!
//! The codec is pure and strict: a header line without its CRLF terminator,
//! an unknown event type, a malformed length, or a declared length running
//! past the end of the buffer all fail decoding.

use crate::error::{GripError, Result};
use crate::models::Payload;

/// WebSocket-over-HTTP event type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Open,
    Text,
    Binary,
    Ping,
    Pong,
    Close,
    Disconnect,
}

impl EventType {
    /// Wire name of the event type
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Open => "OPEN",
            EventType::Text => "TEXT",
            EventType::Binary => "BINARY",
            EventType::Ping => "PING",
            EventType::Pong => "PONG",
            EventType::Close => "CLOSE",
            EventType::Disconnect => "DISCONNECT",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s {
            "OPEN" => Ok(EventType::Open),
            "TEXT" => Ok(EventType::Text),
            "BINARY" => Ok(EventType::Binary),
            "PING" => Ok(EventType::Ping),
            "PONG" => Ok(EventType::Pong),
            "CLOSE" => Ok(EventType::Close),
            "DISCONNECT" => Ok(EventType::Disconnect),
            _ => Err(GripError::BadEventFormat),
        }
    }
}

/// A single WebSocket-over-HTTP event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSocketEvent {
    pub event_type: EventType,
    pub content: Option<Payload>,
}

impl WebSocketEvent {
    /// Event without content (`TYPE CRLF` on the wire)
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            content: None,
        }
    }

    pub fn with_content(event_type: EventType, content: impl Into<Payload>) -> Self {
        Self {
            event_type,
            content: Some(content.into()),
        }
    }
}

/// Encode events into a WebSocket-over-HTTP body
pub fn encode_websocket_events(events: &[WebSocketEvent]) -> Vec<u8> {
    let mut out = Vec::new();
    for event in events {
        out.extend_from_slice(event.event_type.as_str().as_bytes());
        match &event.content {
            Some(content) => {
                out.extend_from_slice(format!(" {:x}\r\n", content.len()).as_bytes());
                out.extend_from_slice(content.as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            None => out.extend_from_slice(b"\r\n"),
        }
    }
    out
}

/// Decode a WebSocket-over-HTTP body into events.
///
/// Content representation follows the input: a text body yields text
/// content, a byte body yields byte content.
pub fn decode_websocket_events(body: &Payload) -> Result<Vec<WebSocketEvent>> {
    let buf = body.as_bytes();
    let text = body.is_text();
    let mut events = Vec::new();
    let mut pos = 0;

    while pos < buf.len() {
        let at = find_crlf(buf, pos).ok_or(GripError::BadEventFormat)?;
        let header =
            std::str::from_utf8(&buf[pos..at]).map_err(|_| GripError::BadEventFormat)?;
        pos = at + 2;

        match header.split_once(' ') {
            None => events.push(WebSocketEvent::new(EventType::parse(header)?)),
            Some((name, hexlen)) => {
                let event_type = EventType::parse(name)?;
                let len = usize::from_str_radix(hexlen, 16)
                    .map_err(|_| GripError::BadEventFormat)?;
                let end = pos.checked_add(len).ok_or(GripError::BadEventFormat)?;
                if end > buf.len() {
                    return Err(GripError::BadEventFormat);
                }
                let content = if text {
                    Payload::Text(
                        std::str::from_utf8(&buf[pos..end])
                            .map_err(|_| GripError::BadEventFormat)?
                            .to_string(),
                    )
                } else {
                    Payload::Bytes(buf[pos..end].to_vec())
                };
                events.push(WebSocketEvent {
                    event_type,
                    content: Some(content),
                });
                // Skip the content terminator; running exactly off the end
                // of the buffer here is fine
                pos = end + 2;
            }
        }
    }

    Ok(events)
}

/// Build the JSON body of a `c:`-prefixed control message:
/// `{..args, "type": message_type}`
pub fn create_websocket_control_message(
    message_type: &str,
    args: Option<&serde_json::Value>,
) -> Result<String> {
    let mut out = match args {
        Some(serde_json::Value::Object(map)) => map.clone(),
        Some(_) => {
            return Err(GripError::SerializationError(serde::de::Error::custom(
                "control message args must be a JSON object",
            )));
        }
        None => serde_json::Map::new(),
    };
    out.insert(
        "type".to_string(),
        serde_json::Value::String(message_type.to_string()),
    );
    Ok(serde_json::Value::Object(out).to_string())
}

fn find_crlf(buf: &[u8], from: usize) -> Option<usize> {
    buf[from..]
        .windows(2)
        .position(|w| w == b"\r\n")
        .map(|i| from + i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_text_events() {
        let events = vec![
            WebSocketEvent::with_content(EventType::Text, "Hello"),
            WebSocketEvent::with_content(EventType::Text, ""),
            WebSocketEvent::new(EventType::Text),
        ];
        let body = encode_websocket_events(&events);
        assert_eq!(body, b"TEXT 5\r\nHello\r\nTEXT 0\r\n\r\nTEXT\r\n");
    }

    #[test]
    fn test_encode_open() {
        let body = encode_websocket_events(&[WebSocketEvent::new(EventType::Open)]);
        assert_eq!(body, b"OPEN\r\n");
    }

    #[test]
    fn test_encode_hex_length_lowercase() {
        let content = "x".repeat(26);
        let body =
            encode_websocket_events(&[WebSocketEvent::with_content(EventType::Text, content)]);
        assert!(body.starts_with(b"TEXT 1a\r\n"));
    }

    #[test]
    fn test_decode_open() {
        let events = decode_websocket_events(&Payload::from("OPEN\r\n")).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::Open);
        assert!(events[0].content.is_none());
    }

    #[test]
    fn test_decode_text_events() {
        let events =
            decode_websocket_events(&Payload::from("TEXT 5\r\nHello\r\nTEXT 0\r\n\r\nTEXT\r\n"))
                .unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].content, Some(Payload::from("Hello")));
        assert_eq!(events[1].content, Some(Payload::from("")));
        assert_eq!(events[2].content, None);
    }

    #[test]
    fn test_decode_content_representation_follows_input() {
        let text = decode_websocket_events(&Payload::from("TEXT 2\r\nhi\r\n")).unwrap();
        assert!(matches!(text[0].content, Some(Payload::Text(_))));

        let bytes =
            decode_websocket_events(&Payload::from(b"TEXT 2\r\nhi\r\n".to_vec())).unwrap();
        assert!(matches!(bytes[0].content, Some(Payload::Bytes(_))));
    }

    #[test]
    fn test_decode_binary_content() {
        let mut body = b"BINARY 3\r\n".to_vec();
        body.extend_from_slice(&[0, 159, 255]);
        body.extend_from_slice(b"\r\n");

        let events = decode_websocket_events(&Payload::Bytes(body)).unwrap();
        assert_eq!(events[0].event_type, EventType::Binary);
        assert_eq!(events[0].content, Some(Payload::Bytes(vec![0, 159, 255])));
    }

    #[test]
    fn test_decode_missing_header_terminator() {
        assert!(matches!(
            decode_websocket_events(&Payload::from("TEXT 5")),
            Err(GripError::BadEventFormat)
        ));
    }

    #[test]
    fn test_decode_length_past_buffer_end() {
        assert!(matches!(
            decode_websocket_events(&Payload::from("TEXT ff\r\nhi\r\n")),
            Err(GripError::BadEventFormat)
        ));
    }

    #[test]
    fn test_decode_unknown_type() {
        assert!(matches!(
            decode_websocket_events(&Payload::from("NOPE\r\n")),
            Err(GripError::BadEventFormat)
        ));
    }

    #[test]
    fn test_decode_bad_hex_length() {
        assert!(matches!(
            decode_websocket_events(&Payload::from("TEXT zz\r\nhi\r\n")),
            Err(GripError::BadEventFormat)
        ));
    }

    #[test]
    fn test_roundtrip() {
        let events = vec![
            WebSocketEvent::new(EventType::Open),
            WebSocketEvent::with_content(EventType::Text, "one"),
            WebSocketEvent::with_content(EventType::Binary, vec![1u8, 2]),
            WebSocketEvent::new(EventType::Ping),
            WebSocketEvent::with_content(EventType::Close, vec![0x03u8, 0xE8]),
        ];
        let body = encode_websocket_events(&events);
        let decoded = decode_websocket_events(&Payload::Bytes(body)).unwrap();

        assert_eq!(decoded.len(), events.len());
        for (decoded, original) in decoded.iter().zip(&events) {
            assert_eq!(decoded.event_type, original.event_type);
            assert_eq!(
                decoded.content.as_ref().map(|c| c.as_bytes().to_vec()),
                original.content.as_ref().map(|c| c.as_bytes().to_vec())
            );
        }
    }

    #[test]
    fn test_control_message() {
        let msg = create_websocket_control_message("detach", None).unwrap();
        assert_eq!(msg, r#"{"type":"detach"}"#);

        let args = serde_json::json!({ "channel": "chan" });
        let msg = create_websocket_control_message("subscribe", Some(&args)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(value["type"], "subscribe");
        assert_eq!(value["channel"], "chan");
    }
}
