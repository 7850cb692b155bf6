//! Per-connection WebSocket-over-HTTP context
//!
//! One [`WebSocketContext`] is built per inbound request from the decoded
//! event body and the `Connection-Id` / `Meta-*` headers, consumed by
//! application logic, then serialized back into a response body and
//! headers. It is single-use and not safe for concurrent mutation; the
//! logical session lives in the proxy, not here.

use std::collections::HashMap;

use serde_json::json;

use super::events::{
    EventType, WebSocketEvent, create_websocket_control_message, encode_websocket_events,
};
use crate::error::{GripError, Result};
use crate::models::Payload;

#[derive(Debug)]
pub struct WebSocketContext {
    id: String,
    /// Connection metadata, mutable; diffed against the original on
    /// serialization to produce `Set-Meta-*` headers
    pub meta: HashMap<String, String>,
    orig_meta: HashMap<String, String>,
    in_events: Vec<WebSocketEvent>,
    read_index: usize,
    accepted: bool,
    closed: bool,
    close_code: Option<u16>,
    out_close_code: u16,
    out_events: Vec<WebSocketEvent>,
    prefix: String,
}

impl WebSocketContext {
    pub fn new(
        id: impl Into<String>,
        meta: HashMap<String, String>,
        in_events: Vec<WebSocketEvent>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            orig_meta: meta.clone(),
            meta,
            in_events,
            read_index: 0,
            accepted: false,
            closed: false,
            close_code: None,
            out_close_code: 0,
            out_events: Vec::new(),
            prefix: prefix.into(),
        }
    }

    /// Connection id assigned by the proxy
    pub fn id(&self) -> &str {
        &self.id
    }

    /// True when this request opens the connection (first event is OPEN)
    pub fn is_opening(&self) -> bool {
        matches!(
            self.in_events.first(),
            Some(event) if event.event_type == EventType::Open
        )
    }

    /// Accept the connection; reflected only in the emitted headers
    pub fn accept(&mut self) {
        self.accepted = true;
    }

    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    /// Close the connection with the given close code
    pub fn close(&mut self, code: u16) {
        self.closed = true;
        self.out_close_code = code;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close code received from the peer, when a CLOSE event carried one
    pub fn close_code(&self) -> Option<u16> {
        self.close_code
    }

    /// True when the unread part of the queue still holds a readable event
    /// (TEXT, BINARY, CLOSE, or DISCONNECT; PING does not count)
    pub fn can_recv(&self) -> bool {
        self.in_events[self.read_index..].iter().any(|event| {
            matches!(
                event.event_type,
                EventType::Text | EventType::Binary | EventType::Close | EventType::Disconnect
            )
        })
    }

    /// Read the next message, stringifying binary content
    pub fn recv(&mut self) -> Result<Option<String>> {
        Ok(self.recv_raw()?.map(Payload::into_text))
    }

    /// Read the next message with its original representation.
    ///
    /// Advances past PING events, queueing a PONG reply for each. Returns
    /// `Some` content for TEXT/BINARY, `None` for CLOSE (recording a 2-byte
    /// big-endian close code when present). Fails with
    /// [`GripError::ReadBeyondEnd`] when the queue is exhausted and
    /// [`GripError::Disconnected`] on a DISCONNECT event.
    pub fn recv_raw(&mut self) -> Result<Option<Payload>> {
        loop {
            let event = self
                .in_events
                .get(self.read_index)
                .ok_or(GripError::ReadBeyondEnd)?
                .clone();
            self.read_index += 1;

            match event.event_type {
                EventType::Text => {
                    return Ok(Some(event.content.unwrap_or_else(|| Payload::from(""))));
                }
                EventType::Binary => {
                    return Ok(Some(
                        event.content.unwrap_or_else(|| Payload::Bytes(Vec::new())),
                    ));
                }
                EventType::Close => {
                    if let Some(content) = &event.content {
                        let bytes = content.as_bytes();
                        if bytes.len() == 2 {
                            self.close_code =
                                Some(u16::from_be_bytes([bytes[0], bytes[1]]));
                        }
                    }
                    self.closed = true;
                    return Ok(None);
                }
                EventType::Disconnect => return Err(GripError::Disconnected),
                EventType::Ping => {
                    self.out_events.push(WebSocketEvent::new(EventType::Pong));
                }
                EventType::Open | EventType::Pong => {}
            }
        }
    }

    /// Queue an outgoing text message
    pub fn send(&mut self, message: &str) {
        self.out_events.push(WebSocketEvent::with_content(
            EventType::Text,
            format!("m:{}", message),
        ));
    }

    /// Queue an outgoing binary message
    pub fn send_binary(&mut self, message: &[u8]) {
        let mut content = b"m:".to_vec();
        content.extend_from_slice(message);
        self.out_events
            .push(WebSocketEvent::with_content(EventType::Binary, content));
    }

    /// Queue a raw control message body (serialized JSON, without the `c:`
    /// prefix)
    pub fn send_control(&mut self, message: &str) {
        self.out_events.push(WebSocketEvent::with_content(
            EventType::Text,
            format!("c:{}", message),
        ));
    }

    /// Subscribe this connection to a channel (the context prefix is
    /// prepended to the channel name)
    pub fn subscribe(&mut self, channel: &str) -> Result<()> {
        let args = json!({ "channel": format!("{}{}", self.prefix, channel) });
        let message = create_websocket_control_message("subscribe", Some(&args))?;
        self.send_control(&message);
        Ok(())
    }

    /// Unsubscribe this connection from a channel
    pub fn unsubscribe(&mut self, channel: &str) -> Result<()> {
        let args = json!({ "channel": format!("{}{}", self.prefix, channel) });
        let message = create_websocket_control_message("unsubscribe", Some(&args))?;
        self.send_control(&message);
        Ok(())
    }

    /// Detach the connection from this origin: the proxy keeps the client
    /// connection but stops relaying to us
    pub fn detach(&mut self) -> Result<()> {
        let message = create_websocket_control_message("detach", None)?;
        self.send_control(&message);
        Ok(())
    }

    /// Queue a DISCONNECT event
    pub fn disconnect(&mut self) {
        self.out_events
            .push(WebSocketEvent::new(EventType::Disconnect));
    }

    /// Materialize the outgoing event list: OPEN (if accepted), buffered
    /// events, then CLOSE with the 2-byte big-endian close code (if closed)
    pub fn get_outgoing_events(&self) -> Vec<WebSocketEvent> {
        let mut events = Vec::new();
        if self.accepted {
            events.push(WebSocketEvent::new(EventType::Open));
        }
        events.extend(self.out_events.iter().cloned());
        if self.closed {
            events.push(WebSocketEvent::with_content(
                EventType::Close,
                self.out_close_code.to_be_bytes().to_vec(),
            ));
        }
        events
    }

    /// Encode the outgoing events into a response body
    pub fn get_outgoing_body(&self) -> Vec<u8> {
        encode_websocket_events(&self.get_outgoing_events())
    }

    /// Response headers: `Set-Meta-*` entries for the diff between the
    /// original and current meta (empty value = delete), the grip
    /// extension marker when accepted, and the events content type
    pub fn to_headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::new();

        // Keys removed from the meta map
        for name in self.orig_meta.keys() {
            if !self
                .meta
                .keys()
                .any(|k| k.eq_ignore_ascii_case(name))
            {
                headers.push((format!("Set-Meta-{}", name), String::new()));
            }
        }

        // Keys added or changed
        for (name, value) in &self.meta {
            let unchanged = self
                .orig_meta
                .iter()
                .any(|(k, v)| k.eq_ignore_ascii_case(name) && v == value);
            if !unchanged {
                headers.push((format!("Set-Meta-{}", name), value.clone()));
            }
        }

        if self.accepted {
            headers.push((
                "Sec-WebSocket-Extensions".to_string(),
                "grip".to_string(),
            ));
        }
        headers.push((
            "Content-Type".to_string(),
            "application/websocket-events".to_string(),
        ));

        headers
    }
}
