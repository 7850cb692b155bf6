//! GRIP proxy control library
//!
//! This crate implements the client side of GRIP (Generic Realtime
//! Intermediary Protocol): detecting whether a request arrived through a
//! trusted GRIP proxy, emitting hold instructions that keep long-poll,
//! stream, and WebSocket-over-HTTP connections open, and publishing items
//! to one or more proxy control endpoints.
//!
//! It deliberately stops at the protocol layer: HTTP serving, request
//! adapters, and retry policy belong to the caller.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod hold;
pub mod instruct;
pub mod keys;
pub mod models;
pub mod publisher;
pub mod ws;

// Re-export commonly used types for convenience
pub use auth::Auth;
pub use client::{HttpTransport, PublisherClient, Transport, TransportResponse, VerifyComponents};
pub use config::{GripConfig, parse_grip_uri, parse_grip_uri_with_defaults};
pub use error::{GripError, PublishError, Result};
pub use hold::{
    HoldMode, create_grip_channel_header, create_hold, create_hold_response, create_hold_stream,
};
pub use instruct::GripInstruct;
pub use keys::{Key, KeyInput, PemKeyKind, load_key};
pub use models::{
    Channel, Format, HttpResponseFormat, HttpStreamFormat, Item, Payload, WebSocketMessageFormat,
};
pub use publisher::{GripSigResult, Publisher};
pub use ws::{
    EventType, WebSocketContext, WebSocketEvent, create_websocket_control_message,
    decode_websocket_events, encode_websocket_events,
};
