mod context;
mod events;

pub use context::WebSocketContext;
pub use events::{
    EventType, WebSocketEvent, create_websocket_control_message, decode_websocket_events,
    encode_websocket_events,
};
