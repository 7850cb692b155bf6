mod channel;
mod format;
mod item;
mod payload;

pub use channel::Channel;
pub use format::{Format, HttpResponseFormat, HttpStreamFormat, WebSocketMessageFormat};
pub use item::Item;
pub use payload::Payload;
