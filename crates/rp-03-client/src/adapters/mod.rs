//! Transport adapters.

pub mod channel;
pub mod ws;

pub use channel::{ChannelConnector, ServerEnd};
pub use ws::WsConnector;
