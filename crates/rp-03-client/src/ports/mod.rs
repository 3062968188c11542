//! Client ports.

pub mod transport;

pub use transport::{Connector, Transport, TransportError};
