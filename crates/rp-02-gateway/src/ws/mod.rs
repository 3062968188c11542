//! WebSocket transport: frame loop and outbound writer per connection.

pub mod handler;

pub use handler::serve_connection;
