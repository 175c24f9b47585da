//! The `transport` module carries the relay over WebSockets.
//!
//! It defines the packets the relay sends on its own behalf, the two-frame
//! identification handshake, and the server that binds connections to the
//! broker.

pub mod handshake;
pub mod message;
pub mod websocket;

pub use handshake::Handshake;
pub use message::ServerPacket;
pub use websocket::{serve, start_websocket_server};

#[cfg(test)]
mod tests;
