//! The `client` module defines the relay-side view of a connected client.
//!
//! It provides the `Subscriber` struct, which holds the client's identity,
//! its bound topic, and the mailbox used to push frames to it.

pub mod subscriber;
pub use subscriber::{Evictor, Identity, Subscriber, SubscriberId};

#[cfg(test)]
mod tests;
