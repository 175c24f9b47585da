//! # blindrelay
//!
//! `blindrelay` is a blind WebSocket relay for end-to-end-encrypted group
//! chat. Clients join a topic, exchange opaque `tag:payload` envelopes, get
//! the topic's stored ciphertext replayed when they join, and see a live
//! roster of who else is present. The relay never decrypts anything.
//!
//! ## Core Modules
//!
//! - `broker`: topic registry, envelope classification, fan-out and presence.
//! - `client`: the subscriber handle and its outbound mailbox.
//! - `config`: loading settings from defaults, a file and the environment.
//! - `persistence`: the `MessageStore` backends and the background persister.
//! - `transport`: the WebSocket server and the two-frame handshake.
//! - `utils`: error types and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod persistence;
pub mod transport;
pub mod utils;
