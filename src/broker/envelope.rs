//! Envelope classification
//!
//! Clients exchange `tag:payload` strings. The relay never looks inside the
//! tag or the ciphertext; it only checks the shape and whether the payload
//! carries the `presence:` marker.

use crate::utils::EnvelopeError;

/// Marker that makes a payload an ephemeral presence ping.
pub const PRESENCE_PREFIX: &[u8] = b"presence:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    /// Relayed and persisted.
    Regular,
    /// Relayed, never persisted.
    Presence,
}

/// A borrowed view of a well-formed envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope<'a> {
    pub tag: &'a [u8],
    pub payload: &'a [u8],
}

impl<'a> Envelope<'a> {
    /// Split `raw` on its first `:`. Both sides must be non-empty.
    pub fn parse(raw: &'a [u8]) -> Result<Self, EnvelopeError> {
        let split = raw
            .iter()
            .position(|&b| b == b':')
            .ok_or(EnvelopeError::MissingSeparator)?;
        let (tag, payload) = (&raw[..split], &raw[split + 1..]);

        if tag.is_empty() {
            return Err(EnvelopeError::EmptyTag);
        }
        if payload.is_empty() {
            return Err(EnvelopeError::EmptyPayload);
        }
        Ok(Self { tag, payload })
    }

    pub fn kind(&self) -> EnvelopeKind {
        if self.payload.starts_with(PRESENCE_PREFIX) {
            EnvelopeKind::Presence
        } else {
            EnvelopeKind::Regular
        }
    }
}
