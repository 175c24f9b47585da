//! The `broker` module holds the relay's core: which subscribers are bound to
//! which topic, how an inbound envelope is validated and fanned out, and how
//! rosters are derived and pushed.

pub mod engine;
pub mod envelope;
pub mod presence;
pub mod registry;
pub mod topic;

pub use engine::{Broker, Membership, Publish};
pub use envelope::{Envelope, EnvelopeKind};
pub use presence::RosterEntry;
pub use registry::Registry;
