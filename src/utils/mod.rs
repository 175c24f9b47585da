//! The `utils` module provides shared definitions used across the relay:
//! the error types each layer reports, and logging initialisation.

pub mod error;
pub mod logging;

pub use error::{DeliveryError, EnvelopeError, HandshakeError, StoreError};

#[cfg(test)]
mod tests {
    use super::logging;

    #[test]
    fn logging_init_accepts_levels() {
        // Repeated initialisation must not panic.
        logging::init("info");
        logging::init("debug");
        logging::init("warning");
        logging::init("not-a-level");
    }

    #[test]
    fn parse_level_falls_back_to_info() {
        assert_eq!(logging::parse_level("TRACE"), tracing::Level::TRACE);
        assert_eq!(logging::parse_level("warn"), tracing::Level::WARN);
        assert_eq!(logging::parse_level("bogus"), tracing::Level::INFO);
    }
}
