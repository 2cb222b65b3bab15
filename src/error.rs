//! Error types for the olcb crate.

use thiserror::Error;

use crate::protocol::EventId;

/// Main error type for all olcb operations.
///
/// Callers are expected to match on the variant, never on message text.
#[derive(Debug, Error)]
pub enum OlcbError {
    /// Input cannot be coerced to the required fixed width or range.
    #[error("invalid encoding: could not be read as {expected} bytes")]
    InvalidEncoding {
        /// Width the input was expected to fit.
        expected: usize,
    },

    /// A required address component (full id or alias) is absent.
    #[error("address has no {0} set")]
    MissingField(&'static str),

    /// A CAN header was requested for a message with no source address.
    #[error("no source node set")]
    MissingSource,

    /// An addressed MTI was encoded without a destination.
    #[error("destination address not provided")]
    MissingDestination,

    /// A decoded CAN header does not match any registered MTI.
    #[error("unknown MTI: {0:#06x}")]
    UnknownMti(u16),

    /// A consumer is already registered for this event id.
    #[error("consumer already registered for event {0}")]
    AlreadyRegistered(EventId),

    /// No consumer is registered for this event id.
    #[error("consumer not registered for event {0}")]
    NotRegistered(EventId),

    /// A middle or last datagram fragment arrived with no open
    /// reassembly entry for its source alias.
    #[error("unexpected datagram fragment from alias {source_alias:#05x}")]
    UnexpectedFragment {
        /// Alias of the peer the stray fragment came from.
        source_alias: u16,
    },

    /// A send was attempted with zero attached transports.
    #[error("no transports to send message on")]
    NoTransport,

    /// I/O error surfaced by a transport implementation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using OlcbError.
pub type Result<T> = std::result::Result<T, OlcbError>;
