//! Codec and connection error types.

use thiserror::Error;

/// Errors that can occur while framing or transporting TDS packets.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The packet header failed basic validation.
    #[error("invalid packet header")]
    InvalidHeader,

    /// A packet exceeded the configured maximum size.
    #[error("packet too large: {size} bytes (max {max})")]
    PacketTooLarge {
        /// Size of the oversized packet.
        size: usize,
        /// Maximum allowed packet size.
        max: usize,
    },

    /// The connection closed mid-message.
    #[error("connection closed with a partial message buffered")]
    ConnectionClosed,

    /// A blocking read or write did not complete before its deadline.
    #[error("operation timed out")]
    Timeout,

    /// Lower-level protocol decode error (bad header fields, unknown status, etc).
    #[error("protocol error: {0}")]
    Protocol(#[from] tds_protocol::ProtocolError),

    /// Underlying transport I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
