//! Error types for the Modbus ASCII server transport.
//!
//! Decode failures form a closed enumeration so callers can branch on
//! kind instead of parsing messages. They are recoverable: the
//! ingestion loop discards the offending packet and keeps listening,
//! and they never propagate past it. [`ServerError`] covers the
//! fallible edges of the port lifecycle, opening a serial device and
//! writing a response back.

use thiserror::Error;

/// Result alias for port lifecycle and response writing.
pub type ServerResult<T> = Result<T, ServerError>;

/// Why a received packet was rejected by the frame codec.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// The packet cannot hold the minimum viable frame: address,
    /// function code and checksum.
    #[error("packet too short for an ASCII frame: {len} bytes")]
    FrameTooShort { len: usize },

    /// The span between the start delimiter and the line ending is not
    /// an even run of hex digits.
    #[error("malformed hex payload: {0}")]
    MalformedHex(#[from] hex::FromHexError),

    /// The transmitted LRC disagrees with the one computed over the
    /// decoded payload.
    #[error("LRC mismatch: expected {expected:#04X}, got {got:#04X}")]
    ChecksumMismatch { expected: u8, got: u8 },
}

/// Errors surfaced to callers of the server lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The serial device could not be opened.
    #[error("failed to open serial port {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: tokio_serial::Error,
    },

    /// I/O failure while writing a frame back to a port.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
