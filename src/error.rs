//! Error types for the WebSocket protocol implementation.
//!
//! Every protocol-level variant maps onto the close code a peer must be sent
//! when the connection is failed because of it (RFC 6455 Section 7.4.1).

use thiserror::Error;

use crate::message::CloseCode;

/// Result type alias for WebSocket operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during WebSocket operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Protocol violation detected.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Invalid UTF-8 in a text message or close reason.
    #[error("Invalid UTF-8 in text payload")]
    InvalidUtf8,

    /// A 64-bit payload length with the most significant bit set, or one the
    /// platform cannot address.
    #[error("Invalid payload length: {0:#x}")]
    InvalidPayloadLength(u64),

    /// Frame size exceeds configured maximum.
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge {
        /// Declared frame size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Message size exceeds configured maximum.
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge {
        /// Cumulative message size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Handshake data exceeds configured maximum.
    #[error("Handshake too large: {size} bytes (max: {max})")]
    HandshakeTooLarge {
        /// Actual handshake size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Invalid WebSocket handshake.
    #[error("Invalid handshake: {0}")]
    InvalidHandshake(String),

    /// A header value that cannot be written without breaking the HTTP framing.
    #[error("Invalid value for header {header}: {reason}")]
    InvalidHeaderValue {
        /// Header name.
        header: String,
        /// What is wrong with the value.
        reason: String,
    },

    /// I/O error reported by a byte sink or the random source.
    #[error("I/O error: {0}")]
    Io(String),

    /// Invalid close code.
    #[error("Invalid close code: {0}")]
    InvalidCloseCode(u16),

    /// Reserved opcode used.
    #[error("Reserved opcode: {0:#x}")]
    ReservedOpcode(u8),

    /// Control frame fragmented (RFC violation).
    #[error("Control frames cannot be fragmented")]
    FragmentedControlFrame,

    /// Control frame payload too large (>125 bytes).
    #[error("Control frame payload too large: {0} bytes (max: 125)")]
    ControlFrameTooLarge(usize),

    /// Unmasked client frame (security violation).
    #[error("Client frame must be masked")]
    UnmaskedClientFrame,

    /// Masked server frame (security violation).
    #[error("Server frame must not be masked")]
    MaskedServerFrame,

    /// Reserved bits set without extension.
    #[error("Reserved bits set without negotiated extension")]
    ReservedBitsSet,

    /// Incomplete frame data.
    #[error("Incomplete frame: need {needed} more bytes")]
    IncompleteFrame {
        /// Number of additional bytes needed.
        needed: usize,
    },

    /// Invalid extension offer, response or parameter.
    #[error("Invalid extension: {0}")]
    InvalidExtension(String),

    /// Compressed payload could not be inflated, or deflate failed.
    #[error("Compression error: {0}")]
    Compression(String),

    /// A frame was sent after the local Close frame.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Rejected configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Close code to send when the connection fails with this error.
    #[must_use]
    pub const fn close_code(&self) -> CloseCode {
        match self {
            Error::InvalidUtf8 | Error::Compression(_) => CloseCode::InvalidPayload,
            Error::FrameTooLarge { .. } | Error::MessageTooLarge { .. } => {
                CloseCode::MessageTooBig
            }
            _ => CloseCode::ProtocolError,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_: std::str::Utf8Error) -> Self {
        Error::InvalidUtf8
    }
}

impl From<getrandom::Error> for Error {
    fn from(err: getrandom::Error) -> Self {
        Error::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::FrameTooLarge {
            size: 20_000_000,
            max: 16_000_000,
        };
        assert_eq!(
            err.to_string(),
            "Frame too large: 20000000 bytes (max: 16000000)"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let ws_err: Error = io_err.into();
        assert!(matches!(ws_err, Error::Io(_)));
    }

    #[test]
    fn test_close_code_mapping() {
        assert_eq!(Error::InvalidUtf8.close_code(), CloseCode::InvalidPayload);
        assert_eq!(
            Error::Compression("bad block".into()).close_code(),
            CloseCode::InvalidPayload
        );
        assert_eq!(
            Error::FrameTooLarge { size: 11, max: 10 }.close_code(),
            CloseCode::MessageTooBig
        );
        assert_eq!(
            Error::MessageTooLarge { size: 11, max: 10 }.close_code(),
            CloseCode::MessageTooBig
        );
        assert_eq!(Error::ReservedBitsSet.close_code(), CloseCode::ProtocolError);
        assert_eq!(
            Error::InvalidPayloadLength(u64::MAX).close_code(),
            CloseCode::ProtocolError
        );
        assert_eq!(Error::InvalidCloseCode(1005).close_code(), CloseCode::ProtocolError);
    }

    #[test]
    fn test_error_clone() {
        let err = Error::InvalidUtf8;
        let cloned = err.clone();
        assert_eq!(err, cloned);
    }
}
