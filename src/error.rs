//! Error types for the WebSocket client engine.
//!
//! Every failure the client can report is a variant of [`Error`]. Protocol
//! integrity violations (unsupported frames, oversize payloads, bad UTF-8)
//! always leave the connection closed; local faults such as
//! [`Error::TypeMismatch`] do not touch connection state.

use thiserror::Error;

/// Result type alias for WebSocket operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during WebSocket operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The target string does not match `ws[s]://host[:port][/path]`.
    #[error("Malformed URI: {0}")]
    MalformedUri(String),

    /// The URI scheme is neither `ws` nor `wss`.
    #[error("Scheme {0} is invalid")]
    InvalidScheme(String),

    /// Transport failure (connect, read or write).
    #[error("I/O error: {0}")]
    Io(String),

    /// TLS setup or negotiation failure.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The server answered the upgrade request with something other than 101.
    #[error("Handshake rejected: {0}")]
    HandshakeRejected(String),

    /// Response headers exceeded the configured maximum.
    #[error("Handshake too large: {size} bytes (max: {max})")]
    HandshakeTooLarge {
        /// Bytes received so far.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// `Sec-WebSocket-Accept` did not match the key we sent.
    #[error("Invalid Sec-WebSocket-Accept: expected {expected}, got {actual}")]
    InvalidAcceptKey {
        /// Value derived from our nonce.
        expected: String,
        /// Value the server sent, empty when absent.
        actual: String,
    },

    /// A caller-supplied header would break the request framing.
    #[error("Invalid header value for {header}: {reason}")]
    InvalidHeaderValue {
        /// Header name.
        header: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Continuation frame or an opcode outside the RFC 6455 table.
    #[error("Unsupported frame: opcode {0:#x}")]
    UnsupportedFrame(u8),

    /// Incoming payload is larger than this client is willing to buffer.
    #[error("Payload too large: {size} bytes (max: {max})")]
    PayloadTooLarge {
        /// Length announced in the frame header.
        size: u64,
        /// Maximum accepted payload length.
        max: usize,
    },

    /// Outgoing payload cannot be represented in a frame header.
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge {
        /// Payload length.
        size: usize,
        /// Maximum encodable length.
        max: usize,
    },

    /// Invalid UTF-8 in a text frame.
    #[error("Invalid UTF-8 in text frame")]
    InvalidUtf8,

    /// `send` was handed a message that is neither text nor binary.
    #[error("Cannot send {0} message as data")]
    TypeMismatch(&'static str),

    /// Buffer ends before the frame does.
    #[error("Incomplete frame: need {needed} more bytes")]
    IncompleteFrame {
        /// Number of additional bytes needed.
        needed: usize,
    },
}

impl Error {
    /// Whether this error means the peer broke the framing contract.
    ///
    /// These are never retried on the same session.
    #[must_use]
    pub const fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedFrame(_) | Error::PayloadTooLarge { .. } | Error::InvalidUtf8
        )
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

impl From<std::string::FromUtf8Error> for Error {
    fn from(_: std::string::FromUtf8Error) -> Self {
        Error::InvalidUtf8
    }
}
