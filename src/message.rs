//! Messages exchanged with the application, and close-frame payloads.

use std::fmt;

use crate::error::{Error, Result};
use crate::protocol::OpCode;

/// Status code carried by a close frame (RFC 6455 section 7.4).
///
/// The client only emits [`CloseCode::MESSAGE_TOO_BIG`] on its own; the rest
/// are available to callers of `close_with`. Unknown codes are kept as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CloseCode(u16);

impl CloseCode {
    pub const NORMAL: CloseCode = CloseCode(1000);
    pub const GOING_AWAY: CloseCode = CloseCode(1001);
    pub const PROTOCOL_ERROR: CloseCode = CloseCode(1002);
    pub const UNSUPPORTED_DATA: CloseCode = CloseCode(1003);
    pub const INVALID_PAYLOAD: CloseCode = CloseCode(1007);
    pub const POLICY_VIOLATION: CloseCode = CloseCode(1008);
    pub const MESSAGE_TOO_BIG: CloseCode = CloseCode(1009);
    pub const MANDATORY_EXTENSION: CloseCode = CloseCode(1010);
    pub const INTERNAL_ERROR: CloseCode = CloseCode(1011);

    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Short description for the codes defined by RFC 6455.
    #[must_use]
    pub const fn description(self) -> Option<&'static str> {
        Some(match self.0 {
            1000 => "normal closure",
            1001 => "going away",
            1002 => "protocol error",
            1003 => "unsupported data",
            1007 => "invalid payload data",
            1008 => "policy violation",
            1009 => "message too big",
            1010 => "mandatory extension",
            1011 => "internal error",
            _ => return None,
        })
    }
}

impl Default for CloseCode {
    fn default() -> Self {
        CloseCode::NORMAL
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        CloseCode(code)
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.0
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.description() {
            Some(text) => write!(f, "{} ({text})", self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Decoded close frame payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    pub code: CloseCode,
    pub reason: String,
}

impl CloseFrame {
    #[must_use]
    pub fn new(code: CloseCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Decode the payload of a received close frame.
    ///
    /// An empty payload carries no status. A one-byte payload or a reason that
    /// is not UTF-8 is reported as a protocol error rather than failing, so a
    /// sloppy peer still gets a clean shutdown.
    #[must_use]
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        match payload {
            [] => None,
            [_] => Some(Self::new(CloseCode::PROTOCOL_ERROR, "truncated close code")),
            [hi, lo, reason @ ..] => {
                let code = CloseCode::from(u16::from_be_bytes([*hi, *lo]));
                Some(match std::str::from_utf8(reason) {
                    Ok(reason) => Self::new(code, reason),
                    Err(_) => Self::new(CloseCode::INVALID_PAYLOAD, ""),
                })
            }
        }
    }
}

/// Application-level message.
///
/// [`recv`](crate::WebSocketClient::recv) only ever yields `Text` and
/// `Binary`; control frames are handled inside the read loop. The control
/// variants exist so a caller handing one to `send` gets a typed error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close(Option<CloseFrame>),
}

impl Message {
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Message::Text(s.into())
    }

    #[must_use]
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Message::Binary(data.into())
    }

    /// Variant name, used in diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Message::Text(_) => "Text",
            Message::Binary(_) => "Binary",
            Message::Ping(_) => "Ping",
            Message::Pong(_) => "Pong",
            Message::Close(_) => "Close",
        }
    }

    /// Text payload, if this is a text message.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let Message::Text(text) = self {
            Some(text)
        } else {
            None
        }
    }

    /// Classify a data message into its frame opcode and payload bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::TypeMismatch` for control messages.
    pub fn into_data_frame(self) -> Result<(OpCode, Vec<u8>)> {
        match self {
            Message::Text(text) => Ok((OpCode::Text, text.into_bytes())),
            Message::Binary(data) => Ok((OpCode::Binary, data)),
            other => Err(Error::TypeMismatch(other.kind())),
        }
    }

    /// Build a data message from a decoded frame payload.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidUtf8` if a text payload is not valid UTF-8
    /// - `Error::UnsupportedFrame` for any non-data opcode
    pub fn from_data_frame(opcode: OpCode, payload: Vec<u8>) -> Result<Self> {
        match opcode {
            OpCode::Text => Ok(Message::Text(String::from_utf8(payload)?)),
            OpCode::Binary => Ok(Message::Binary(payload)),
            other => Err(Error::UnsupportedFrame(other.as_u8())),
        }
    }
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Message::Text(s)
    }
}

impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Message::Text(s.to_owned())
    }
}

impl From<Vec<u8>> for Message {
    fn from(data: Vec<u8>) -> Self {
        Message::Binary(data)
    }
}

impl From<&[u8]> for Message {
    fn from(data: &[u8]) -> Self {
        Message::Binary(data.to_vec())
    }
}
