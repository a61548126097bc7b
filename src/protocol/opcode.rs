//! Frame opcodes (RFC 6455 section 5.2).

use std::fmt;

use crate::error::Error;

/// Opcode carried in the low nibble of a frame's first byte.
///
/// Only the six opcodes RFC 6455 assigns are representable; `0x3`-`0x7` and
/// `0xB`-`0xF` are reserved and fail to convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// `0x0`. Decoded so it can be reported; the client never reassembles.
    Continuation = 0x0,
    /// `0x1`, UTF-8 payload.
    Text = 0x1,
    /// `0x2`.
    Binary = 0x2,
    /// `0x8`.
    Close = 0x8,
    /// `0x9`.
    Ping = 0x9,
    /// `0xA`.
    Pong = 0xA,
}

impl OpCode {
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Close, ping and pong. These may not be fragmented and carry at most
    /// 125 bytes.
    #[inline]
    #[must_use]
    pub const fn is_control(self) -> bool {
        self.as_u8() & 0x8 != 0
    }
}

impl TryFrom<u8> for OpCode {
    type Error = Error;

    /// Fails with `Error::UnsupportedFrame` for reserved values.
    fn try_from(nibble: u8) -> Result<Self, Self::Error> {
        Ok(match nibble {
            0x0 => OpCode::Continuation,
            0x1 => OpCode::Text,
            0x2 => OpCode::Binary,
            0x8 => OpCode::Close,
            0x9 => OpCode::Ping,
            0xA => OpCode::Pong,
            other => return Err(Error::UnsupportedFrame(other)),
        })
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpCode::Continuation => "continuation",
            OpCode::Text => "text",
            OpCode::Binary => "binary",
            OpCode::Close => "close",
            OpCode::Ping => "ping",
            OpCode::Pong => "pong",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assigned_opcodes_convert_both_ways() {
        for byte in [0x0, 0x1, 0x2, 0x8, 0x9, 0xA] {
            assert_eq!(OpCode::try_from(byte).unwrap().as_u8(), byte);
        }
    }

    #[test]
    fn test_reserved_opcodes_are_unsupported() {
        for reserved in (0x3..=0x7).chain(0xB..=0xF) {
            assert_eq!(
                OpCode::try_from(reserved),
                Err(Error::UnsupportedFrame(reserved))
            );
        }
    }

    #[test]
    fn test_control_split() {
        let control: Vec<OpCode> = [0x0, 0x1, 0x2, 0x8, 0x9, 0xA]
            .into_iter()
            .filter_map(|b| OpCode::try_from(b).ok())
            .filter(|op| op.is_control())
            .collect();
        assert_eq!(control, [OpCode::Close, OpCode::Ping, OpCode::Pong]);
    }

    #[test]
    fn test_display_uses_wire_names() {
        assert_eq!(OpCode::Continuation.to_string(), "continuation");
        assert_eq!(OpCode::Pong.to_string(), "pong");
    }
}
