//! WebSocket frame parsing and serialization (RFC 6455).
//!
//! Frames are built and taken apart here without any I/O; the async codec in
//! [`crate::codec`] feeds bytes from the transport through these functions.

use bytes::{BufMut, BytesMut};

use crate::error::{Error, Result};
use crate::protocol::OpCode;
use crate::protocol::mask::{MASK_LEN, apply_mask_fast};

/// Maximum payload size for control frames (RFC 6455).
pub const MAX_CONTROL_FRAME_PAYLOAD: usize = 125;

/// Largest length the 64-bit extended field may carry (the top bit must be 0).
pub const MAX_PAYLOAD_LEN: u64 = i64::MAX as u64;

const FIN_BIT: u8 = 0x80;
const MASK_BIT: u8 = 0x80;
const OPCODE_MASK: u8 = 0x0F;
const LEN_MASK: u8 = 0x7F;
const LEN_16: u8 = 126;
const LEN_64: u8 = 127;

/// Encoding used for the payload length field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthTier {
    /// 0..=125, stored in the 7-bit field.
    Inline,
    /// 126..=65535, 16-bit big-endian extension.
    Extended16,
    /// 65536 and above, 64-bit big-endian extension.
    Extended64,
}

impl LengthTier {
    /// Select the tier for a payload length.
    #[must_use]
    pub const fn for_len(len: usize) -> Self {
        if len < LEN_16 as usize {
            LengthTier::Inline
        } else if len <= u16::MAX as usize {
            LengthTier::Extended16
        } else {
            LengthTier::Extended64
        }
    }

    /// Bytes the extended length field occupies after the 2-byte base header.
    #[must_use]
    pub const fn extension_len(self) -> usize {
        match self {
            LengthTier::Inline => 0,
            LengthTier::Extended16 => 2,
            LengthTier::Extended64 => 8,
        }
    }

    /// Tier announced by the 7-bit length field of a received header.
    #[must_use]
    pub const fn from_base_len(base: u8) -> Self {
        match base & LEN_MASK {
            LEN_16 => LengthTier::Extended16,
            LEN_64 => LengthTier::Extended64,
            _ => LengthTier::Inline,
        }
    }
}

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Final fragment flag.
    pub fin: bool,
    /// Frame opcode.
    pub opcode: OpCode,
    /// Masking key, if the mask bit was set.
    pub mask: Option<[u8; MASK_LEN]>,
    /// Announced payload length.
    pub payload_len: u64,
    /// Total header size in bytes, including extended length and mask key.
    pub header_len: usize,
}

impl FrameHeader {
    /// Full header size implied by the second header byte.
    #[must_use]
    pub const fn len_from_base(byte1: u8) -> usize {
        let mask_len = if byte1 & MASK_BIT != 0 { MASK_LEN } else { 0 };
        2 + LengthTier::from_base_len(byte1).extension_len() + mask_len
    }

    /// Parse a header from the front of `buf`.
    ///
    /// # Errors
    ///
    /// - `Error::IncompleteFrame` if `buf` ends inside the header
    /// - `Error::UnsupportedFrame` if the opcode is outside the RFC 6455 table
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < 2 {
            return Err(Error::IncompleteFrame {
                needed: 2 - buf.len(),
            });
        }

        let byte0 = buf[0];
        let byte1 = buf[1];

        let header_len = Self::len_from_base(byte1);
        if buf.len() < header_len {
            return Err(Error::IncompleteFrame {
                needed: header_len - buf.len(),
            });
        }

        let fin = byte0 & FIN_BIT != 0;
        let opcode = OpCode::try_from(byte0 & OPCODE_MASK)?;
        let masked = byte1 & MASK_BIT != 0;

        let tier = LengthTier::from_base_len(byte1);
        let payload_len = match tier {
            LengthTier::Inline => u64::from(byte1 & LEN_MASK),
            LengthTier::Extended16 => u64::from(u16::from_be_bytes([buf[2], buf[3]])),
            LengthTier::Extended64 => {
                let mut len = [0u8; 8];
                len.copy_from_slice(&buf[2..10]);
                u64::from_be_bytes(len)
            }
        };

        let mask = if masked {
            let offset = 2 + tier.extension_len();
            let mut key = [0u8; MASK_LEN];
            key.copy_from_slice(&buf[offset..offset + MASK_LEN]);
            Some(key)
        } else {
            None
        };

        Ok(Self {
            fin,
            opcode,
            mask,
            payload_len,
            header_len,
        })
    }

    /// Payload length as `usize`, bounded by `max`.
    ///
    /// # Errors
    ///
    /// Returns `Error::PayloadTooLarge` if the announced length exceeds `max`
    /// or does not fit the platform's address space.
    pub fn checked_payload_len(&self, max: usize) -> Result<usize> {
        let too_large = || Error::PayloadTooLarge {
            size: self.payload_len,
            max,
        };
        let len = usize::try_from(self.payload_len).map_err(|_| too_large())?;
        if len > max {
            return Err(too_large());
        }
        Ok(len)
    }
}

/// A WebSocket frame as defined in RFC 6455.
///
/// ## Frame Structure
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |F|R|R|R| opcode |M| Payload len |    Extended payload length    |
/// |I|S|S|S|  (4)   |A|     (7)     |             (16/64)           |
/// |N|V|V|V|       |S|             |   (if payload len==126/127)   |
/// | |1|2|3|       |K|             |                               |
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |                         Masking key (if present)              |
/// +---------------------------------------------------------------+
/// |                     Payload data                              |
/// +---------------------------------------------------------------+
/// ```
///
/// Reserved bits are neither set on encode nor checked on decode; no
/// extensions are negotiated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Final fragment flag. True if this is the last fragment of a message.
    pub fin: bool,
    /// Frame opcode defining the interpretation of payload data.
    pub opcode: OpCode,
    payload: Vec<u8>,
}

impl Frame {
    /// Create a new frame with the given parameters.
    #[must_use]
    pub fn new(fin: bool, opcode: OpCode, payload: Vec<u8>) -> Self {
        Self {
            fin,
            opcode,
            payload,
        }
    }

    /// Create a text frame.
    #[must_use]
    pub fn text(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Text, data.into())
    }

    /// Create a binary frame.
    #[must_use]
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Binary, data.into())
    }

    /// Create a close frame with optional status code and reason.
    #[must_use]
    pub fn close(code: Option<u16>, reason: &str) -> Self {
        let payload = if let Some(code) = code {
            let mut data = code.to_be_bytes().to_vec();
            data.extend_from_slice(reason.as_bytes());
            data
        } else {
            Vec::new()
        };
        Self::new(true, OpCode::Close, payload)
    }

    /// Create a ping frame.
    #[must_use]
    pub fn ping(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Ping, data.into())
    }

    /// Create a pong frame.
    #[must_use]
    pub fn pong(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Pong, data.into())
    }

    /// Get the payload bytes.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Take ownership of the payload.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Length tier this frame's payload is encoded with.
    #[must_use]
    pub fn length_tier(&self) -> LengthTier {
        LengthTier::for_len(self.payload.len())
    }

    /// Parse a frame from a buffer, unmasking the payload if needed.
    ///
    /// Returns the parsed frame and the number of bytes consumed.
    ///
    /// ## Errors
    ///
    /// - `Error::IncompleteFrame` if not enough data is available
    /// - `Error::UnsupportedFrame` for reserved opcodes
    /// - `Error::PayloadTooLarge` if the length does not fit in memory
    #[inline]
    pub fn parse(buf: &[u8]) -> Result<(Self, usize)> {
        Self::parse_with_limit(buf, usize::MAX)
    }

    /// Parse a frame, rejecting payloads longer than `max_payload`.
    ///
    /// The length check runs before any payload is copied.
    ///
    /// ## Errors
    ///
    /// As [`Frame::parse`], with `Error::PayloadTooLarge` for lengths above
    /// `max_payload`.
    pub fn parse_with_limit(buf: &[u8], max_payload: usize) -> Result<(Self, usize)> {
        let header = FrameHeader::parse(buf)?;
        let payload_len = header.checked_payload_len(max_payload)?;

        let total_size = header
            .header_len
            .checked_add(payload_len)
            .ok_or(Error::PayloadTooLarge {
                size: header.payload_len,
                max: max_payload,
            })?;

        if buf.len() < total_size {
            return Err(Error::IncompleteFrame {
                needed: total_size - buf.len(),
            });
        }

        let mut payload = buf[header.header_len..total_size].to_vec();
        if let Some(mask) = header.mask {
            apply_mask_fast(&mut payload, mask);
        }

        Ok((Self::new(header.fin, header.opcode, payload), total_size))
    }

    /// Check control-frame constraints.
    ///
    /// # Errors
    ///
    /// Returns `Error::FrameTooLarge` if a control frame carries more than
    /// 125 bytes, and `Error::UnsupportedFrame` if it is fragmented.
    pub fn validate(&self) -> Result<()> {
        if self.opcode.is_control() {
            if !self.fin {
                return Err(Error::UnsupportedFrame(self.opcode.as_u8()));
            }
            if self.payload.len() > MAX_CONTROL_FRAME_PAYLOAD {
                return Err(Error::FrameTooLarge {
                    size: self.payload.len(),
                    max: MAX_CONTROL_FRAME_PAYLOAD,
                });
            }
        }
        Ok(())
    }

    /// Total encoded size of this frame.
    #[must_use]
    pub fn wire_size(&self, masked: bool) -> usize {
        let mask_len = if masked { MASK_LEN } else { 0 };
        2 + self.length_tier().extension_len() + mask_len + self.payload.len()
    }

    /// Append the encoded frame to `dst`.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns `Error::FrameTooLarge` if the payload length cannot be
    /// represented in the 64-bit length field.
    pub fn write(&self, dst: &mut BytesMut, mask: Option<[u8; MASK_LEN]>) -> Result<usize> {
        let payload_len = self.payload.len();
        if payload_len as u64 > MAX_PAYLOAD_LEN {
            return Err(Error::FrameTooLarge {
                size: payload_len,
                max: usize::try_from(MAX_PAYLOAD_LEN).unwrap_or(usize::MAX),
            });
        }

        let wire_size = self.wire_size(mask.is_some());
        dst.reserve(wire_size);

        let mut byte0 = self.opcode.as_u8();
        if self.fin {
            byte0 |= FIN_BIT;
        }
        let mask_bit = if mask.is_some() { MASK_BIT } else { 0 };

        dst.put_u8(byte0);
        match self.length_tier() {
            LengthTier::Inline => dst.put_u8(mask_bit | payload_len as u8),
            LengthTier::Extended16 => {
                dst.put_u8(mask_bit | LEN_16);
                dst.put_u16(payload_len as u16);
            }
            LengthTier::Extended64 => {
                dst.put_u8(mask_bit | LEN_64);
                dst.put_u64(payload_len as u64);
            }
        }

        if let Some(mask) = mask {
            dst.put_slice(&mask);
            let start = dst.len();
            dst.put_slice(&self.payload);
            apply_mask_fast(&mut dst[start..], mask);
        } else {
            dst.put_slice(&self.payload);
        }

        Ok(wire_size)
    }
}
