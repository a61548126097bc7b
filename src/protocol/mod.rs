//! WebSocket protocol core implementation (RFC 6455).
//!
//! Everything here works on byte buffers; no I/O.

pub mod frame;
pub mod handshake;
pub mod mask;
pub mod opcode;

pub use frame::{Frame, FrameHeader, LengthTier};
pub use handshake::{ClientRequest, ResponseHeaders, WS_GUID, compute_accept_key};
pub use mask::{apply_mask, apply_mask_fast};
pub use opcode::OpCode;
