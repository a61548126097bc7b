//! WebSocket codec for async I/O.
//!
//! This module provides frame-level encoding/decoding over the two halves of
//! a split stream.

mod reader;
mod writer;

pub use reader::FrameReader;
pub use writer::FrameWriter;
