use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use crate::config::Limits;
use crate::error::{Error, Result};
use crate::protocol::Frame;

/// Read half of a session: handshake lines, then frames.
///
/// One buffer serves both phases, so frame bytes that arrive in the same
/// segment as the end of the handshake response are kept.
pub struct FrameReader<R> {
    io: R,
    buf: BytesMut,
    chunk_size: usize,
    max_frame_size: usize,
}

impl<R> FrameReader<R> {
    #[must_use]
    pub fn new(io: R, read_buffer_size: usize, limits: &Limits) -> Self {
        let chunk_size = read_buffer_size.max(64);
        Self {
            io,
            buf: BytesMut::with_capacity(chunk_size),
            chunk_size,
            max_frame_size: limits.max_frame_size,
        }
    }

    /// Bytes received but not yet decoded.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn get_ref(&self) -> &R {
        &self.io
    }

    #[must_use]
    pub fn into_inner(self) -> R {
        self.io
    }
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Pull more bytes from the transport. Returns `false` at end of stream.
    async fn fill(&mut self) -> Result<bool> {
        if self.buf.capacity() == self.buf.len() {
            self.buf.reserve(self.chunk_size);
        }
        let n = self.io.read_buf(&mut self.buf).await?;
        trace!(bytes = n, buffered = self.buf.len(), "transport read");
        Ok(n > 0)
    }

    /// Read one CRLF- or LF-terminated line, without the terminator.
    ///
    /// # Errors
    ///
    /// - `Error::HandshakeTooLarge` if no line ending shows up within `max_len` bytes
    /// - `Error::Io` if the stream ends first
    pub async fn read_line(&mut self, max_len: usize) -> Result<String> {
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                if pos + 1 > max_len {
                    return Err(Error::HandshakeTooLarge {
                        size: pos + 1,
                        max: max_len,
                    });
                }
                let raw = self.buf.split_to(pos + 1);
                let line = raw.strip_suffix(b"\n").unwrap_or(&raw[..]);
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                return Ok(String::from_utf8_lossy(line).into_owned());
            }

            if self.buf.len() > max_len {
                return Err(Error::HandshakeTooLarge {
                    size: self.buf.len(),
                    max: max_len,
                });
            }

            if !self.fill().await? {
                return Err(Error::Io(
                    "connection closed during handshake".to_string(),
                ));
            }
        }
    }

    /// Read the next frame, unmasked and with its payload fully buffered.
    ///
    /// Returns `Ok(None)` when the stream ends cleanly between frames.
    ///
    /// # Errors
    ///
    /// - `Error::PayloadTooLarge` if the announced length exceeds the frame limit;
    ///   this is raised from the header alone, before the payload is buffered
    /// - `Error::UnsupportedFrame` for reserved opcodes
    /// - `Error::Io` on transport failure or end of stream inside a frame
    pub async fn read_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            if !self.buf.is_empty() {
                match Frame::parse_with_limit(&self.buf, self.max_frame_size) {
                    Ok((frame, consumed)) => {
                        self.buf.advance(consumed);
                        trace!(
                            opcode = %frame.opcode,
                            fin = frame.fin,
                            len = frame.payload().len(),
                            "frame received"
                        );
                        return Ok(Some(frame));
                    }
                    Err(Error::IncompleteFrame { needed }) => {
                        // Length already checked against the limit when the header is complete.
                        self.buf.reserve(needed);
                    }
                    Err(e) => return Err(e),
                }
            }

            if !self.fill().await? {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(Error::Io(format!(
                    "connection closed inside a frame ({} bytes pending)",
                    self.buf.len()
                )));
            }
        }
    }
}
