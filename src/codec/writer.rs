use bytes::BytesMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::Result;
use crate::protocol::Frame;
use crate::protocol::mask::generate_mask;

/// Write half of a session.
///
/// Every frame is masked with a key drawn from the OS RNG at write time.
pub struct FrameWriter<W> {
    io: W,
    write_buf: BytesMut,
}

impl<W> FrameWriter<W> {
    #[must_use]
    pub fn new(io: W, write_buffer_size: usize) -> Self {
        Self {
            io,
            write_buf: BytesMut::with_capacity(write_buffer_size),
        }
    }

    #[must_use]
    pub fn get_ref(&self) -> &W {
        &self.io
    }

    #[must_use]
    pub fn into_inner(self) -> W {
        self.io
    }
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Encode, mask and send one frame, then flush.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` on transport failure and `Error::FrameTooLarge` if
    /// the payload cannot be encoded.
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let mask = generate_mask()?;

        self.write_buf.clear();
        let written = frame.write(&mut self.write_buf, Some(mask))?;
        self.io.write_all(&self.write_buf[..written]).await?;
        self.io.flush().await?;

        trace!(opcode = %frame.opcode, len = frame.payload().len(), "frame sent");
        Ok(())
    }

    /// Send raw bytes, used for the HTTP upgrade request.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` on transport failure.
    pub async fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.io.write_all(bytes).await?;
        self.io.flush().await?;
        Ok(())
    }

    /// Shut down the write direction of the transport.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the transport reports a failure.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.io.shutdown().await?;
        Ok(())
    }
}
