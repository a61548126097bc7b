//! TCP transport with optional TLS.

use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tracing::debug;

use crate::config::Config;
use crate::error::Result;
use crate::uri::{Scheme, Uri};

/// A connected stream, plain for `ws` and TLS-wrapped for `wss`.
pub enum MaybeTlsStream {
    Plain(TcpStream),
    #[cfg(feature = "tls-rustls")]
    Tls(Box<crate::tls::TlsStream<TcpStream>>),
}

impl MaybeTlsStream {
    #[must_use]
    pub fn is_tls(&self) -> bool {
        !matches!(self, MaybeTlsStream::Plain(_))
    }
}

impl AsyncRead for MaybeTlsStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            #[cfg(feature = "tls-rustls")]
            MaybeTlsStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for MaybeTlsStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            #[cfg(feature = "tls-rustls")]
            MaybeTlsStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_flush(cx),
            #[cfg(feature = "tls-rustls")]
            MaybeTlsStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            #[cfg(feature = "tls-rustls")]
            MaybeTlsStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Open a connection to `uri`, wrapping it in TLS for `wss`.
///
/// # Errors
///
/// - `Error::Io` if name resolution or the TCP connect fails
/// - `Error::Tls` if the TLS handshake fails, or for `wss` when the crate is
///   built without `tls-rustls`
pub async fn connect(uri: &Uri, config: &Config) -> Result<MaybeTlsStream> {
    debug!(host = uri.host(), port = uri.port(), scheme = %uri.scheme(), "connecting");
    let tcp = TcpStream::connect((uri.host(), uri.port())).await?;
    tcp.set_nodelay(true)?;

    match uri.scheme() {
        Scheme::Ws => Ok(MaybeTlsStream::Plain(tcp)),
        Scheme::Wss => wrap_tls(tcp, uri, config).await,
    }
}

#[cfg(feature = "tls-rustls")]
async fn wrap_tls(tcp: TcpStream, uri: &Uri, config: &Config) -> Result<MaybeTlsStream> {
    let stream = crate::tls::connect(tcp, uri.host(), &config.tls).await?;
    Ok(MaybeTlsStream::Tls(Box::new(stream)))
}

#[cfg(not(feature = "tls-rustls"))]
async fn wrap_tls(_tcp: TcpStream, uri: &Uri, _config: &Config) -> Result<MaybeTlsStream> {
    Err(crate::Error::Tls(format!(
        "{uri} needs TLS but the crate was built without the tls-rustls feature"
    )))
}
