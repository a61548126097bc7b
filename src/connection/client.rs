use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::sync::{Mutex as AsyncMutex, watch};
use tracing::{debug, trace, warn};

use crate::codec::{FrameReader, FrameWriter};
use crate::config::Config;
use crate::connection::ConnectionState;
use crate::error::{Error, Result};
use crate::message::{CloseCode, CloseFrame, Message};
use crate::protocol::handshake::{ClientRequest, ResponseHeaders, check_status_line};
use crate::protocol::{Frame, OpCode};
use crate::transport::{self, MaybeTlsStream};
use crate::uri::Uri;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Transport halves of one handshake's worth of connection.
///
/// Reads and writes take separate locks so a ping or send can go out while
/// another task is parked in `recv`.
struct Session<S> {
    id: u64,
    reader: AsyncMutex<Option<FrameReader<ReadHalf<S>>>>,
    writer: AsyncMutex<Option<FrameWriter<WriteHalf<S>>>>,
    closed: watch::Sender<bool>,
}

impl<S: AsyncRead + AsyncWrite> Session<S> {
    fn new(reader: FrameReader<ReadHalf<S>>, writer: FrameWriter<WriteHalf<S>>) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            reader: AsyncMutex::new(Some(reader)),
            writer: AsyncMutex::new(Some(writer)),
            closed,
        }
    }

    /// Drop both halves of the transport.
    ///
    /// A reader parked in `recv` cannot be reached from here; it is woken
    /// through `closed` and drops its half itself.
    async fn release(&self) {
        self.closed.send_replace(true);

        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            if let Err(e) = writer.shutdown().await {
                debug!(session = self.id, error = %e, "transport shutdown failed");
            }
        }

        if let Ok(mut reader) = self.reader.try_lock() {
            reader.take();
        }
    }

    /// Write one frame on this session.
    ///
    /// Returns `Ok(false)` if the writer is already gone.
    async fn write(&self, frame: &Frame) -> Result<bool> {
        let mut guard = self.writer.lock().await;
        let Some(writer) = guard.as_mut() else {
            return Ok(false);
        };
        match writer.write_frame(frame).await {
            Ok(()) => Ok(true),
            Err(e) => {
                guard.take();
                Err(e)
            }
        }
    }
}

struct Shared<S> {
    state: ConnectionState,
    uri: Option<Uri>,
    session: Option<Arc<Session<S>>>,
}

/// RFC 6455 client.
///
/// All operations take `&self`, so one client can be shared between a
/// reader task, a pinger and a supervisor through an `Arc`. The session
/// state sits behind a short synchronous lock; frame reads and writes each
/// hold their own async lock for the duration of one frame.
///
/// ```rust,no_run
/// # async fn run() -> coopws::Result<()> {
/// use coopws::{Config, Message, WebSocketClient};
///
/// let client = WebSocketClient::new(Config::default());
/// client.handshake("ws://192.168.137.1:3000/", &[]).await?;
/// client.send("hello").await?;
/// while let Some(msg) = client.recv().await? {
///     if let Message::Text(text) = msg {
///         println!("{text}");
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct WebSocketClient<S = MaybeTlsStream> {
    config: Config,
    shared: Mutex<Shared<S>>,
}

impl WebSocketClient<MaybeTlsStream> {
    /// Create a client that opens its own TCP/TLS connections.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_config(config)
    }

    /// Connect to `uri` and perform the opening handshake.
    ///
    /// An open session is closed first. `headers` are appended to the
    /// upgrade request after the standard ones.
    ///
    /// # Errors
    ///
    /// - `Error::MalformedUri` / `Error::InvalidScheme` for a bad target
    /// - `Error::Io` / `Error::Tls` if the transport cannot be established
    /// - `Error::HandshakeRejected` if the server does not answer `101`
    pub async fn handshake(&self, uri: &str, headers: &[(&str, &str)]) -> Result<()> {
        let uri = Uri::parse(uri)?;
        self.close().await;
        let stream = transport::connect(&uri, &self.config).await?;
        self.handshake_with_stream(stream, &uri, headers).await
    }
}

impl Default for WebSocketClient<MaybeTlsStream> {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl<S> WebSocketClient<S> {
    /// Create a client for caller-supplied streams.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            shared: Mutex::new(Shared {
                state: ConnectionState::Unopened,
                uri: None,
                session: None,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current session state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.lock().state
    }

    /// Whether a session is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state().is_open()
    }

    /// Target of the current or most recent session.
    #[must_use]
    pub fn uri(&self) -> Option<Uri> {
        self.shared.lock().uri.clone()
    }

    fn current(&self) -> Option<Arc<Session<S>>> {
        self.shared.lock().session.clone()
    }

    /// Mark the client closed and hand back the session if `id` is still the
    /// live one. Only one caller ever gets a given session back.
    fn detach(&self, id: Option<u64>) -> Option<Arc<Session<S>>> {
        let mut shared = self.shared.lock();
        let live = shared.session.as_ref()?.id;
        if id.is_some_and(|id| id != live) {
            return None;
        }
        shared.state = ConnectionState::Closed;
        debug!(session = live, "session closed");
        shared.session.take()
    }
}

impl<S: AsyncRead + AsyncWrite> WebSocketClient<S> {
    /// Perform the opening handshake over an already connected stream.
    ///
    /// An open session is closed first.
    ///
    /// # Errors
    ///
    /// - `Error::Io` if the stream fails or ends mid-handshake
    /// - `Error::HandshakeRejected` if the status line is not `HTTP/1.1 101`
    /// - `Error::HandshakeTooLarge` if the response headers exceed the limit
    /// - `Error::InvalidAcceptKey` if verification is enabled and fails
    /// - `Error::InvalidHeaderValue` if an extra header contains CR or LF
    pub async fn handshake_with_stream(
        &self,
        stream: S,
        uri: &Uri,
        headers: &[(&str, &str)],
    ) -> Result<()> {
        self.close().await;

        let (read_half, write_half) = tokio::io::split(stream);
        let mut reader =
            FrameReader::new(read_half, self.config.read_buffer_size, &self.config.limits);
        let mut writer = FrameWriter::new(write_half, self.config.write_buffer_size);

        let request = ClientRequest::new(uri, headers)?;
        let mut buf = Vec::new();
        request.write(&mut buf)?;
        debug!(%uri, extra_headers = headers.len(), "sending upgrade request");
        writer.write_raw(&buf).await?;

        let max = self.config.limits.max_handshake_size;
        let mut consumed = 0;

        let status = reader.read_line(max).await?;
        consumed += status.len() + 2;
        if let Err(e) = check_status_line(&status) {
            warn!(%uri, status = %status, "handshake rejected");
            return Err(e);
        }

        let mut response = ResponseHeaders::new();
        loop {
            let line = reader.read_line(max.saturating_sub(consumed)).await?;
            consumed += line.len() + 2;
            self.config.limits.check_handshake_size(consumed)?;
            if line.is_empty() {
                break;
            }
            response.push_line(&line);
        }

        if self.config.verify_accept {
            response.verify_accept(&request.key)?;
        }

        let session = Arc::new(Session::new(reader, writer));
        let id = session.id;
        let previous = {
            let mut shared = self.shared.lock();
            shared.state = ConnectionState::Open;
            shared.uri = Some(uri.clone());
            shared.session.replace(session)
        };
        // Another task may have completed a handshake in the meantime.
        if let Some(previous) = previous {
            previous.release().await;
        }

        debug!(session = id, %uri, headers = response.len(), "session open");
        Ok(())
    }

    /// Receive the next text or binary message.
    ///
    /// Pings are answered and pongs dropped without returning. Returns
    /// `Ok(None)` when the server closes, the stream ends, the client is not
    /// open, or another task calls [`close`](Self::close).
    ///
    /// # Errors
    ///
    /// Protocol violations and transport failures are returned as errors.
    /// The session is closed before the error is returned. An announced
    /// payload above `max_frame_size` is answered with a close frame carrying
    /// code 1009 first.
    pub async fn recv(&self) -> Result<Option<Message>> {
        let Some(session) = self.current() else {
            return Ok(None);
        };
        let mut closed = session.closed.subscribe();
        let mut reader = session.reader.lock().await;

        loop {
            let Some(frames) = reader.as_mut() else {
                return Ok(None);
            };

            let next = tokio::select! {
                biased;
                _ = closed.wait_for(|closed| *closed) => None,
                result = frames.read_frame() => Some(result),
            };
            let Some(result) = next else {
                reader.take();
                return Ok(None);
            };

            let frame = match result {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    debug!(session = session.id, "stream ended");
                    reader.take();
                    self.finish(&session).await;
                    return Ok(None);
                }
                Err(e) => return Err(self.abort(&session, &mut reader, e).await),
            };

            match frame.opcode {
                OpCode::Text | OpCode::Binary if frame.fin => {
                    return match Message::from_data_frame(frame.opcode, frame.into_payload()) {
                        Ok(message) => Ok(Some(message)),
                        Err(e) => Err(self.abort(&session, &mut reader, e).await),
                    };
                }
                OpCode::Close => {
                    let close = CloseFrame::from_payload(frame.payload());
                    debug!(
                        session = session.id,
                        code = close.as_ref().map(|c| c.code.as_u16()),
                        reason = close.as_ref().map(|c| c.reason.as_str()),
                        "close frame received"
                    );
                    reader.take();
                    self.finish(&session).await;
                    return Ok(None);
                }
                OpCode::Ping => {
                    if let Err(e) = frame.validate() {
                        return Err(self.abort(&session, &mut reader, e).await);
                    }
                    trace!(session = session.id, len = frame.payload().len(), "ping received");
                    let pong = Frame::pong(frame.into_payload());
                    if let Err(e) = session.write(&pong).await {
                        warn!(session = session.id, error = %e, "pong reply failed");
                        reader.take();
                        self.finish(&session).await;
                        return Ok(None);
                    }
                }
                OpCode::Pong => {
                    trace!(session = session.id, "pong received");
                }
                // Continuations and unfinished data frames: no reassembly.
                other => {
                    let e = Error::UnsupportedFrame(other.as_u8());
                    return Err(self.abort(&session, &mut reader, e).await);
                }
            }
        }
    }

    /// Tear the session down after a fatal read-side error and hand the
    /// error back.
    async fn abort(
        &self,
        session: &Session<S>,
        reader: &mut Option<FrameReader<ReadHalf<S>>>,
        error: Error,
    ) -> Error {
        warn!(session = session.id, error = %error, "closing session after read failure");
        reader.take();
        if matches!(error, Error::PayloadTooLarge { .. }) {
            let close = Frame::close(Some(CloseCode::MESSAGE_TOO_BIG.as_u16()), "");
            if let Err(e) = session.write(&close).await {
                debug!(session = session.id, error = %e, "close frame not sent");
            }
        }
        self.finish(session).await;
        error
    }

    /// Close `session` if it is still the live one.
    async fn finish(&self, session: &Session<S>) {
        if let Some(session) = self.detach(Some(session.id)) {
            session.release().await;
        }
    }

    /// Send a text or binary message.
    ///
    /// Does nothing when the client is not open.
    ///
    /// # Errors
    ///
    /// - `Error::TypeMismatch` for ping, pong and close messages
    /// - `Error::Io` if the write fails; the session is closed
    pub async fn send(&self, message: impl Into<Message>) -> Result<()> {
        let Some(session) = self.current() else {
            return Ok(());
        };
        let (opcode, payload) = message.into().into_data_frame()?;
        self.write_on(&session, &Frame::new(true, opcode, payload)).await
    }

    /// Send a ping with `payload`.
    ///
    /// Does nothing when the client is not open. The matching pong is
    /// consumed by `recv`.
    ///
    /// # Errors
    ///
    /// - `Error::FrameTooLarge` if `payload` is longer than 125 bytes
    /// - `Error::Io` if the write fails; the session is closed
    pub async fn ping(&self, payload: impl Into<Vec<u8>>) -> Result<()> {
        let Some(session) = self.current() else {
            return Ok(());
        };
        let frame = Frame::ping(payload);
        frame.validate()?;
        self.write_on(&session, &frame).await
    }

    async fn write_on(&self, session: &Arc<Session<S>>, frame: &Frame) -> Result<()> {
        match session.write(frame).await {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(session = session.id, opcode = %frame.opcode, error = %e, "write failed");
                self.finish(session).await;
                Err(e)
            }
        }
    }

    /// Close the session and release the transport.
    ///
    /// Idempotent: closing a client that is not open does nothing. A `recv`
    /// pending in another task returns `Ok(None)`.
    pub async fn close(&self) {
        if let Some(session) = self.detach(None) {
            session.release().await;
        }
    }

    /// Send a close frame with `code` and `reason`, then [`close`](Self::close).
    ///
    /// The close frame is best effort; write failures are logged, not returned.
    pub async fn close_with(&self, code: CloseCode, reason: &str) {
        let Some(session) = self.detach(None) else {
            return;
        };
        let frame = Frame::close(Some(code.as_u16()), reason);
        match session.write(&frame).await {
            Ok(_) => debug!(session = session.id, code = code.as_u16(), "close frame sent"),
            Err(e) => debug!(session = session.id, error = %e, "close frame not sent"),
        }
        session.release().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tests::MockStream;
    use crate::protocol::mask::apply_mask;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};

    const RESPONSE_101: &[u8] =
        b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\r\n";

    fn uri() -> Uri {
        Uri::parse("ws://192.168.137.1:3000/").unwrap()
    }

    /// Read the upgrade request off the server end, up to the blank line.
    async fn read_request(server: &mut DuplexStream) -> String {
        let mut request = Vec::new();
        let mut byte = [0u8; 1];
        while !request.ends_with(b"\r\n\r\n") {
            server.read_exact(&mut byte).await.unwrap();
            request.push(byte[0]);
        }
        String::from_utf8(request).unwrap()
    }

    /// Read one masked client frame off the server end.
    async fn read_client_frame(server: &mut DuplexStream) -> (u8, Vec<u8>) {
        let mut head = [0u8; 2];
        server.read_exact(&mut head).await.unwrap();
        assert_eq!(head[1] & 0x80, 0x80, "client frames must be masked");
        let len = match head[1] & 0x7F {
            126 => u64::from(server.read_u16().await.unwrap()),
            127 => server.read_u64().await.unwrap(),
            n => u64::from(n),
        };
        let mut mask = [0u8; 4];
        server.read_exact(&mut mask).await.unwrap();
        let mut payload = vec![0u8; len as usize];
        server.read_exact(&mut payload).await.unwrap();
        apply_mask(&mut payload, mask);
        (head[0], payload)
    }

    async fn open_client() -> (WebSocketClient<DuplexStream>, DuplexStream) {
        open_client_with(Config::default()).await
    }

    async fn open_client_with(config: Config) -> (WebSocketClient<DuplexStream>, DuplexStream) {
        let (client_io, mut server) = duplex(64 * 1024);
        server.write_all(RESPONSE_101).await.unwrap();
        let client = WebSocketClient::with_config(config);
        client
            .handshake_with_stream(client_io, &uri(), &[])
            .await
            .unwrap();
        read_request(&mut server).await;
        (client, server)
    }

    #[tokio::test]
    async fn test_initial_state() {
        let client = WebSocketClient::<DuplexStream>::with_config(Config::default());
        assert_eq!(client.state(), ConnectionState::Unopened);
        assert!(!client.is_open());
        assert_eq!(client.uri(), None);
        assert_eq!(client.recv().await, Ok(None));
        assert_eq!(client.send("ignored").await, Ok(()));
        client.close().await;
        assert_eq!(client.state(), ConnectionState::Unopened);
    }

    #[tokio::test]
    async fn test_handshake_request_and_open() {
        let (client_io, mut server) = duplex(4096);
        server.write_all(RESPONSE_101).await.unwrap();

        let client = WebSocketClient::with_config(Config::default());
        client
            .handshake_with_stream(client_io, &uri(), &[("X-Device", "esp32")])
            .await
            .unwrap();
        assert_eq!(client.state(), ConnectionState::Open);
        assert_eq!(client.uri(), Some(uri()));

        let request = read_request(&mut server).await;
        let lines: Vec<&str> = request.split("\r\n").collect();
        assert_eq!(lines[0], "GET / HTTP/1.1");
        assert_eq!(lines[1], "Host: 192.168.137.1:3000");
        assert_eq!(lines[2], "Connection: Upgrade");
        assert_eq!(lines[3], "Upgrade: websocket");
        assert!(lines[4].starts_with("Sec-WebSocket-Key: "));
        assert_eq!(lines[5], "Sec-WebSocket-Version: 13");
        assert_eq!(lines[6], "Origin: http://192.168.137.1:3000");
        assert_eq!(lines[7], "X-Device: esp32");
        assert_eq!(lines[8], "");
    }

    #[tokio::test]
    async fn test_handshake_rejected() {
        let (client_io, mut server) = duplex(4096);
        server.write_all(b"HTTP/1.1 404 Not Found\r\n\r\n").await.unwrap();

        let client = WebSocketClient::with_config(Config::default());
        let result = client.handshake_with_stream(client_io, &uri(), &[]).await;
        assert_eq!(
            result,
            Err(Error::HandshakeRejected("HTTP/1.1 404 Not Found".into()))
        );
        assert_eq!(client.state(), ConnectionState::Unopened);
    }

    #[tokio::test]
    async fn test_handshake_response_too_large() {
        let (client_io, mut server) = duplex(64 * 1024);
        let mut response = b"HTTP/1.1 101 Switching Protocols\r\n".to_vec();
        for i in 0..100 {
            response.extend_from_slice(format!("X-Filler-{i}: {}\r\n", "a".repeat(40)).as_bytes());
        }
        response.extend_from_slice(b"\r\n");
        server.write_all(&response).await.unwrap();

        let client = WebSocketClient::with_config(Config::embedded());
        let result = client.handshake_with_stream(client_io, &uri(), &[]).await;
        assert!(matches!(result, Err(Error::HandshakeTooLarge { .. })));
        assert!(!client.is_open());
    }

    #[tokio::test]
    async fn test_handshake_verify_accept() {
        let (client_io, mut server) = duplex(4096);
        server.write_all(RESPONSE_101).await.unwrap();

        let client = WebSocketClient::with_config(Config::new().with_verify_accept(true));
        let result = client.handshake_with_stream(client_io, &uri(), &[]).await;
        assert!(matches!(result, Err(Error::InvalidAcceptKey { .. })));
        assert!(!client.is_open());
    }

    #[tokio::test]
    async fn test_frame_right_after_handshake_is_kept() {
        let (client_io, mut server) = duplex(4096);
        let mut response = RESPONSE_101.to_vec();
        response.extend_from_slice(&[0x81, 0x02, b'h', b'i']);
        server.write_all(&response).await.unwrap();

        let client = WebSocketClient::with_config(Config::default());
        client
            .handshake_with_stream(client_io, &uri(), &[])
            .await
            .unwrap();
        assert_eq!(client.recv().await, Ok(Some(Message::text("hi"))));
    }

    #[tokio::test]
    async fn test_send_text_is_masked() {
        let (client, mut server) = open_client().await;
        client.send("hello").await.unwrap();

        let (byte0, payload) = read_client_frame(&mut server).await;
        assert_eq!(byte0, 0x81);
        assert_eq!(payload, b"hello");
    }

    #[tokio::test]
    async fn test_send_binary() {
        let (client, mut server) = open_client().await;
        client.send(vec![1u8, 2, 3]).await.unwrap();

        let (byte0, payload) = read_client_frame(&mut server).await;
        assert_eq!(byte0, 0x82);
        assert_eq!(payload, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_send_control_message_is_type_mismatch() {
        let (client, _server) = open_client().await;
        assert_eq!(
            client.send(Message::Ping(vec![])).await,
            Err(Error::TypeMismatch("Ping"))
        );
        assert!(client.is_open(), "local faults leave the session alone");
    }

    #[tokio::test]
    async fn test_recv_text_and_binary() {
        let (client, mut server) = open_client().await;
        server.write_all(&[0x81, 0x02, b'o', b'k']).await.unwrap();
        server.write_all(&[0x82, 0x02, 0xDE, 0xAD]).await.unwrap();

        assert_eq!(client.recv().await, Ok(Some(Message::text("ok"))));
        assert_eq!(
            client.recv().await,
            Ok(Some(Message::binary(vec![0xDE, 0xAD])))
        );
    }

    #[tokio::test]
    async fn test_ping_is_answered_and_not_returned() {
        let (client, mut server) = open_client().await;
        server.write_all(&[0x89, 0x03, b'a', b'b', b'c']).await.unwrap();
        server.write_all(&[0x8A, 0x00]).await.unwrap();
        server.write_all(&[0x81, 0x04, b'd', b'a', b't', b'a']).await.unwrap();

        assert_eq!(client.recv().await, Ok(Some(Message::text("data"))));

        let (byte0, payload) = read_client_frame(&mut server).await;
        assert_eq!(byte0, 0x8A);
        assert_eq!(payload, b"abc");
    }

    #[tokio::test]
    async fn test_close_frame_ends_session() {
        let (client, mut server) = open_client().await;
        server.write_all(&[0x88, 0x02, 0x03, 0xE8]).await.unwrap();

        assert_eq!(client.recv().await, Ok(None));
        assert_eq!(client.state(), ConnectionState::Closed);
        assert_eq!(client.recv().await, Ok(None));
    }

    #[tokio::test]
    async fn test_eof_ends_session() {
        let (client, server) = open_client().await;
        drop(server);

        assert_eq!(client.recv().await, Ok(None));
        assert_eq!(client.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_continuation_frame_closes() {
        let (client, mut server) = open_client().await;
        server.write_all(&[0x00, 0x01, b'x']).await.unwrap();

        assert_eq!(client.recv().await, Err(Error::UnsupportedFrame(0)));
        assert_eq!(client.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_fragmented_text_closes() {
        let (client, mut server) = open_client().await;
        server.write_all(&[0x01, 0x01, b'x']).await.unwrap();

        assert_eq!(client.recv().await, Err(Error::UnsupportedFrame(1)));
        assert!(!client.is_open());
    }

    #[tokio::test]
    async fn test_reserved_opcode_closes() {
        let (client, mut server) = open_client().await;
        server.write_all(&[0x83, 0x00]).await.unwrap();

        assert_eq!(client.recv().await, Err(Error::UnsupportedFrame(3)));
        assert!(!client.is_open());
    }

    #[tokio::test]
    async fn test_invalid_utf8_closes() {
        let (client, mut server) = open_client().await;
        server.write_all(&[0x81, 0x02, 0xC3, 0x28]).await.unwrap();

        assert_eq!(client.recv().await, Err(Error::InvalidUtf8));
        assert!(!client.is_open());
    }

    #[tokio::test]
    async fn test_oversize_payload_sends_1009() {
        let config = Config::new().with_limits(crate::Limits::new(1024, 8192));
        let (client, mut server) = open_client_with(config).await;
        // Announces 1 MiB, sends nothing more.
        server
            .write_all(&[0x82, 0x7F, 0, 0, 0, 0, 0, 0x10, 0, 0])
            .await
            .unwrap();

        assert!(matches!(
            client.recv().await,
            Err(Error::PayloadTooLarge { size: 1_048_576, max: 1024 })
        ));
        assert_eq!(client.state(), ConnectionState::Closed);

        let (byte0, payload) = read_client_frame(&mut server).await;
        assert_eq!(byte0, 0x88);
        assert_eq!(payload, 1009u16.to_be_bytes());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (client, mut server) = open_client().await;
        client.close().await;
        assert_eq!(client.state(), ConnectionState::Closed);
        client.close().await;
        assert_eq!(client.state(), ConnectionState::Closed);

        // Both halves dropped: the peer sees end of stream.
        let mut rest = Vec::new();
        server.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_close_with_sends_code() {
        let (client, mut server) = open_client().await;
        client.close_with(CloseCode::GOING_AWAY, "bye").await;
        assert_eq!(client.state(), ConnectionState::Closed);

        let (byte0, payload) = read_client_frame(&mut server).await;
        assert_eq!(byte0, 0x88);
        assert_eq!(payload, [0x03, 0xE9, b'b', b'y', b'e']);
    }

    #[tokio::test]
    async fn test_ping_sends_frame() {
        let (client, mut server) = open_client().await;
        client.ping(b"hb".to_vec()).await.unwrap();

        let (byte0, payload) = read_client_frame(&mut server).await;
        assert_eq!(byte0, 0x89);
        assert_eq!(payload, b"hb");

        assert!(matches!(
            client.ping(vec![0u8; 126]).await,
            Err(Error::FrameTooLarge { size: 126, .. })
        ));
    }

    #[tokio::test]
    async fn test_send_after_close_is_noop() {
        let (client, _server) = open_client().await;
        client.close().await;
        assert_eq!(client.send("late").await, Ok(()));
        assert_eq!(client.ping(b"".to_vec()).await, Ok(()));
        assert_eq!(client.ping(vec![0u8; 126]).await, Ok(()));
    }

    #[tokio::test]
    async fn test_ping_before_handshake_is_noop() {
        let client = WebSocketClient::<DuplexStream>::with_config(Config::default());
        assert_eq!(client.ping(vec![0u8; 126]).await, Ok(()));
        assert_eq!(client.state(), ConnectionState::Unopened);
    }

    #[tokio::test]
    async fn test_failed_pong_reply_closes_without_error() {
        let mut incoming = RESPONSE_101.to_vec();
        incoming.extend_from_slice(&[0x89, 0x03, b'a', b'b', b'c']);
        // The upgrade request is the only write that gets through.
        let stream = MockStream::new(incoming).fail_writes_after(1);

        let client = WebSocketClient::with_config(Config::default());
        client
            .handshake_with_stream(stream, &uri(), &[])
            .await
            .unwrap();
        assert!(client.is_open());

        assert_eq!(client.recv().await, Ok(None));
        assert_eq!(client.state(), ConnectionState::Closed);
        assert_eq!(client.recv().await, Ok(None));
    }

    #[tokio::test]
    async fn test_reopen_after_close() {
        let (client, _server) = open_client().await;
        client.close().await;

        let (client_io, mut server) = duplex(4096);
        server.write_all(RESPONSE_101).await.unwrap();
        server.write_all(&[0x81, 0x03, b'n', b'e', b'w']).await.unwrap();
        client
            .handshake_with_stream(client_io, &uri(), &[])
            .await
            .unwrap();
        assert!(client.is_open());
        assert_eq!(client.recv().await, Ok(Some(Message::text("new"))));
    }

    #[tokio::test]
    async fn test_handshake_while_open_replaces_session() {
        let (client, mut old_server) = open_client().await;

        let (client_io, mut server) = duplex(4096);
        server.write_all(RESPONSE_101).await.unwrap();
        client
            .handshake_with_stream(client_io, &uri(), &[])
            .await
            .unwrap();
        assert!(client.is_open());

        // The first session's transport was released.
        let mut rest = Vec::new();
        old_server.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }
}
