//! Mock WebSocket server on a random loopback port.

use std::net::SocketAddr;

use bytes::BytesMut;
use coopws::protocol::ResponseHeaders;
use coopws::{Frame, FrameReader, Limits, compute_accept_key};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

/// A `101` response carrying the correct accept value for `key`.
pub fn switching_protocols(key: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n\r\n",
        compute_accept_key(key)
    )
    .into_bytes()
}

pub struct MockServer {
    listener: TcpListener,
    addr: SocketAddr,
}

impl MockServer {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        Self { listener, addr }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self, path: &str) -> String {
        format!("ws://127.0.0.1:{}{}", self.addr.port(), path)
    }

    /// Accept one connection, read the upgrade request and answer it.
    ///
    /// `None` answers with a correct `101`; `Some(bytes)` sends `bytes`
    /// verbatim.
    pub async fn accept(&self, response: Option<&[u8]>) -> Peer {
        let (socket, _) = self.listener.accept().await.unwrap();
        let (read_half, write_half) = socket.into_split();
        let mut peer = Peer {
            reader: FrameReader::new(read_half, 4096, &Limits::default()),
            writer: write_half,
            request_line: String::new(),
            headers: ResponseHeaders::new(),
        };

        peer.request_line = peer.reader.read_line(8192).await.unwrap();
        loop {
            let line = peer.reader.read_line(8192).await.unwrap();
            if line.is_empty() {
                break;
            }
            peer.headers.push_line(&line);
        }

        let computed;
        let response = match response {
            Some(bytes) => bytes,
            None => {
                computed = switching_protocols(peer.header("sec-websocket-key").unwrap());
                &computed[..]
            }
        };
        peer.send_raw(response).await;
        peer
    }
}

/// Server side of one accepted connection.
pub struct Peer {
    reader: FrameReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    pub request_line: String,
    headers: ResponseHeaders,
}

impl Peer {
    /// Request header, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.unwrap();
        self.writer.flush().await.unwrap();
    }

    /// Send a frame the way a server does: unmasked.
    pub async fn send_frame(&mut self, frame: &Frame) {
        let mut buf = BytesMut::new();
        frame.write(&mut buf, None).unwrap();
        self.send_raw(&buf).await;
    }

    /// Read the next client frame, returning it with its mask bit.
    pub async fn recv_frame(&mut self) -> Frame {
        self.reader
            .read_frame()
            .await
            .unwrap()
            .expect("client closed the connection")
    }

    /// Read frames until one with `opcode` shows up.
    pub async fn recv_until(&mut self, opcode: coopws::OpCode) -> Frame {
        loop {
            let frame = self.recv_frame().await;
            if frame.opcode == opcode {
                return frame;
            }
        }
    }

    /// Whether the client has closed its side (after draining frames).
    pub async fn expect_eof(&mut self) {
        loop {
            match self.reader.read_frame().await {
                Ok(Some(_)) => continue,
                Ok(None) | Err(_) => return,
            }
        }
    }
}
