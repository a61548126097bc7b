//! # coopws - Embedded-style WebSocket client engine
//!
//! `coopws` is a small RFC 6455 client: framing, masking, the HTTP upgrade
//! handshake and control-frame handling, driven by async tasks instead of
//! threads.
//!
//! ## Features
//!
//! - **Masked client framing** with a fresh random key per frame
//! - **Shared client**: `recv`, `send`, `ping` and `close` take `&self`, so a
//!   reader task and a pinger can use one connection
//! - **Automatic pong** replies; pongs from the server are dropped
//! - **Bounded memory**: oversize frames close the session with code 1009
//! - **wss://** through rustls (feature `tls-rustls`)
//!
//! Continuation frames are not reassembled; they end the session with
//! [`Error::UnsupportedFrame`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use coopws::{Config, WebSocketClient};
//!
//! let client = WebSocketClient::new(Config::default());
//! client.handshake("ws://192.168.137.1:3000/", &[]).await?;
//! client.send("hello").await?;
//! while let Some(msg) = client.recv().await? {
//!     println!("{msg:?}");
//! }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod message;
pub mod protocol;
pub mod uri;

#[cfg(feature = "async-tokio")]
pub mod codec;

#[cfg(feature = "async-tokio")]
pub mod transport;

pub use config::{Config, Limits, TlsOptions, VerifyMode};
pub use connection::ConnectionState;
#[cfg(feature = "async-tokio")]
pub use connection::WebSocketClient;
pub use error::{Error, Result};
pub use message::{CloseCode, CloseFrame, Message};
pub use protocol::{Frame, OpCode, WS_GUID, compute_accept_key};
pub use uri::{Scheme, Uri};

#[cfg(feature = "async-tokio")]
pub use codec::{FrameReader, FrameWriter};
#[cfg(feature = "async-tokio")]
pub use transport::MaybeTlsStream;

#[cfg(feature = "tls-rustls")]
pub mod tls;
