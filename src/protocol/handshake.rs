//! WebSocket opening handshake, client side (RFC 6455 Section 4.1).
//!
//! This module only builds and inspects bytes. Reading the response off the
//! wire is the codec's job, see [`crate::codec::FrameReader::read_line`].

use std::collections::HashMap;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sha1::{Digest, Sha1};

use crate::error::{Error, Result};
use crate::protocol::mask::random_bytes;
use crate::uri::Uri;

/// The WebSocket GUID used in the Sec-WebSocket-Accept calculation (RFC 6455).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Protocol version sent in `Sec-WebSocket-Version`.
pub const WS_VERSION: u8 = 13;

/// Status line prefix of a successful upgrade.
pub const SWITCHING_PROTOCOLS: &str = "HTTP/1.1 101";

/// Computes the Sec-WebSocket-Accept value from the client's Sec-WebSocket-Key.
///
/// The accept key is calculated as: Base64(SHA-1(key + GUID))
///
/// # Example
///
/// ```
/// use coopws::protocol::handshake::compute_accept_key;
///
/// let key = "dGhlIHNhbXBsZSBub25jZQ==";
/// let accept = compute_accept_key(key);
/// assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    let hash = hasher.finalize();
    BASE64.encode(hash)
}

/// Generate a `Sec-WebSocket-Key`: 16 random bytes, base64-encoded.
///
/// # Errors
///
/// Returns `Error::Io` if the RNG is unavailable.
pub fn generate_key() -> Result<String> {
    let nonce = random_bytes::<16>()?;
    Ok(BASE64.encode(nonce))
}

/// Validate that a header name or value does not contain CR or LF characters.
///
/// # Errors
/// Returns `Error::InvalidHeaderValue` if the value contains `\r` or `\n`.
fn validate_header_value(header_name: &str, value: &str) -> Result<()> {
    if value.contains('\r') || value.contains('\n') {
        return Err(Error::InvalidHeaderValue {
            header: header_name.to_string(),
            reason: "contains CR or LF characters".to_string(),
        });
    }
    Ok(())
}

/// Upgrade request sent by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRequest {
    /// Request target, e.g. `/chat`.
    pub path: String,
    /// `host:port`, used for both `Host` and `Origin`.
    pub authority: String,
    /// The `Sec-WebSocket-Key` nonce.
    pub key: String,
    /// Caller-supplied headers, written after the fixed set.
    pub extra_headers: Vec<(String, String)>,
}

impl ClientRequest {
    /// Build a request for `uri` with a fresh random key.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if no key can be generated.
    pub fn new(uri: &Uri, extra_headers: &[(&str, &str)]) -> Result<Self> {
        Ok(Self::with_key(uri, generate_key()?, extra_headers))
    }

    /// Build a request with a known key.
    #[must_use]
    pub fn with_key(uri: &Uri, key: String, extra_headers: &[(&str, &str)]) -> Self {
        Self {
            path: uri.path().to_string(),
            authority: uri.authority(),
            key,
            extra_headers: extra_headers
                .iter()
                .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
                .collect(),
        }
    }

    /// Write the HTTP request to a buffer.
    ///
    /// # Errors
    /// Returns `Error::InvalidHeaderValue` if an extra header contains CR/LF.
    pub fn write(&self, buf: &mut Vec<u8>) -> Result<()> {
        for (name, value) in &self.extra_headers {
            validate_header_value(name, name)?;
            validate_header_value(name, value)?;
        }

        buf.extend_from_slice(format!("GET {} HTTP/1.1\r\n", self.path).as_bytes());
        buf.extend_from_slice(format!("Host: {}\r\n", self.authority).as_bytes());
        buf.extend_from_slice(b"Connection: Upgrade\r\n");
        buf.extend_from_slice(b"Upgrade: websocket\r\n");
        buf.extend_from_slice(format!("Sec-WebSocket-Key: {}\r\n", self.key).as_bytes());
        buf.extend_from_slice(format!("Sec-WebSocket-Version: {WS_VERSION}\r\n").as_bytes());
        buf.extend_from_slice(format!("Origin: http://{}\r\n", self.authority).as_bytes());

        for (name, value) in &self.extra_headers {
            buf.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
        }

        buf.extend_from_slice(b"\r\n");
        Ok(())
    }
}

/// Check the response status line.
///
/// # Errors
///
/// Returns `Error::HandshakeRejected` carrying the line if it is not a
/// `101` answer.
pub fn check_status_line(line: &str) -> Result<()> {
    let accepted = line
        .strip_prefix(SWITCHING_PROTOCOLS)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(' '));
    if accepted {
        Ok(())
    } else {
        Err(Error::HandshakeRejected(line.to_string()))
    }
}

/// Response headers collected after a successful status line.
///
/// Header names are stored lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    headers: HashMap<String, String>,
}

impl ResponseHeaders {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one `Name: value` line. Lines without a colon are ignored.
    pub fn push_line(&mut self, line: &str) {
        if let Some((name, value)) = line.split_once(':') {
            self.headers
                .insert(name.trim().to_lowercase(), value.trim().to_string());
        }
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Check `Sec-WebSocket-Accept` against the key that was sent.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidAcceptKey` if the header is missing or wrong.
    pub fn verify_accept(&self, key: &str) -> Result<()> {
        let expected = compute_accept_key(key);
        match self.get("sec-websocket-accept") {
            Some(actual) if actual == expected => Ok(()),
            actual => Err(Error::InvalidAcceptKey {
                expected,
                actual: actual.unwrap_or_default().to_string(),
            }),
        }
    }
}
