//! Connection target parsing.
//!
//! Accepts `ws://host[:port][/path]` and `wss://host[:port][/path]`. Hosts are
//! restricted to ASCII letters, digits, `-` and `.`.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// URI scheme of a WebSocket target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Plain TCP (`ws://`).
    Ws,
    /// TLS-wrapped TCP (`wss://`).
    Wss,
}

impl Scheme {
    /// Port used when the URI does not name one.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Scheme::Ws => 80,
            Scheme::Wss => 443,
        }
    }

    /// Whether the transport must be wrapped in TLS.
    #[must_use]
    pub const fn is_secure(self) -> bool {
        matches!(self, Scheme::Wss)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Scheme::Ws => "ws",
            Scheme::Wss => "wss",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed WebSocket connection target.
///
/// Immutable once parsed; a new handshake parses a new `Uri`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Uri {
    scheme: Scheme,
    host: String,
    port: u16,
    path: String,
}

impl Uri {
    /// Parse a `ws://` or `wss://` target.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidScheme`] if the scheme is neither `ws` nor `wss`
    /// - [`Error::MalformedUri`] if the string does not follow the grammar
    pub fn parse(input: &str) -> Result<Self> {
        let malformed = || Error::MalformedUri(input.to_string());

        let (scheme, rest) = input.split_once("://").ok_or_else(malformed)?;
        let scheme = match scheme {
            "ws" => Scheme::Ws,
            "wss" => Scheme::Wss,
            "" => return Err(malformed()),
            other => return Err(Error::InvalidScheme(other.to_string())),
        };

        let (authority, path) = match rest.find('/') {
            Some(idx) => rest.split_at(idx),
            None => (rest, ""),
        };

        let (host, port) = match authority.split_once(':') {
            Some((host, port)) => {
                if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(malformed());
                }
                let port: u16 = port.parse().map_err(|_| malformed())?;
                (host, port)
            }
            None => (authority, scheme.default_port()),
        };

        if host.is_empty()
            || !host
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'.')
        {
            return Err(malformed());
        }

        // The path goes verbatim into the request line.
        if path.bytes().any(|b| b.is_ascii_control() || b == b' ') {
            return Err(malformed());
        }

        // A bare "/" carries nothing; both spellings resolve to the root.
        let path = if path.len() <= 1 { "/" } else { path };

        Ok(Self {
            scheme,
            host: host.to_string(),
            port,
            path: path.to_string(),
        })
    }

    #[must_use]
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Request path, `/` when the URI had none.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// `host:port`, as used for the `Host` header and for connecting.
    #[must_use]
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl FromStr for Uri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}:{}{}",
            self.scheme, self.host, self.port, self.path
        )
    }
}
