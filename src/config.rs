//! Configuration and limits for WebSocket client sessions.

use std::path::PathBuf;

/// Resource limits for a client session.
///
/// These bound how much memory a misbehaving or hostile server can make the
/// client allocate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum payload size of a single received frame in bytes.
    ///
    /// A larger announced length closes the session with code 1009.
    ///
    /// Default: 16 MB (16 * 1024 * 1024)
    pub max_frame_size: usize,

    /// Maximum size of the handshake response (status line plus headers).
    ///
    /// Default: 8 KB (8192)
    pub max_handshake_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_frame_size: 16 * 1024 * 1024, // 16 MB
            max_handshake_size: 8192,
        }
    }
}

impl Limits {
    /// Create new limits with custom values.
    #[must_use]
    pub const fn new(max_frame_size: usize, max_handshake_size: usize) -> Self {
        Self {
            max_frame_size,
            max_handshake_size,
        }
    }

    /// Create limits suitable for small embedded systems.
    ///
    /// - Max frame: 64 KB
    /// - Max handshake: 4 KB
    #[must_use]
    pub const fn embedded() -> Self {
        Self {
            max_frame_size: 64 * 1024,
            max_handshake_size: 4096,
        }
    }

    /// Validate that handshake size is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandshakeTooLarge`](crate::Error::HandshakeTooLarge) if `size` exceeds the configured maximum.
    pub const fn check_handshake_size(&self, size: usize) -> Result<(), crate::Error> {
        if size > self.max_handshake_size {
            Err(crate::Error::HandshakeTooLarge {
                size,
                max: self.max_handshake_size,
            })
        } else {
            Ok(())
        }
    }
}

/// Server certificate verification for `wss` targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifyMode {
    /// Accept any server certificate.
    ///
    /// The client is expected to talk to one known server, so this is the
    /// default.
    #[default]
    None,
    /// Verify the chain against `ca_file`, or the bundled web PKI roots when
    /// no CA file is given, and check the host name.
    Required,
}

/// TLS material used when the target scheme is `wss`.
///
/// Only consulted when the crate is built with the `tls-rustls` feature.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsOptions {
    /// PEM file with trusted CA certificates.
    pub ca_file: Option<PathBuf>,
    /// PEM client certificate chain, sent when the server asks for one.
    pub cert_file: Option<PathBuf>,
    /// PEM private key matching `cert_file`.
    pub key_file: Option<PathBuf>,
    /// Server certificate verification.
    pub verify: VerifyMode,
}

impl TlsOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust the CA certificates in `path`.
    #[must_use]
    pub fn with_ca_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_file = Some(path.into());
        self
    }

    /// Present a client certificate.
    #[must_use]
    pub fn with_client_identity(
        mut self,
        cert_file: impl Into<PathBuf>,
        key_file: impl Into<PathBuf>,
    ) -> Self {
        self.cert_file = Some(cert_file.into());
        self.key_file = Some(key_file.into());
        self
    }

    #[must_use]
    pub const fn with_verify(mut self, verify: VerifyMode) -> Self {
        self.verify = verify;
        self
    }
}

/// WebSocket client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Resource limits.
    pub limits: Limits,

    /// Read buffer size (in bytes).
    ///
    /// Initial capacity of the receive buffer; it grows for larger frames.
    ///
    /// Default: 8 KB (8192)
    pub read_buffer_size: usize,

    /// Write buffer size (in bytes).
    ///
    /// Initial capacity of the frame encode buffer.
    ///
    /// Default: 8 KB (8192)
    pub write_buffer_size: usize,

    /// Check the server's `Sec-WebSocket-Accept` against the key we sent.
    ///
    /// Off by default: the client trusts its configured server. Turn it on
    /// when talking to servers you do not control.
    ///
    /// Default: false
    pub verify_accept: bool,

    /// TLS settings for `wss` targets.
    pub tls: TlsOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            read_buffer_size: 8192,
            write_buffer_size: 8192,
            verify_accept: false,
            tls: TlsOptions::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for small devices: embedded limits and 1 KB buffers.
    #[must_use]
    pub fn embedded() -> Self {
        Self {
            limits: Limits::embedded(),
            read_buffer_size: 1024,
            write_buffer_size: 1024,
            ..Default::default()
        }
    }

    /// Set custom limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set read buffer size.
    #[must_use]
    pub const fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Set write buffer size.
    #[must_use]
    pub const fn with_write_buffer_size(mut self, size: usize) -> Self {
        self.write_buffer_size = size;
        self
    }

    /// Enable or disable `Sec-WebSocket-Accept` verification.
    #[must_use]
    pub const fn with_verify_accept(mut self, verify: bool) -> Self {
        self.verify_accept = verify;
        self
    }

    /// Set TLS options.
    #[must_use]
    pub fn with_tls(mut self, tls: TlsOptions) -> Self {
        self.tls = tls;
        self
    }
}
