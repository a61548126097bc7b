//! Client session lifecycle.

/// WebSocket session state.
///
/// `Unopened` only exists before the first handshake. After that a client
/// alternates between `Open` and `Closed`; a new handshake starts a fresh
/// session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No handshake has completed yet.
    #[default]
    Unopened,
    /// Handshake done, transport held, frames flow.
    Open,
    /// Transport released by `close`, a close frame, or a fatal error.
    Closed,
}

impl ConnectionState {
    /// Check if the session holds a live transport.
    #[must_use]
    #[inline]
    pub const fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    /// Check if a session existed and has ended.
    #[must_use]
    #[inline]
    pub const fn is_closed(&self) -> bool {
        matches!(self, ConnectionState::Closed)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Unopened => write!(f, "Unopened"),
            ConnectionState::Open => write!(f, "Open"),
            ConnectionState::Closed => write!(f, "Closed"),
        }
    }
}
