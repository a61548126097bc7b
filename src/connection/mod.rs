//! Client session management and state machine.
//!
//! ## Session Lifecycle
//!
//! 1. **Unopened** - Client created, no handshake yet
//! 2. **Open** - Handshake succeeded, frames flow
//! 3. **Closed** - `close()`, a close frame, or a fatal error released the
//!    transport; a new handshake opens a fresh session

mod state;

pub use state::ConnectionState;

#[cfg(feature = "async-tokio")]
mod client;

#[cfg(feature = "async-tokio")]
pub use client::WebSocketClient;
