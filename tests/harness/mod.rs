//! Test harness for client integration tests.
//!
//! A loopback mock server that speaks just enough RFC 6455 to drive the
//! client: it reads the upgrade request, answers with a canned or computed
//! response, then exchanges unmasked server frames.

#![allow(dead_code)]

mod server;

pub use server::{MockServer, Peer, switching_protocols};
