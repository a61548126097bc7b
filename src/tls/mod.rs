//! TLS support for `wss` targets.
//!
//! Built on rustls (feature `tls-rustls`). The settings come from
//! [`TlsOptions`](crate::config::TlsOptions); by default the server
//! certificate is not verified.

mod rustls_impl;

pub use rustls_impl::{
    TlsStream, client_config, connect, load_certs_from_file, load_private_key_from_file,
};
