//! Library crate for pinger: port range expansion, concurrent HTTP probing and
//! the per-port listener supervisor.
pub mod config;
pub mod error;
pub mod ports;
pub mod probe;
pub mod server;
pub mod types;
