use std::io;

use thiserror::Error;

/// Problems with the requested host/port configuration. Surfaced to the user
/// together with the usage text; never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("range `{0}` does not contain a '-'")]
    MissingSeparator(String),

    #[error("range `{0}` is not in format '[num]-[num]'")]
    InvalidRangeFormat(String),

    #[error("lower range part {lower} is greater than upper range part {upper}")]
    InvalidRangeOrder { lower: u16, upper: u16 },

    #[error("no ports given, use --port or --range")]
    NoPorts,
}

/// Fatal server-mode failures. A half-running listener fleet is not a state
/// the supervisor keeps alive.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("server {index} failed to bind port {port}: {source}")]
    Bind {
        index: usize,
        port: String,
        #[source]
        source: io::Error,
    },

    #[error("server {index} on port {port} stopped serving: {source}")]
    Serve {
        index: usize,
        port: String,
        #[source]
        source: io::Error,
    },
}

/// A listener that did not finish draining within the grace period.
/// Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShutdownError {
    #[error("server {index} on port {port} did not stop within {grace_ms}ms")]
    GracePeriodElapsed {
        index: usize,
        port: String,
        grace_ms: u128,
    },

    #[error("server {index} on port {port} failed while draining: {reason}")]
    Drain {
        index: usize,
        port: String,
        reason: String,
    },
}

/// The shared HTTP client for probing could not be constructed.
#[derive(Debug, Error)]
#[error("failed to build HTTP client: {0}")]
pub struct ProbeSetupError(#[from] pub reqwest::Error);
