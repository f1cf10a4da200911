use std::time::Duration;

use crate::{error::ConfigError, ports};

/// Finite upper bound for a single probe; the HTTP client is never left to
/// wait indefinitely.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Validated startup configuration. Built once, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: Option<String>,
    pub ports: Vec<String>,
    pub probe_timeout: Duration,
}

/// What the process does with its ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode<'a> {
    Client { host: &'a str },
    Server,
}

impl Config {
    /// Combine the raw CLI values into a configuration.
    ///
    /// Explicit ports take priority over the range. An empty host counts as
    /// no host. Fails with [`ConfigError::NoPorts`] when neither source yields
    /// a port.
    pub fn resolve(
        host: Option<String>,
        ports: Vec<String>,
        range: Option<&str>,
        probe_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let ports = match (ports.is_empty(), range) {
            (false, _) => ports,
            (true, Some(r)) if !r.is_empty() => ports::parse_range(r)?,
            _ => Vec::new(),
        };
        if ports.is_empty() {
            return Err(ConfigError::NoPorts);
        }

        Ok(Self {
            host: host.filter(|h| !h.is_empty()),
            ports,
            probe_timeout,
        })
    }

    pub fn mode(&self) -> Mode<'_> {
        match self.host.as_deref() {
            Some(host) => Mode::Client { host },
            None => Mode::Server,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ports_win_over_range() {
        let cfg = Config::resolve(None, strings(&["22"]), Some("80-81"), DEFAULT_PROBE_TIMEOUT)
            .unwrap();
        assert_eq!(cfg.ports, strings(&["22"]));
        assert_eq!(cfg.mode(), Mode::Server);
    }

    #[test]
    fn range_used_when_no_ports() {
        let cfg = Config::resolve(
            Some("example.org".into()),
            Vec::new(),
            Some("80-81"),
            DEFAULT_PROBE_TIMEOUT,
        )
        .unwrap();
        assert_eq!(cfg.ports, strings(&["80", "81"]));
        assert_eq!(cfg.mode(), Mode::Client { host: "example.org" });
    }

    #[test]
    fn empty_host_means_server_mode() {
        let cfg =
            Config::resolve(Some(String::new()), strings(&["1"]), None, DEFAULT_PROBE_TIMEOUT)
                .unwrap();
        assert_eq!(cfg.host, None);
        assert_eq!(cfg.mode(), Mode::Server);
    }

    #[test]
    fn no_ports_is_an_error() {
        assert_eq!(
            Config::resolve(None, Vec::new(), None, DEFAULT_PROBE_TIMEOUT),
            Err(ConfigError::NoPorts)
        );
        assert_eq!(
            Config::resolve(None, Vec::new(), Some(""), DEFAULT_PROBE_TIMEOUT),
            Err(ConfigError::NoPorts)
        );
    }

    #[test]
    fn bad_range_propagates() {
        assert!(matches!(
            Config::resolve(None, Vec::new(), Some("9-1"), DEFAULT_PROBE_TIMEOUT),
            Err(ConfigError::InvalidRangeOrder { .. })
        ));
    }
}
