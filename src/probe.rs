use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::{error::ProbeSetupError, types::ProbeResult};

/// Client-mode prober: one HTTP GET per port, all in flight at once.
///
/// The underlying `reqwest::Client` is shared by every worker so connection
/// setup state and the timeout are configured in one place.
#[derive(Clone, Debug)]
pub struct Prober {
    client: reqwest::Client,
}

impl Prober {
    /// Build a prober whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, ProbeSetupError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Probe `host` on every port concurrently and wait for all of them.
    ///
    /// - No concurrency cap: every worker is spawned before any is awaited.
    /// - Individual failures are logged by the worker and never abort siblings.
    /// - Results come back in completion order.
    pub async fn run(&self, host: &str, ports: &[String]) -> Vec<ProbeResult> {
        info!("running in client mode");

        let mut set = JoinSet::new();
        for port in ports {
            let prober = self.clone();
            let host = host.to_string();
            let port = port.clone();
            set.spawn(async move { prober.probe(&host, &port).await });
        }

        let mut results = Vec::with_capacity(ports.len());
        while let Some(res) = set.join_next().await {
            match res {
                Ok(result) => results.push(result),
                Err(e) => warn!("probe worker did not complete: {e}"),
            }
        }
        results
    }

    /// Issue a single GET against `http://{host}:{port}/`.
    ///
    /// Any response counts as success regardless of status code; only a
    /// transport error (refused, unreachable, timed out) is a failure.
    pub async fn probe(&self, host: &str, port: &str) -> ProbeResult {
        let url = probe_url(host, port);
        let success = match self.client.get(&url).send().await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(%url, error = %e, "probe failed");
                false
            }
        };

        if success {
            info!("Connection to {url}: Success");
        } else {
            info!("Connection to {url}: Failed");
        }
        ProbeResult { url, success }
    }
}

pub fn probe_url(host: &str, port: &str) -> String {
    format!("http://{host}:{port}/")
}
