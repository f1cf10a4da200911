use std::{
    future::Future,
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr},
    time::Duration,
};

use axum::{extract::State, http::StatusCode, response::IntoResponse, Router};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::{
    net::TcpListener,
    sync::mpsc,
    task::JoinHandle,
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::{
    error::{ServerError, ShutdownError},
    types::ShutdownReport,
};

/// How long draining listeners get before they are reported and aborted.
pub const GRACE_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Starting,
    Running,
    Draining,
    Stopped,
}

/// Read-only identity handed to every request of one listener.
#[derive(Debug, Clone)]
struct ListenerInfo {
    index: usize,
    port: String,
}

/// Router for one listener: every method and path gets `200 Ok`.
pub fn router(index: usize, port: &str) -> Router {
    Router::new()
        .fallback(handle_any)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(ListenerInfo {
            index,
            port: port.to_string(),
        })
}

async fn handle_any(State(listener): State<ListenerInfo>) -> impl IntoResponse {
    info!(
        "Receiving connection for server {} on port {}",
        listener.index, listener.port
    );
    (StatusCode::OK, "Ok")
}

/// A bound but not yet serving socket.
struct Listener {
    info: ListenerInfo,
    socket: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind `port` on every interface. The IPv6 wildcard is tried first with
    /// `IPV6_V6ONLY` off so IPv4 peers are accepted on the same socket; hosts
    /// without IPv6 fall back to `0.0.0.0`. The logged port is the bound one.
    async fn bind(index: usize, port: &str) -> Result<Self, ServerError> {
        let bind_err = |source| ServerError::Bind {
            index,
            port: port.to_string(),
            source,
        };
        let num: u16 = port.parse().map_err(|e| {
            bind_err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid port `{port}`: {e}"),
            ))
        })?;

        let socket = match dual_stack_listener(num) {
            Ok(std_listener) => TcpListener::from_std(std_listener).map_err(bind_err)?,
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => return Err(bind_err(e)),
            Err(_) => TcpListener::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, num)))
                .await
                .map_err(bind_err)?,
        };
        let local_addr = socket.local_addr().map_err(bind_err)?;
        Ok(Self {
            info: ListenerInfo {
                index,
                port: local_addr.port().to_string(),
            },
            socket,
            local_addr,
        })
    }

    /// Start serving on its own task. A serving error before cancellation is
    /// forwarded to the supervisor as fatal.
    fn spawn(self, fatal: mpsc::UnboundedSender<ServerError>) -> ListenerHandle {
        let Listener {
            info,
            socket,
            local_addr,
        } = self;
        let cancel = CancellationToken::new();
        let app = router(info.index, &info.port);

        let task = {
            let cancel = cancel.clone();
            let info = info.clone();
            tokio::spawn(async move {
                let res = axum::serve(socket, app)
                    .with_graceful_shutdown(cancel.clone().cancelled_owned())
                    .await;
                if let Err(e) = &res {
                    if !cancel.is_cancelled() {
                        let _ = fatal.send(ServerError::Serve {
                            index: info.index,
                            port: info.port.clone(),
                            source: io::Error::new(e.kind(), e.to_string()),
                        });
                    }
                }
                res
            })
        };

        ListenerHandle {
            info,
            local_addr,
            cancel,
            task,
        }
    }
}

fn dual_stack_listener(port: u16) -> io::Result<std::net::TcpListener> {
    let socket = Socket::new(Domain::IPV6, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_only_v6(false)?;
    #[cfg(unix)]
    socket.set_reuse_address(true)?;
    socket.bind(&SocketAddr::from((Ipv6Addr::UNSPECIFIED, port)).into())?;
    socket.listen(1024)?;
    socket.set_nonblocking(true)?;
    Ok(socket.into())
}

/// Name this machine is reachable under, `0.0.0.0` when it cannot be read.
pub fn hostname() -> String {
    #[cfg(unix)]
    {
        let mut buf = [0u8; 256];
        let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
        if rc == 0 {
            let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
            if let Ok(name) = std::str::from_utf8(&buf[..end]) {
                if !name.is_empty() {
                    return name.to_string();
                }
            }
        }
    }
    "0.0.0.0".to_string()
}

/// Supervisor-owned handle to one running listener.
struct ListenerHandle {
    info: ListenerInfo,
    local_addr: SocketAddr,
    cancel: CancellationToken,
    task: JoinHandle<io::Result<()>>,
}

/// Owns one listener per configured port and drives their lifecycle:
/// `Starting -> Running -> Draining -> Stopped`.
pub struct Supervisor {
    listeners: Vec<ListenerHandle>,
    fatal_rx: mpsc::UnboundedReceiver<ServerError>,
    state: SupervisorState,
    grace: Duration,
}

impl Supervisor {
    /// Bind and start one listener per port, in order, numbered from 1.
    ///
    /// Fails on the first port that cannot be bound; listeners started before
    /// it are cancelled.
    pub async fn start(ports: &[String]) -> Result<Self, ServerError> {
        Self::start_with_grace(ports, GRACE_PERIOD).await
    }

    pub async fn start_with_grace(ports: &[String], grace: Duration) -> Result<Self, ServerError> {
        info!("running in server mode");

        let (fatal_tx, fatal_rx) = mpsc::unbounded_channel();
        let mut supervisor = Self {
            listeners: Vec::with_capacity(ports.len()),
            fatal_rx,
            state: SupervisorState::Starting,
            grace,
        };

        let host = hostname();
        for (i, port) in ports.iter().enumerate() {
            let listener = Listener::bind(i + 1, port).await?;
            info!(
                "Server {} listening on http://{}:{}",
                listener.info.index,
                host,
                listener.info.port
            );
            supervisor.listeners.push(listener.spawn(fatal_tx.clone()));
        }

        supervisor.state = SupervisorState::Running;
        Ok(supervisor)
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Bound addresses in port order. Empty once stopped.
    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        self.listeners.iter().map(|l| l.local_addr).collect()
    }

    /// Serve until `signal` resolves, then drain.
    ///
    /// Returns early with the error if any listener fails while serving.
    pub async fn run_until<F>(&mut self, signal: F) -> Result<ShutdownReport, ServerError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            _ = signal => {}
            Some(err) = self.fatal_rx.recv() => {
                self.cancel_all();
                self.state = SupervisorState::Stopped;
                return Err(err);
            }
        }
        Ok(self.shutdown().await)
    }

    /// Ask every listener to stop and wait for them against one shared
    /// deadline. A listener that misses it is aborted and reported; the
    /// others are still awaited.
    pub async fn shutdown(&mut self) -> ShutdownReport {
        if self.state == SupervisorState::Stopped {
            return ShutdownReport::default();
        }
        self.state = SupervisorState::Draining;
        info!("Shutting down the servers...");

        let deadline = Instant::now() + self.grace;
        let listeners = std::mem::take(&mut self.listeners);
        for l in &listeners {
            l.cancel.cancel();
        }

        let mut report = ShutdownReport::default();
        for mut l in listeners {
            let index = l.info.index;
            let port = l.info.port.clone();
            let failure = match time::timeout_at(deadline, &mut l.task).await {
                Ok(Ok(Ok(()))) => None,
                Ok(Ok(Err(e))) => Some(ShutdownError::Drain {
                    index,
                    port,
                    reason: e.to_string(),
                }),
                Ok(Err(e)) => Some(ShutdownError::Drain {
                    index,
                    port,
                    reason: e.to_string(),
                }),
                Err(_) => {
                    l.task.abort();
                    Some(ShutdownError::GracePeriodElapsed {
                        index,
                        port,
                        grace_ms: self.grace.as_millis(),
                    })
                }
            };
            match failure {
                Some(e) => {
                    error!("Error shutting down server: {e}");
                    report.failed.push(e);
                }
                None => report.stopped += 1,
            }
        }

        self.state = SupervisorState::Stopped;
        info!("Servers are stopped");
        report
    }

    fn cancel_all(&self) {
        for l in &self.listeners {
            l.cancel.cancel();
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

/// Resolves on the first SIGINT or SIGTERM.
///
/// The handlers stay installed afterwards, so later signals are absorbed
/// instead of killing the process mid-drain.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
