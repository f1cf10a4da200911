use std::fmt::Display;
use std::fs::File;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{error::ErrorKind, CommandFactory, Parser};
use time::format_description::well_known::Rfc3339;
use tracing::{error, info};
use tracing_subscriber::{fmt::time::UtcTime, EnvFilter};

use pinger::config::{Config, Mode, DEFAULT_PROBE_TIMEOUT};
use pinger::ports;
use pinger::probe::Prober;
use pinger::server::{self, Supervisor};
use pinger::types::ProbeResult;

/// pinger: probe a running pinger server, or start one to look for open TCP ports.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pinger",
    version,
    about = "Pings a running pinger server or starts a server to look for open tcp ports.",
    long_about = None
)]
struct Cli {
    /// Host to connect with. When set, pinger runs in client mode.
    #[arg(short = 's', long = "server")]
    server: Option<String>,

    /// Range of port numbers, e.g. 8080-8090. Ignored when --port is given.
    #[arg(short = 'r', long, value_parser = ports::validate_range)]
    range: Option<String>,

    /// Port to listen on (server mode) or to connect with (client mode). Repeatable.
    #[arg(short = 'p', long = "port")]
    ports: Vec<String>,

    /// Per-probe HTTP timeout in milliseconds (client mode).
    #[arg(long = "timeout-ms", default_value_t = DEFAULT_PROBE_TIMEOUT.as_millis() as u64)]
    timeout_ms: u64,

    /// Write probe results as pretty JSON to this path (client mode, optional).
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = parse_cli();
    init_logging();

    let config = Config::resolve(
        cli.server,
        cli.ports,
        cli.range.as_deref(),
        Duration::from_millis(cli.timeout_ms),
    )
    .unwrap_or_else(|e| usage_exit(e));

    // Fatal errors go through the logger so they land on stdout with the rest.
    match run(&config, cli.output.as_deref()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &Config, output: Option<&Path>) -> Result<()> {
    match config.mode() {
        Mode::Client { host } => {
            let prober = Prober::new(config.probe_timeout)?;
            let results = prober.run(host, &config.ports).await;
            if let Some(path) = output {
                if let Err(e) = write_results_json(path, &results) {
                    error!("Failed to write JSON to {}: {e:#}", path.display());
                } else {
                    info!("Wrote JSON results to {}", path.display());
                }
            }
        }
        Mode::Server => {
            let mut supervisor = Supervisor::start(&config.ports)
                .await
                .context("failed to start servers")?;
            supervisor
                .run_until(server::shutdown_signal())
                .await
                .context("server stopped unexpectedly")?;
        }
    }
    Ok(())
}

/// Argument errors print the usage and exit with status 1; help and version
/// keep clap's behaviour.
fn parse_cli() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => usage_exit(e),
    }
}

fn usage_exit(err: impl Display) -> ! {
    println!("{err}");
    println!("{}", Cli::command().render_help());
    std::process::exit(1);
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::new(Rfc3339))
        .with_target(false)
        .with_ansi(std::io::stdout().is_terminal())
        .with_writer(std::io::stdout)
        .try_init();
}

fn write_results_json(path: &Path, results: &[ProbeResult]) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, results)?;
    Ok(())
}
