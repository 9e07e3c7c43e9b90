//! `devapi` - run a device exposing demo entities over the native API.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
#[cfg(feature = "prometheus")]
use devapi_runner::RunnerError;
use devapi_runner::{logging, App, ExitReason, Overrides, RunnerConfig, RunnerResult, TcpServer};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "devapi")]
#[command(version, about, long_about = None)]
struct Args {
    /// Device file (YAML). Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// TCP port, overriding the device file.
    #[arg(short, long)]
    port: Option<u16>,

    /// API password, overriding the device file.
    #[arg(long)]
    password: Option<String>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Serve Prometheus metrics on this port.
    #[cfg(feature = "prometheus")]
    #[arg(long)]
    metrics_port: Option<u16>,
}

fn run(args: Args) -> RunnerResult<ExitReason> {
    let logs = logging::init(&args.log_level)?;
    #[cfg(feature = "prometheus")]
    if let Some(port) = args.metrics_port {
        devapi_metrics::install_prometheus(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
            .map_err(|e| RunnerError::Metrics(e.to_string()))?;
    }
    devapi_metrics::describe_metrics();

    let mut config = match &args.config {
        Some(path) => RunnerConfig::load(path)?,
        None => RunnerConfig::default(),
    };
    config.apply(&Overrides {
        port: args.port,
        password: args.password.clone(),
    });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.server.port));
    let tcp = TcpServer::start(runtime.handle().clone(), addr)?;

    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::Release))?;

    let mut app = App::new(config, Some(logs))?;
    let reason = app.run(&tcp, &stop);
    info!("Main loop finished: {:?}", reason);
    Ok(reason)
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(ExitReason::Shutdown) => ExitCode::SUCCESS,
        // A supervisor is expected to restart the process.
        Ok(ExitReason::RebootRequested) => ExitCode::from(3),
        Err(e) => {
            error!("{}", e);
            eprintln!("devapi: {e}");
            ExitCode::FAILURE
        }
    }
}
