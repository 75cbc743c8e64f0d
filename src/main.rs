//! Fault-injection proxy binary.
//!
//! Startup is fail-fast: parse flags, load optional config file, resolve
//! the upstream target, bind the listener. Any of those failing logs the
//! cause and exits non-zero. Per-connection errors never reach this level.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use mongo_fault_proxy::config::loader::load_config;
use mongo_fault_proxy::config::ProxyConfig;
use mongo_fault_proxy::net::{Listener, ProxyServer};
use mongo_fault_proxy::{observability, resolve, Shutdown};

#[derive(Parser)]
#[command(name = "mongo-fault-proxy")]
#[command(about = "Transparent MongoDB proxy for injecting network-level faults", long_about = None)]
struct Cli {
    /// Proxy listen address, e.g. 127.0.0.1:28017
    #[arg(short, long)]
    listen: Option<String>,

    /// Upstream server address, e.g. localhost:27017
    #[arg(short, long)]
    target: Option<String>,

    /// Upstream connection URI (mongodb:// or mongodb+srv://); wins over --target
    #[arg(long)]
    target_uri: Option<String>,

    /// Optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    observability::logging::init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to load configuration");
                return ExitCode::FAILURE;
            }
        },
        None => ProxyConfig::default(),
    };

    // flags override file values
    if let Some(listen) = cli.listen {
        config.listener.bind_address = listen;
    }
    if let Some(target) = cli.target {
        config.target.address = target;
    }
    if let Some(uri) = cli.target_uri {
        config.target.uri = Some(uri);
    }

    let target = match resolve::resolve_target(&config.target).await {
        Ok(target) => target,
        Err(e) => {
            tracing::error!(error = %e, "failed to resolve target");
            return ExitCode::FAILURE;
        }
    };

    let listener = match Listener::bind(&config.listener).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "failed to bind listen address");
            return ExitCode::FAILURE;
        }
    };

    let server = match ProxyServer::new(config, target) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize server");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = Shutdown::new();

    tokio::select! {
        _ = server.run(listener, shutdown.subscribe()) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received, shutting down");
            shutdown.trigger();
        }
    }

    tracing::info!("shutdown complete");
    ExitCode::SUCCESS
}
