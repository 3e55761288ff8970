//! tcg-gateway: HTTP gateway in front of the Pokémon TCG API

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use pokemon_tcg_mcp::config::{self, Config};
use pokemon_tcg_mcp::gateway::{router, AppState};
use pokemon_tcg_mcp::logging::{get_log_level, init_tracing};

/// HTTP gateway serving Pokémon TCG cards, sets and prices.
#[derive(Parser, Debug)]
#[command(name = "tcg-gateway")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Address to bind (overrides config)
    #[arg(long, value_name = "HOST")]
    host: Option<String>,

    /// Port to listen on (overrides config and PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut cfg = match config::load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(host) = args.host {
        cfg.gateway.host = host;
    }
    if let Some(port) = args.port {
        cfg.gateway.port = port;
    }

    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    if let Err(e) = init_tracing(log_level, cfg.logging.file.as_deref()) {
        eprintln!("Cannot open log file: {e}");
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(serve(&cfg)) {
        Ok(()) => {
            info!("Gateway shut down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Gateway error");
            ExitCode::FAILURE
        }
    }
}

async fn serve(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::from_config(cfg)?;
    let addr = format!("{}:{}", cfg.gateway.host, cfg.gateway.port);
    let listener = TcpListener::bind(&addr).await?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %listener.local_addr()?,
        upstream = %cfg.upstream.base_url,
        "Starting tcg-gateway"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let ctrl_c = tokio::signal::ctrl_c();
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received SIGINT"),
                    _ = term.recv() => info!("Received SIGTERM"),
                }
            }
            Err(e) => {
                error!(error = %e, "Cannot install SIGTERM handler");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl+C");
    }
}
