//! tcg-bridge: framed JSON-RPC tool bridge for the Pokémon TCG gateway
//!
//! Reads Content-Length framed requests on stdin, forwards tool calls to the
//! data gateway and writes framed responses on stdout. Logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use pokemon_tcg_mcp::config;
use pokemon_tcg_mcp::logging::{get_log_level, init_tracing};
use pokemon_tcg_mcp::mcp::server::McpServer;
use pokemon_tcg_mcp::mcp::tools::ToolRunner;
use pokemon_tcg_mcp::mcp::upstream::GatewayClient;

/// Framed JSON-RPC bridge exposing Pokémon TCG data as tools.
///
/// Speak the protocol on stdin/stdout; every tool call is forwarded to the
/// data gateway.
#[derive(Parser, Debug)]
#[command(name = "tcg-bridge")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Gateway base URL (overrides config and TCG_GATEWAY_URL)
    #[arg(long, value_name = "URL")]
    gateway_url: Option<String>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Entry point for the bridge.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let mut cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(url) = args.gateway_url {
        cfg.bridge.gateway_url = url;
    }

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    if let Err(e) = init_tracing(log_level, cfg.logging.file.as_deref()) {
        eprintln!("Cannot open log file: {e}");
        return ExitCode::FAILURE;
    }

    let gateway = match GatewayClient::from_config(&cfg.bridge) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Invalid gateway settings");
            return ExitCode::FAILURE;
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        gateway = %gateway.base_url(),
        "Starting tcg-bridge"
    );

    // Strictly sequential: one message is fully handled before the next read.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let tools = ToolRunner::new(gateway);
    match runtime.block_on(async { McpServer::stdio(tools).run().await }) {
        Ok(()) => {
            info!("Bridge shut down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Bridge stopped on a transport error");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
