//! `Chatline` server: in-memory chat rooms over WebSocket.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:8000
//! cargo run --bin chatline-server
//!
//! # Run on custom address
//! cargo run --bin chatline-server -- --bind 127.0.0.1:8080
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use chatline_server::config::{ServerCliArgs, ServerConfig};
use chatline_server::server::{self, CHAT_PATH, ServerState};
use clap::Parser;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = ServerCliArgs::parse();

    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .init();

    tracing::info!(addr = %config.bind_addr, "starting chatline server");

    let state = Arc::new(ServerState::with_config(config.max_message_len));
    match server::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, path = CHAT_PATH, "chat server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "chat server task failed");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start chat server");
            ExitCode::FAILURE
        }
    }
}
