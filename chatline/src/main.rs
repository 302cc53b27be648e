//! `Chatline`: terminal chat client.
//!
//! Connects to a chat server, joins the default room, and turns stdin lines
//! into messages. Configuration via CLI flags, environment variables, or
//! config file (`~/.config/chatline/config.toml`).
//!
//! ```bash
//! cargo run --bin chatline -- --username alice
//!
//! CHATLINE_URL=ws://127.0.0.1:8000/v1/chat CHATLINE_USER=bob cargo run --bin chatline
//! ```
//!
//! Commands: `/join <room>`, `/members`, `/quit`.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_appender::non_blocking::WorkerGuard;

use chatline::app::{App, InputAction, parse_input};
use chatline::config::{CliArgs, ClientConfig};
use chatline::net::{self, ChatClient, NetConfig};
use chatline::view::ViewEvent;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Logs go to a file; stdout is the transcript.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    let net_config = match config.to_net_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(user = %net_config.username, url = %net_config.server_url, "chatline starting");
    run(&net_config, App::new(config.timestamp_format)).await;
    tracing::info!("chatline exiting");
    ExitCode::SUCCESS
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("chatline.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Pump stdin into the session and view updates onto stdout until `/quit`
/// or end of input.
async fn run(net_config: &NetConfig, mut app: App) {
    let (client, mut view_rx) = net::spawn_net(net_config);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if !handle_line(&client, &app, &line).await {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(err = %e, "stdin read failed");
                    break;
                }
            },
            Some(event) = view_rx.recv() => print_event(&mut app, event),
        }
    }

    client.dispose().await;
    // Flush whatever the shutdown produced ("You have been disconnected.").
    while let Ok(event) = view_rx.try_recv() {
        print_event(&mut app, event);
    }
}

/// Act on one input line. Returns `false` when the user wants to quit.
async fn handle_line(client: &ChatClient, app: &App, line: &str) -> bool {
    match parse_input(line) {
        InputAction::Send(text) => client.send_message(text).await,
        InputAction::Join(room) => client.change_room(room).await,
        InputAction::Members => {
            println!("{}", app.members_line());
            true
        }
        InputAction::Invalid(msg) => {
            eprintln!("{msg}");
            true
        }
        InputAction::Ignore => true,
        InputAction::Quit => false,
    }
}

fn print_event(app: &mut App, event: ViewEvent) {
    if let Some(line) = app.apply(event, &chrono::Local::now()) {
        println!("{line}");
    }
}
