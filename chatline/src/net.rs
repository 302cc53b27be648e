//! Async driver for the chat session.
//!
//! [`ChatClient::spawn`] moves a [`ChatSessionController`] onto a background
//! tokio task that owns it exclusively. The task multiplexes three sources
//! in one `select!` loop:
//!
//! ```text
//! session events ─┐
//! timer ticks ────┼──▶ driver task ──▶ ChatSessionController ──▶ ViewEvent channel
//! NetCommand ─────┘
//! ```
//!
//! Because only the driver touches the controller, session events, timer
//! ticks, and commands are applied strictly one at a time.

use std::time::Duration;

use chatline_proto::room::RoomName;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

use crate::controller::ChatSessionController;
use crate::timers::{
    DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_RECONNECT_INTERVAL, PeriodicTask, TICK_CHANNEL_CAPACITY,
    Tick,
};
use crate::transport::Transport;
use crate::transport::ws::{DEFAULT_CONNECT_TIMEOUT, WsTransport};
use crate::view::{ChannelView, ViewEvent};

/// Default channel capacity for user commands.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// How long shutdown waits for the connection to confirm its close.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Commands sent from the user-facing loop to the driver task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetCommand {
    /// Post a message to the current room.
    SendMessage {
        /// The message text.
        text: String,
    },
    /// Switch to another room.
    ChangeRoom {
        /// The room to join.
        room: RoomName,
    },
    /// Close the connection and stop the driver.
    Shutdown,
}

/// Configuration for the networking layer.
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// Chat endpoint, e.g. `ws://127.0.0.1:8000/v1/chat`.
    pub server_url: Url,
    /// Name this client connects as.
    pub username: String,
    /// Room joined every time a connection opens.
    pub default_room: RoomName,
    /// Period between pings while connected.
    pub heartbeat_interval: Duration,
    /// Period between checks for a closed connection.
    pub reconnect_interval: Duration,
    /// Upper bound on a single connection attempt.
    pub connect_timeout: Duration,
    /// Capacity of the command channel.
    pub channel_capacity: usize,
}

impl NetConfig {
    /// Creates a `NetConfig` with default timings.
    #[must_use]
    pub fn new(server_url: Url, username: impl Into<String>) -> Self {
        Self {
            server_url,
            username: username.into(),
            default_room: RoomName::general(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Handle to a running chat session.
///
/// Dropping the handle closes the command channel, which shuts the driver
/// down the same way [`ChatClient::dispose`] does.
#[derive(Debug)]
pub struct ChatClient {
    commands: mpsc::Sender<NetCommand>,
    driver: JoinHandle<()>,
}

impl ChatClient {
    /// Start a session over `transport` on the current runtime.
    ///
    /// Returns the handle plus the receiver all view updates arrive on.
    pub fn spawn<T: Transport>(
        transport: T,
        config: &NetConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ViewEvent>) {
        let (view, view_rx) = ChannelView::channel();
        let (cmd_tx, cmd_rx) = mpsc::channel(config.channel_capacity);
        let controller = ChatSessionController::new(transport, view, config.default_room.clone());
        let driver = tokio::spawn(run_driver(
            controller,
            cmd_rx,
            config.heartbeat_interval,
            config.reconnect_interval,
        ));
        (
            Self {
                commands: cmd_tx,
                driver,
            },
            view_rx,
        )
    }

    /// Return a sender for issuing commands from elsewhere.
    #[must_use]
    pub fn commands(&self) -> mpsc::Sender<NetCommand> {
        self.commands.clone()
    }

    /// Post `text` to the current room.
    ///
    /// Returns `false` if the driver has already stopped.
    pub async fn send_message(&self, text: impl Into<String>) -> bool {
        self.command(NetCommand::SendMessage { text: text.into() })
            .await
    }

    /// Switch to `room`.
    ///
    /// Returns `false` if the driver has already stopped.
    pub async fn change_room(&self, room: RoomName) -> bool {
        self.command(NetCommand::ChangeRoom { room }).await
    }

    /// Stop timers, close the connection, and wait for the driver to exit.
    pub async fn dispose(self) {
        let _ = self.commands.send(NetCommand::Shutdown).await;
        if let Err(e) = self.driver.await {
            tracing::warn!(err = %e, "chat driver task failed");
        }
    }

    async fn command(&self, cmd: NetCommand) -> bool {
        self.commands.send(cmd).await.is_ok()
    }
}

/// Connect to `config.server_url` over WebSocket and start a session.
pub fn spawn_net(config: &NetConfig) -> (ChatClient, mpsc::UnboundedReceiver<ViewEvent>) {
    let transport = WsTransport::new(&config.server_url, &config.username, config.connect_timeout);
    tracing::info!(url = %transport.url(), "starting chat session");
    ChatClient::spawn(transport, config)
}

/// Background task: own the controller and feed it events until shutdown.
async fn run_driver<T: Transport>(
    mut controller: ChatSessionController<T, ChannelView>,
    mut cmd_rx: mpsc::Receiver<NetCommand>,
    heartbeat_interval: Duration,
    reconnect_interval: Duration,
) {
    let (tick_tx, mut tick_rx) = mpsc::channel(TICK_CHANNEL_CAPACITY);
    let mut heartbeat = PeriodicTask::spawn(heartbeat_interval, Tick::Heartbeat, tick_tx.clone());
    let mut reconnect = PeriodicTask::spawn(reconnect_interval, Tick::ReconnectPoll, tick_tx);

    loop {
        tokio::select! {
            event = controller.session_mut().next_event() => {
                controller.handle_session_event(event);
            }
            Some(tick) = tick_rx.recv() => match tick {
                Tick::Heartbeat => {
                    controller.heartbeat_tick();
                }
                Tick::ReconnectPoll => {
                    controller.reconnect_tick();
                }
            },
            cmd = cmd_rx.recv() => match cmd {
                Some(NetCommand::SendMessage { text }) => {
                    controller.send_message(text);
                }
                Some(NetCommand::ChangeRoom { room }) => controller.change_room(room),
                Some(NetCommand::Shutdown) | None => break,
            },
        }
    }

    tracing::info!("chat driver shutting down");
    heartbeat.cancel();
    reconnect.cancel();
    controller.dispose();

    let confirmed = tokio::time::timeout(DEFAULT_SHUTDOWN_TIMEOUT, async {
        while !controller.session().is_closed() {
            let event = controller.session_mut().next_event().await;
            controller.handle_session_event(event);
        }
    })
    .await;
    if confirmed.is_err() {
        tracing::debug!("connection did not confirm close before timeout");
    }
}
