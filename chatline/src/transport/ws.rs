//! WebSocket transport for `Chatline`.
//!
//! Each [`Transport::open`] spawns one background task that connects to the
//! chat server, reports `Open`, then pumps text frames in both directions
//! until either side closes. Every exit path ends with exactly one `Close`
//! or `Error` signal.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use super::{Outbound, Transport, TransportError, TransportLink, TransportSignal, TransportTask};

/// Default timeout for establishing the WebSocket connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Query parameter carrying the username on the upgrade request.
pub const USERNAME_PARAM: &str = "username";

/// WebSocket transport implementing the [`Transport`] trait.
#[derive(Debug, Clone)]
pub struct WsTransport {
    /// Full endpoint URL, including the username query parameter.
    url: Url,
    /// Upper bound on the TCP + WebSocket handshake.
    connect_timeout: Duration,
}

impl WsTransport {
    /// Create a transport that connects to `server_url` as `username`.
    #[must_use]
    pub fn new(server_url: &Url, username: &str, connect_timeout: Duration) -> Self {
        let mut url = server_url.clone();
        url.query_pairs_mut().append_pair(USERNAME_PARAM, username);
        Self {
            url,
            connect_timeout,
        }
    }

    /// Return the endpoint URL this transport connects to.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }
}

impl Transport for WsTransport {
    fn open(&self, link: TransportLink) -> TransportTask {
        TransportTask::spawn(drive(self.url.clone(), self.connect_timeout, link))
    }
}

/// Connect, then pump frames until the connection ends.
async fn drive(url: Url, connect_timeout: Duration, link: TransportLink) {
    let TransportLink {
        signals,
        mut outbound,
    } = link;

    let ws_stream = match tokio::time::timeout(connect_timeout, connect_async(url.as_str())).await
    {
        Ok(Ok((stream, _response))) => stream,
        Ok(Err(e)) => {
            tracing::warn!(url = %url, err = %e, "websocket connect failed");
            let _ = signals.send(TransportSignal::Error(map_ws_connect_error(&url, e)));
            return;
        }
        Err(_) => {
            tracing::warn!(url = %url, "websocket connect timed out");
            let _ = signals.send(TransportSignal::Error(TransportError::Timeout));
            return;
        }
    };

    tracing::info!(url = %url, "websocket connected");
    if signals.send(TransportSignal::Open).is_err() {
        // Session dropped while we were connecting.
        return;
    }

    let (mut ws_sender, mut ws_reader) = ws_stream.split();

    let terminal = loop {
        tokio::select! {
            out = outbound.recv() => match out {
                Some(Outbound::Frame(text)) => {
                    if let Err(e) = ws_sender.send(Message::Text(text.into())).await {
                        tracing::warn!(err = %e, "websocket send failed");
                        break TransportSignal::Error(TransportError::Protocol(e.to_string()));
                    }
                }
                Some(Outbound::Close) | None => {
                    tracing::debug!("closing websocket on request");
                    if let Err(e) = ws_sender.close().await {
                        tracing::debug!(err = %e, "websocket close handshake failed");
                    }
                    break TransportSignal::Close;
                }
            },
            msg = ws_reader.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if signals.send(TransportSignal::Frame(text.as_str().to_owned())).is_err() {
                        return;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(?frame, "websocket closed by server");
                    break TransportSignal::Close;
                }
                Some(Ok(
                    Message::Binary(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_),
                )) => {
                    // Only text frames carry events; tungstenite answers pings itself.
                }
                Some(Err(e)) => {
                    tracing::warn!(err = %e, "websocket read error");
                    break TransportSignal::Error(TransportError::Protocol(e.to_string()));
                }
                None => {
                    tracing::info!("websocket stream ended");
                    break TransportSignal::Close;
                }
            },
        }
    };

    let _ = signals.send(terminal);
}

/// Map a `tokio_tungstenite` connection error to a [`TransportError`].
fn map_ws_connect_error(url: &Url, err: tokio_tungstenite::tungstenite::Error) -> TransportError {
    use tokio_tungstenite::tungstenite::Error as WsError;
    match err {
        WsError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::ConnectionRefused
                || io_err.kind() == std::io::ErrorKind::AddrNotAvailable
            {
                TransportError::Unreachable(url.to_string())
            } else {
                TransportError::Io(io_err)
            }
        }
        WsError::Http(response) => TransportError::Protocol(format!(
            "server rejected upgrade: status {}",
            response.status()
        )),
        other => TransportError::Protocol(other.to_string()),
    }
}
