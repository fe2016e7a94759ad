/// WebSocket feed for the cluster snapshot backend
///
/// Keeps a connection open with periodic pings, reconnects after a delay,
/// and forwards raw text frames. Decoding happens downstream in
/// [`crate::shared::ingest`].

use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use super::config::DEFAULT_WS_BACKEND;

/// Feed configuration
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// WebSocket server URL
    pub url: String,
    /// Ping interval to keep connection alive
    pub ping_interval: Duration,
    /// Reconnection delay after disconnect
    pub reconnect_delay: Duration,
    /// Maximum channel buffer size for frames
    pub channel_buffer_size: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WS_BACKEND.to_string(),
            ping_interval: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(2),
            channel_buffer_size: 256,
        }
    }
}

impl FeedConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_channel_buffer_size(mut self, size: usize) -> Self {
        self.channel_buffer_size = size;
        self
    }
}

/// Connection status updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Reconnecting,
}

impl ConnectionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Connected => "LIVE",
            ConnectionStatus::Disconnected => "OFFLINE",
            ConnectionStatus::Reconnecting => "CONNECTING",
        }
    }
}

/// WebSocket client producing raw snapshot frames
pub struct FeedClient {
    config: FeedConfig,
}

impl FeedClient {
    pub fn with_config(config: FeedConfig) -> Self {
        Self { config }
    }

    /// Spawn the connection loop.
    ///
    /// Returns a receiver of raw text frames and a receiver of status updates.
    /// The loop stops once the frame receiver is dropped.
    pub fn start(self) -> (mpsc::Receiver<String>, mpsc::Receiver<ConnectionStatus>) {
        let (frame_tx, frame_rx) = mpsc::channel(self.config.channel_buffer_size);
        let (status_tx, status_rx) = mpsc::channel(10);

        tokio::spawn(run_feed_loop(self.config, frame_tx, status_tx));

        (frame_rx, status_rx)
    }
}

/// Connection loop with auto-reconnect
async fn run_feed_loop(
    config: FeedConfig,
    frame_tx: mpsc::Sender<String>,
    status_tx: mpsc::Sender<ConnectionStatus>,
) {
    info!("Starting cluster feed for {}", config.url);

    loop {
        let _ = status_tx.send(ConnectionStatus::Reconnecting).await;

        match connect_async(config.url.as_str()).await {
            Ok((ws_stream, _)) => {
                info!("Connected to cluster backend at {}", config.url);
                let _ = status_tx.send(ConnectionStatus::Connected).await;

                let (mut write, mut read) = ws_stream.split();

                let ping_interval = config.ping_interval;
                let (ping_shutdown_tx, mut ping_shutdown_rx) = mpsc::channel::<()>(1);

                tokio::spawn(async move {
                    let mut interval = tokio::time::interval(ping_interval);
                    loop {
                        tokio::select! {
                            _ = interval.tick() => {
                                if write.send(Message::Ping(vec![].into())).await.is_err() {
                                    debug!("Failed to send ping, connection likely dead");
                                    break;
                                }
                            }
                            _ = ping_shutdown_rx.recv() => {
                                debug!("Ping task shutting down");
                                break;
                            }
                        }
                    }
                });

                let mut receiver_gone = false;
                while let Some(msg) = read.next().await {
                    match msg {
                        Ok(Message::Text(text)) => {
                            if frame_tx.send(text.as_str().to_owned()).await.is_err() {
                                warn!("Frame receiver dropped, stopping feed");
                                receiver_gone = true;
                                break;
                            }
                        }
                        Ok(Message::Close(_)) => {
                            info!("Server closed connection");
                            break;
                        }
                        Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                        Err(e) => {
                            error!("WebSocket error: {}", e);
                            break;
                        }
                        _ => {}
                    }
                }

                let _ = ping_shutdown_tx.send(()).await;
                let _ = status_tx.send(ConnectionStatus::Disconnected).await;

                if receiver_gone {
                    return;
                }
                warn!("Connection closed, will reconnect...");
            }
            Err(e) => {
                error!("Failed to connect to {}: {}", config.url, e);
                let _ = status_tx.send(ConnectionStatus::Disconnected).await;
            }
        }

        if frame_tx.is_closed() {
            return;
        }

        debug!("Waiting {:?} before reconnecting...", config.reconnect_delay);
        tokio::time::sleep(config.reconnect_delay).await;
    }
}
