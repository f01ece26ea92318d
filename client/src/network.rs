//! WebSocket connection task.
//!
//! Owns the socket and nothing else. Inbound text frames are decoded into
//! envelopes and handed to the dispatch loop; outbound envelopes come from
//! the [`EventChannel`](crate::transport::EventChannel) queue. The task
//! reconnects forever with a fixed delay and reports every transition so the
//! core can re-subscribe and re-join. Nothing is replayed across a reconnect.

use crate::error::ClientError;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::Envelope;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Connected,
    Disconnected { reason: String },
    Message(Envelope),
}

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub url: Url,
    pub reconnect_delay: Duration,
}

impl ConnectionConfig {
    /// Builds the socket URL, carrying the session token as a query parameter.
    pub fn new(
        server: &str,
        token: Option<&str>,
        reconnect_delay: Duration,
    ) -> Result<Self, ClientError> {
        let mut url = Url::parse(server)?;
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            url.query_pairs_mut().append_pair("token", token);
        }
        Ok(Self {
            url,
            reconnect_delay,
        })
    }
}

pub fn spawn(
    config: ConnectionConfig,
    inbound: mpsc::UnboundedSender<ConnectionEvent>,
    mut outbound: mpsc::UnboundedReceiver<Envelope>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let reason = match run_connection(&config, &inbound, &mut outbound).await {
                Ok(ConnectionEnd::Closed) => "closed by server".to_string(),
                Ok(ConnectionEnd::Shutdown) => {
                    info!("Connection task shutting down");
                    return;
                }
                Err(e) => e.to_string(),
            };

            warn!("Disconnected: {}", reason);
            if inbound.send(ConnectionEvent::Disconnected { reason }).is_err() {
                return;
            }

            // Intents queued while offline belong to the old connection
            while outbound.try_recv().is_ok() {}

            sleep(config.reconnect_delay).await;
        }
    })
}

enum ConnectionEnd {
    Closed,
    Shutdown,
}

async fn run_connection(
    config: &ConnectionConfig,
    inbound: &mpsc::UnboundedSender<ConnectionEvent>,
    outbound: &mut mpsc::UnboundedReceiver<Envelope>,
) -> Result<ConnectionEnd, ClientError> {
    info!("Connecting to {}", config.url);
    let (ws, _response) = tokio_tungstenite::connect_async(config.url.as_str()).await?;
    let (mut write, mut read) = ws.split();

    if inbound.send(ConnectionEvent::Connected).is_err() {
        return Ok(ConnectionEnd::Shutdown);
    }

    loop {
        tokio::select! {
            message = read.next() => {
                let Some(message) = message else {
                    return Ok(ConnectionEnd::Closed);
                };
                match message? {
                    Message::Text(text) => match Envelope::from_json(&text) {
                        Ok(envelope) => {
                            debug!("<- {}", envelope.event);
                            if inbound.send(ConnectionEvent::Message(envelope)).is_err() {
                                return Ok(ConnectionEnd::Shutdown);
                            }
                        }
                        Err(e) => warn!("Dropping undecodable frame: {}", e),
                    },
                    Message::Close(frame) => {
                        debug!("Close frame: {:?}", frame);
                        return Ok(ConnectionEnd::Closed);
                    }
                    _ => {}
                }
            },

            envelope = outbound.recv() => {
                let Some(envelope) = envelope else {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(ConnectionEnd::Shutdown);
                };
                match envelope.to_json() {
                    Ok(text) => {
                        debug!("-> {}", envelope.event);
                        write.send(Message::Text(text)).await?;
                    }
                    Err(e) => error!("Cannot encode `{}`: {}", envelope.event, e),
                }
            },
        }
    }
}
