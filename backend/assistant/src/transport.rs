//! Real-time transport to the assistant backend.
//!
//! A [`Connector`] spawns one long-lived task per session epoch. The task
//! reports readiness changes and inbound text frames back to the controller
//! through a [`TransportSink`], and reconnects with backoff until its owner
//! drops the outbound side of the [`TransportHandle`].

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};
use url::Url;

use solarops_core::{ConnectionReadiness, TransportError};
use solarops_logging::redact_url_token;

use crate::backoff::ReconnectBackoff;
use crate::session::Event;

const CHAT_PATH: &str = "chatbot/chat";

/// Build the socket URL for a session: `{endpoint}/chatbot/chat?token=...`.
pub fn transport_url(endpoint: &str, access_token: &str) -> Result<Url, TransportError> {
    let joined = format!("{}/{CHAT_PATH}", endpoint.trim_end_matches('/'));
    let mut url = Url::parse(&joined).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
    match url.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(TransportError::InvalidUrl(format!(
                "unsupported scheme {other:?}"
            )))
        }
    }
    url.query_pairs_mut().append_pair("token", access_token);
    Ok(url)
}

/// Epoch-tagged channel back into the controller.
#[derive(Debug, Clone)]
pub struct TransportSink {
    epoch: u64,
    tx: mpsc::UnboundedSender<Event>,
}

impl TransportSink {
    pub fn new(epoch: u64, tx: mpsc::UnboundedSender<Event>) -> Self {
        Self { epoch, tx }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Returns `false` once the controller has gone away.
    pub fn readiness(&self, readiness: ConnectionReadiness) -> bool {
        self.tx
            .send(Event::Readiness {
                epoch: self.epoch,
                readiness,
            })
            .is_ok()
    }

    pub fn frame(&self, text: String) -> bool {
        self.tx
            .send(Event::Frame {
                epoch: self.epoch,
                text,
            })
            .is_ok()
    }
}

/// Owner's side of a running transport.
#[derive(Debug)]
pub struct TransportHandle {
    outbound: mpsc::UnboundedSender<String>,
    task: Option<JoinHandle<()>>,
}

impl TransportHandle {
    pub fn new(outbound: mpsc::UnboundedSender<String>, task: Option<JoinHandle<()>>) -> Self {
        Self { outbound, task }
    }

    /// Queue a text frame. Frames queued while the link is down are dropped
    /// by the transport.
    pub fn send(&self, text: String) -> bool {
        self.outbound.send(text).is_ok()
    }

    /// Stop reconnecting and close the socket. The task notices the closed
    /// outbound channel, says goodbye to the peer and exits on its own.
    pub fn close(self) -> Option<JoinHandle<()>> {
        drop(self.outbound);
        self.task
    }
}

/// Starts transports. Abstracted so the controller can be driven without a network.
pub trait Connector: Send + Sync + 'static {
    fn connect(&self, url: Url, sink: TransportSink) -> TransportHandle;
}

/// WebSocket connector with unbounded reconnects.
#[derive(Debug, Clone, Default)]
pub struct WsConnector {
    backoff: ReconnectBackoff,
}

impl WsConnector {
    pub fn new(backoff: ReconnectBackoff) -> Self {
        Self { backoff }
    }
}

impl Connector for WsConnector {
    fn connect(&self, url: Url, sink: TransportSink) -> TransportHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_socket(url, sink, rx, self.backoff.clone()));
        TransportHandle::new(tx, Some(task))
    }
}

/// Discard outbound frames until the owner closes the channel.
async fn until_closed(outbound: &mut mpsc::UnboundedReceiver<String>) {
    while outbound.recv().await.is_some() {
        debug!("Dropping outbound frame while disconnected");
    }
}

enum LinkEnd {
    /// Owner closed the handle.
    Released,
    /// Peer or network ended the link.
    Lost(TransportError),
}

fn peer_closed(frame: Option<CloseFrame>) -> TransportError {
    match frame {
        Some(frame) if !frame.reason.is_empty() => TransportError::Socket(format!(
            "closed by peer ({}): {}",
            u16::from(frame.code),
            frame.reason.as_str()
        )),
        Some(frame) => {
            TransportError::Socket(format!("closed by peer ({})", u16::from(frame.code)))
        }
        None => TransportError::Socket("closed by peer".into()),
    }
}

async fn run_socket(
    url: Url,
    sink: TransportSink,
    mut outbound: mpsc::UnboundedReceiver<String>,
    backoff: ReconnectBackoff,
) {
    let shown = redact_url_token(url.as_str());
    let mut attempt: u32 = 0;

    loop {
        if !sink.readiness(ConnectionReadiness::Connecting) {
            return;
        }
        debug!(url = %shown, epoch = sink.epoch(), attempt, "Connecting assistant socket");

        let connected = tokio::select! {
            result = connect_async(url.as_str()) => result,
            _ = until_closed(&mut outbound) => {
                sink.readiness(ConnectionReadiness::Closed);
                return;
            }
        };

        match connected {
            Ok((stream, _)) => {
                attempt = 0;
                while outbound.try_recv().is_ok() {}
                info!(url = %shown, epoch = sink.epoch(), "Assistant socket open");
                sink.readiness(ConnectionReadiness::Open);

                let (mut write, mut read) = stream.split();
                let end = loop {
                    tokio::select! {
                        next = outbound.recv() => match next {
                            Some(text) => {
                                if let Err(e) = write.send(WsMessage::text(text)).await {
                                    break LinkEnd::Lost(TransportError::Socket(e.to_string()));
                                }
                            }
                            None => break LinkEnd::Released,
                        },
                        frame = read.next() => match frame {
                            Some(Ok(WsMessage::Text(text))) => {
                                sink.frame(text.to_string());
                            }
                            Some(Ok(WsMessage::Binary(data))) => match String::from_utf8(data.to_vec()) {
                                Ok(text) => {
                                    sink.frame(text);
                                }
                                Err(_) => warn!("Dropping non UTF-8 binary frame"),
                            },
                            Some(Ok(WsMessage::Close(frame))) => {
                                break LinkEnd::Lost(peer_closed(frame));
                            }
                            None => break LinkEnd::Lost(peer_closed(None)),
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                break LinkEnd::Lost(TransportError::Socket(e.to_string()));
                            }
                        },
                    }
                };

                sink.readiness(ConnectionReadiness::Closing);
                match end {
                    LinkEnd::Released => {
                        let _ = write.send(WsMessage::Close(None)).await;
                        sink.readiness(ConnectionReadiness::Closed);
                        debug!(epoch = sink.epoch(), "Assistant socket released");
                        return;
                    }
                    LinkEnd::Lost(error) => {
                        warn!(url = %shown, %error, "Assistant socket lost");
                        sink.readiness(ConnectionReadiness::Closed);
                    }
                }
            }
            Err(e) => {
                let error = TransportError::Connect(e.to_string());
                warn!(url = %shown, %error, "Assistant socket connect failed");
                sink.readiness(ConnectionReadiness::Closed);
            }
        }

        attempt = attempt.saturating_add(1);
        let delay = backoff.delay_for(attempt);
        debug!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting assistant socket");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = until_closed(&mut outbound) => {
                return;
            }
        }
    }
}
