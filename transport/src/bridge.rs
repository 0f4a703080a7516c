//! Session bridge transport.
//!
//! The remote network's protocol is owned by a local bridge process. courier
//! talks to it over one WebSocket per session, exchanging JSON frames tagged by
//! `type`. Each session opens a fresh socket, announces its credentials with a
//! `start` frame, then relays lifecycle frames as `TransportEvent`s until the
//! socket closes.

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use log::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::error::{session_error, Error, SessionErrorKind};
use crate::{
    CloseInfo, CredentialUpdate, Credentials, DeliveryReceipt, Session, SessionHandle,
    SessionOptions, TransportEvent, TransportFactory, LOGGED_OUT_STATUS,
};

/// Frames courier sends to the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    Start {
        credentials: Credentials,
        device_name: String,
    },
    Send {
        id: String,
        to: String,
        text: String,
    },
    End,
}

/// Frames the bridge sends to courier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    Qr {
        code: String,
    },
    Open,
    Close {
        reason: String,
        #[serde(default)]
        status_code: Option<u16>,
        #[serde(default)]
        logged_out: bool,
    },
    Creds {
        name: String,
        value: serde_json::Value,
    },
    Sent {
        id: String,
        message_id: String,
    },
    SendFailed {
        id: String,
        message: String,
    },
}

type PendingSends = DashMap<String, oneshot::Sender<Result<String, String>>>;

/// Creates bridge sessions against a fixed bridge URL.
#[derive(Debug, Clone)]
pub struct BridgeTransportFactory {
    url: String,
}

impl BridgeTransportFactory {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TransportFactory for BridgeTransportFactory {
    async fn create(
        &self,
        credentials: Credentials,
        options: SessionOptions,
    ) -> Result<Session, Error> {
        if !self.url.starts_with("ws://") && !self.url.starts_with("wss://") {
            return Err(session_error(
                SessionErrorKind::Construction,
                &format!("session bridge URL must be ws:// or wss://, got {}", self.url),
            ));
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let pending: Arc<PendingSends> = Arc::new(DashMap::new());
        let closed = Arc::new(AtomicBool::new(false));

        let io = BridgeIo {
            url: self.url.clone(),
            events: events_tx,
            pending: pending.clone(),
            closed: closed.clone(),
        };
        let start = OutboundFrame::Start {
            credentials,
            device_name: options.device_name.clone(),
        };
        tokio::spawn(io.run(start, outbound_rx));

        let handle = BridgeSession {
            outbound: outbound_tx,
            pending,
            closed,
            send_timeout: options.send_timeout,
        };

        Ok(Session {
            handle: Arc::new(handle),
            events: events_rx,
        })
    }
}

/// Handle to one bridge session.
pub struct BridgeSession {
    outbound: mpsc::UnboundedSender<OutboundFrame>,
    pending: Arc<PendingSends>,
    closed: Arc<AtomicBool>,
    send_timeout: Duration,
}

#[async_trait]
impl SessionHandle for BridgeSession {
    async fn send(&self, address: &str, payload: &str) -> Result<DeliveryReceipt, Error> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(session_error(SessionErrorKind::Closed, "session is closed"));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending.insert(id.clone(), reply_tx);

        let frame = OutboundFrame::Send {
            id: id.clone(),
            to: address.to_string(),
            text: payload.to_string(),
        };
        if self.outbound.send(frame).is_err() {
            self.pending.remove(&id);
            return Err(session_error(SessionErrorKind::Closed, "session is closed"));
        }

        match tokio::time::timeout(self.send_timeout, reply_rx).await {
            Ok(Ok(Ok(message_id))) => Ok(DeliveryReceipt {
                delivery_id: message_id,
            }),
            Ok(Ok(Err(message))) => Err(session_error(SessionErrorKind::Rejected, &message)),
            Ok(Err(_)) => Err(session_error(
                SessionErrorKind::Closed,
                "session closed before the send was acknowledged",
            )),
            Err(_) => {
                self.pending.remove(&id);
                Err(session_error(
                    SessionErrorKind::Timeout,
                    &format!(
                        "no acknowledgement within {}s",
                        self.send_timeout.as_secs()
                    ),
                ))
            }
        }
    }

    async fn end(&self) -> Result<(), Error> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.outbound
            .send(OutboundFrame::End)
            .map_err(|_| session_error(SessionErrorKind::Closed, "session is closed"))
    }
}

/// The socket-owning half of a bridge session.
struct BridgeIo {
    url: String,
    events: mpsc::UnboundedSender<TransportEvent>,
    pending: Arc<PendingSends>,
    closed: Arc<AtomicBool>,
}

impl BridgeIo {
    async fn run(self, start: OutboundFrame, outbound: mpsc::UnboundedReceiver<OutboundFrame>) {
        let close = match self.pump(start, outbound).await {
            Ok(close) => close,
            Err(e) => {
                warn!("Session bridge connection failed: {e}");
                CloseInfo::new(format!("session bridge unavailable: {}", e.message()))
            }
        };
        self.finish(close);
    }

    /// Runs until the socket closes and returns why it closed.
    async fn pump(
        &self,
        start: OutboundFrame,
        mut outbound: mpsc::UnboundedReceiver<OutboundFrame>,
    ) -> Result<CloseInfo, Error> {
        debug!("Connecting to session bridge at {}", self.url);
        let (stream, _response) = connect_async(self.url.as_str()).await?;
        let (mut sink, mut source) = stream.split();

        sink.send(encode(&start)?).await?;
        info!("Session bridge connected, waiting for the remote session");

        loop {
            tokio::select! {
                frame = outbound.recv() => match frame {
                    Some(OutboundFrame::End) | None => {
                        let _ = sink.send(encode(&OutboundFrame::End)?).await;
                        let _ = sink.close().await;
                        return Ok(CloseInfo::new("session ended locally"));
                    }
                    Some(frame) => sink.send(encode(&frame)?).await?,
                },
                message = source.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(close) = self.dispatch(&text) {
                            return Ok(close);
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame
                            .map(|f| f.reason.to_string())
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| "session bridge closed the socket".to_string());
                        return Ok(CloseInfo::new(reason));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(CloseInfo::new("session bridge closed the socket")),
                },
            }
        }
    }

    /// Routes one inbound frame. Returns the close info when the frame ends the session.
    fn dispatch(&self, text: &str) -> Option<CloseInfo> {
        let frame: InboundFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Ignoring malformed session bridge frame: {e}");
                return None;
            }
        };

        match frame {
            InboundFrame::Qr { code } => self.emit(TransportEvent::PairingCodeReady(code)),
            InboundFrame::Open => self.emit(TransportEvent::Opened),
            InboundFrame::Creds { name, value } => {
                self.emit(TransportEvent::CredentialsChanged(CredentialUpdate { name, value }))
            }
            InboundFrame::Sent { id, message_id } => self.resolve(&id, Ok(message_id)),
            InboundFrame::SendFailed { id, message } => self.resolve(&id, Err(message)),
            InboundFrame::Close {
                reason,
                status_code,
                logged_out,
            } => {
                return Some(CloseInfo {
                    auth_failure: logged_out || status_code == Some(LOGGED_OUT_STATUS),
                    reason,
                    status_code,
                });
            }
        }
        None
    }

    fn emit(&self, event: TransportEvent) {
        if self.events.send(event).is_err() {
            trace!("Session event dropped, nobody is listening");
        }
    }

    fn resolve(&self, id: &str, outcome: Result<String, String>) {
        match self.pending.remove(id) {
            Some((_, reply)) => {
                let _ = reply.send(outcome);
            }
            None => debug!("Acknowledgement for unknown send {id}"),
        }
    }

    /// Emits exactly one `Closed` and fails every outstanding send.
    fn finish(&self, close: CloseInfo) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        // Dropping the reply senders wakes waiting `send` calls with a closed error.
        self.pending.clear();
        info!("Session closed: {}", close.reason);
        self.emit(TransportEvent::Closed(close));
    }
}

fn encode(frame: &OutboundFrame) -> Result<Message, Error> {
    let text = serde_json::to_string(frame).map_err(|e| Error {
        source: Some(Box::new(e)),
        error_kind: crate::ErrorKind::Session(SessionErrorKind::Network),
    })?;
    Ok(Message::Text(text))
}
