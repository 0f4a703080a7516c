//! # transport
//!
//! The boundary between courier and the remote messaging network.
//!
//! - `TransportFactory` / `SessionHandle`: one authenticated session to the
//!   remote network, created from persisted credentials
//! - `TransportEvent`: lifecycle events pushed by a live session
//! - `credentials`: the on-disk credential store the session reads and writes
//! - `bridge`: the production transport, a WebSocket client to the local
//!   session bridge that speaks the remote network's protocol
//! - `mock` (feature `mock`): in-memory doubles for tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use transport::{bridge::BridgeTransportFactory, SessionOptions, TransportFactory};
//!
//! let factory = BridgeTransportFactory::new("ws://127.0.0.1:8085/session");
//! let session = factory.create(credentials, SessionOptions::default()).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

pub mod bridge;
pub mod credentials;
pub mod error;
#[cfg(feature = "mock")]
pub mod mock;

pub use credentials::{CredentialStore, FileCredentialStore};
pub use error::{Error, ErrorKind};

/// Close status the remote network uses when the linked device was logged out.
pub const LOGGED_OUT_STATUS: u16 = 401;

/// Persisted session material, keyed by entry name.
///
/// The transport decides what the entries mean; courier only moves them
/// between the credential store and the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials(BTreeMap<String, serde_json::Value>);

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// One changed credential entry that must be persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialUpdate {
    pub name: String,
    pub value: serde_json::Value,
}

/// Why a session closed.
#[derive(Debug, Clone, PartialEq)]
pub struct CloseInfo {
    pub reason: String,
    /// Status code reported by the remote network, if any.
    pub status_code: Option<u16>,
    /// The remote network explicitly revoked the credentials.
    pub auth_failure: bool,
}

impl CloseInfo {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            status_code: None,
            auth_failure: false,
        }
    }

    pub fn logged_out(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            status_code: Some(LOGGED_OUT_STATUS),
            auth_failure: true,
        }
    }
}

/// Lifecycle events a session pushes, delivered in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A pairing code must be scanned to link this device.
    PairingCodeReady(String),
    Opened,
    Closed(CloseInfo),
    CredentialsChanged(CredentialUpdate),
}

/// Options handed to a transport when a session is created.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Label the remote network shows for this linked device.
    pub device_name: String,
    /// How long `send` waits for the remote acknowledgement.
    pub send_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            device_name: "courier".to_string(),
            send_timeout: Duration::from_secs(30),
        }
    }
}

/// Receipt for an item accepted by the remote network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub delivery_id: String,
}

/// A live session with the remote network.
#[async_trait]
pub trait SessionHandle: Send + Sync {
    /// Send `payload` to an already-normalized `address`.
    async fn send(&self, address: &str, payload: &str) -> Result<DeliveryReceipt, Error>;

    /// Best-effort graceful teardown.
    async fn end(&self) -> Result<(), Error>;
}

/// A freshly created session and the stream of events it will push.
pub struct Session {
    pub handle: Arc<dyn SessionHandle>,
    pub events: UnboundedReceiver<TransportEvent>,
}

/// Creates sessions. Implementations must return without waiting for the
/// session to open; completion is reported through `TransportEvent`s.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(
        &self,
        credentials: Credentials,
        options: SessionOptions,
    ) -> Result<Session, Error>;
}
