//! In-memory transport doubles for tests.
//!
//! `MockTransportFactory` hands every created session to a `MockSessions`
//! receiver so a test can drive its lifecycle by emitting events.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::error::{credential_error, session_error, CredentialErrorKind, Error, SessionErrorKind};
use crate::{
    CloseInfo, CredentialStore, CredentialUpdate, Credentials, DeliveryReceipt, Session,
    SessionHandle, SessionOptions, TransportEvent, TransportFactory,
};

#[derive(Default)]
struct FactoryState {
    created: AtomicUsize,
    fail_next: AtomicBool,
}

/// Factory producing `MockSession`s.
#[derive(Clone)]
pub struct MockTransportFactory {
    state: Arc<FactoryState>,
    sessions: mpsc::UnboundedSender<MockSession>,
}

impl MockTransportFactory {
    pub fn new() -> (Self, MockSessions) {
        let (sessions, rx) = mpsc::unbounded_channel();
        (
            Self {
                state: Arc::new(FactoryState::default()),
                sessions,
            },
            MockSessions { rx },
        )
    }

    /// Number of sessions created so far.
    pub fn created(&self) -> usize {
        self.state.created.load(Ordering::SeqCst)
    }

    /// Make the next `create` call fail with a construction error.
    pub fn fail_next_create(&self) {
        self.state.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl TransportFactory for MockTransportFactory {
    async fn create(
        &self,
        credentials: Credentials,
        options: SessionOptions,
    ) -> Result<Session, Error> {
        if self.state.fail_next.swap(false, Ordering::SeqCst) {
            return Err(session_error(
                SessionErrorKind::Construction,
                "mock construction failure",
            ));
        }

        let index = self.state.created.fetch_add(1, Ordering::SeqCst);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(SessionState {
            index,
            credentials,
            options,
            events: events_tx,
            ended: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            send_failure: Mutex::new(None),
        });

        let _ = self.sessions.send(MockSession {
            shared: shared.clone(),
        });

        Ok(Session {
            handle: Arc::new(MockHandle { shared }),
            events: events_rx,
        })
    }
}

/// Receives every session the factory creates, in creation order.
pub struct MockSessions {
    rx: mpsc::UnboundedReceiver<MockSession>,
}

impl MockSessions {
    /// Wait for the next created session.
    pub async fn next(&mut self) -> MockSession {
        self.rx
            .recv()
            .await
            .expect("mock factory dropped while waiting for a session")
    }

    /// The next created session, if one was already created.
    pub fn try_next(&mut self) -> Option<MockSession> {
        self.rx.try_recv().ok()
    }
}

struct SessionState {
    index: usize,
    credentials: Credentials,
    options: SessionOptions,
    events: mpsc::UnboundedSender<TransportEvent>,
    ended: AtomicBool,
    closed: AtomicBool,
    sent: Mutex<Vec<(String, String)>>,
    send_failure: Mutex<Option<String>>,
}

impl SessionState {
    fn emit(&self, event: TransportEvent) {
        if matches!(event, TransportEvent::Closed(_)) {
            self.closed.store(true, Ordering::SeqCst);
        }
        let _ = self.events.send(event);
    }
}

/// Test-side view of a created session.
#[derive(Clone)]
pub struct MockSession {
    shared: Arc<SessionState>,
}

impl MockSession {
    pub fn credentials(&self) -> &Credentials {
        &self.shared.credentials
    }

    pub fn options(&self) -> &SessionOptions {
        &self.shared.options
    }

    /// Push an event as if the remote network produced it.
    pub fn emit(&self, event: TransportEvent) {
        self.shared.emit(event);
    }

    pub fn pairing_code(&self, code: &str) {
        self.emit(TransportEvent::PairingCodeReady(code.to_string()));
    }

    pub fn open(&self) {
        self.emit(TransportEvent::Opened);
    }

    pub fn close(&self, reason: &str) {
        self.emit(TransportEvent::Closed(CloseInfo::new(reason)));
    }

    /// Whether `end()` was called on the handle.
    pub fn ended(&self) -> bool {
        self.shared.ended.load(Ordering::SeqCst)
    }

    /// Every `(address, payload)` passed to `send`.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.shared.sent.lock().unwrap().clone()
    }

    /// Make every following `send` fail with `message`.
    pub fn fail_sends(&self, message: &str) {
        *self.shared.send_failure.lock().unwrap() = Some(message.to_string());
    }
}

struct MockHandle {
    shared: Arc<SessionState>,
}

#[async_trait]
impl SessionHandle for MockHandle {
    async fn send(&self, address: &str, payload: &str) -> Result<DeliveryReceipt, Error> {
        if let Some(message) = self.shared.send_failure.lock().unwrap().clone() {
            return Err(session_error(SessionErrorKind::Rejected, &message));
        }
        let mut sent = self.shared.sent.lock().unwrap();
        sent.push((address.to_string(), payload.to_string()));
        Ok(DeliveryReceipt {
            delivery_id: format!("MOCK{}-{}", self.shared.index, sent.len()),
        })
    }

    /// Like a real session, ending emits one `Closed` unless the session already closed.
    async fn end(&self) -> Result<(), Error> {
        self.shared.ended.store(true, Ordering::SeqCst);
        if !self.shared.closed.load(Ordering::SeqCst) {
            self.shared
                .emit(TransportEvent::Closed(CloseInfo::new("session ended locally")));
        }
        Ok(())
    }
}

/// Credential store kept in memory.
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    entries: Arc<Mutex<Credentials>>,
    fail_clear: Arc<AtomicBool>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Credentials) -> Self {
        Self {
            entries: Arc::new(Mutex::new(entries)),
            fail_clear: Arc::default(),
        }
    }

    pub fn snapshot(&self) -> Credentials {
        self.entries.lock().unwrap().clone()
    }

    /// Make the next `clear` fail.
    pub fn fail_next_clear(&self) {
        self.fail_clear.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Credentials, Error> {
        Ok(self.snapshot())
    }

    async fn save(&self, update: &CredentialUpdate) -> Result<(), Error> {
        self.entries
            .lock()
            .unwrap()
            .insert(update.name.clone(), update.value.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<Vec<String>, Error> {
        if self.fail_clear.swap(false, Ordering::SeqCst) {
            return Err(credential_error(
                CredentialErrorKind::DeleteFailed,
                "mock delete failure",
            ));
        }
        let mut entries = self.entries.lock().unwrap();
        let removed = entries.names().map(|name| format!("{name}.json")).collect();
        *entries = Credentials::new();
        Ok(removed)
    }
}
