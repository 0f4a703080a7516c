//! The connection actor: sole owner and sole writer of the connection state.
//!
//! Every API call and every transport event arrives as a `Command` and is
//! handled to completion before the next one, so no state is ever shared.
//!
//! ```text
//!   Idle ──initialize/forceReconnect──▶ Connecting ──pairing code──▶ PairingPending
//!                                            │                            │
//!                                            └──────────opened────────────┴──▶ Open
//!   Connecting / PairingPending / Open ──closed──▶ Backoff   (attempts remain)
//!                                              └─▶ Cooldown  (ceiling reached)
//!   Backoff ──delay elapsed──▶ Connecting
//! ```

use chrono::Utc;
use events::{DomainEvent, EventPublisher};
use log::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use transport::{
    CloseInfo, CredentialStore, CredentialUpdate, SessionHandle, TransportEvent, TransportFactory,
};

use crate::error::{auth_revoked, cooldown_active, Error};
use crate::manager::{Command, ManagerConfig};
use crate::status::{DetailedStatus, PairingArtifact, Phase, Status};
use crate::PAIRING_GRACE;

/// The one session courier may hold, tagged with the generation it was created as.
struct LiveSession {
    generation: u64,
    handle: Arc<dyn SessionHandle>,
}

#[derive(Default)]
struct ConnectionState {
    session: Option<LiveSession>,
    /// Generation of the most recently created session. Never reused.
    generation: u64,
    connected: bool,
    pairing: Option<PairingArtifact>,
    /// Set when the session closes while a pairing code is outstanding.
    pairing_expires_at: Option<Instant>,
    attempt_count: u32,
    last_attempt_at: Option<Instant>,
    backoff: Option<JoinHandle<()>>,
    /// Only a `Reconnect` carrying the current ticket may fire.
    backoff_ticket: u64,
    auth_revoked: bool,
    last_close_reason: Option<String>,
}

pub(crate) struct ConnectionActor {
    config: ManagerConfig,
    factory: Arc<dyn TransportFactory>,
    store: Arc<dyn CredentialStore>,
    publisher: EventPublisher,
    commands: mpsc::WeakSender<Command>,
    state: ConnectionState,
}

impl ConnectionActor {
    pub(crate) fn new(
        config: ManagerConfig,
        factory: Arc<dyn TransportFactory>,
        store: Arc<dyn CredentialStore>,
        publisher: EventPublisher,
        commands: mpsc::WeakSender<Command>,
    ) -> Self {
        Self {
            config,
            factory,
            store,
            publisher,
            commands,
            state: ConnectionState::default(),
        }
    }

    /// Runs until every `Manager` handle is dropped.
    pub(crate) async fn run(mut self, mut inbox: mpsc::Receiver<Command>) {
        debug!(
            "Connection manager started: max_attempts={}, base_retry_delay={}ms, cooldown={}ms",
            self.config.max_attempts,
            self.config.base_retry_delay.as_millis(),
            self.config.cooldown.as_millis()
        );

        while let Some(command) = inbox.recv().await {
            self.handle(command).await;
        }

        self.cancel_backoff();
        self.teardown_session().await;
        debug!("Connection manager stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Initialize { reply } => {
                let _ = reply.send(self.initialize().await);
            }
            Command::ForceReconnect { reply } => {
                let _ = reply.send(self.force_reconnect().await);
            }
            Command::Reset { reply } => {
                self.reset().await;
                let _ = reply.send(());
            }
            Command::Disconnect { reply } => {
                self.disconnect().await;
                let _ = reply.send(());
            }
            Command::ClearCredentials { reply } => {
                let _ = reply.send(self.clear_credentials().await);
            }
            Command::Status { reply } => {
                let _ = reply.send(self.status(Instant::now()));
            }
            Command::DetailedStatus { reply } => {
                let _ = reply.send(self.detailed_status(Instant::now()));
            }
            Command::PairingArtifact { reply } => {
                self.expire_pairing(Instant::now());
                let _ = reply.send(self.state.pairing.clone());
            }
            Command::ActiveSession { reply } => {
                let handle = match (&self.state.session, self.state.connected) {
                    (Some(live), true) => Some(live.handle.clone()),
                    _ => None,
                };
                let _ = reply.send(handle);
            }
            Command::Transport { generation, event } => {
                self.on_transport_event(generation, event).await;
            }
            Command::Reconnect { ticket } => self.on_reconnect_due(ticket).await,
        }
    }

    async fn initialize(&mut self) -> Result<(), Error> {
        let now = Instant::now();
        let remaining = self.cooldown_remaining(now);
        if !remaining.is_zero() {
            info!(
                "Refusing to connect, cooldown active for another {}s",
                remaining.as_secs()
            );
            return Err(cooldown_active(remaining));
        }
        if self.state.auth_revoked {
            warn!("Refusing to connect with revoked credentials, clear them or force a reconnect");
            return Err(auth_revoked());
        }

        self.state.last_attempt_at = Some(now);
        self.connect().await
    }

    async fn force_reconnect(&mut self) -> Result<(), Error> {
        info!("Forced reconnect requested");
        self.reset().await;
        self.connect().await
    }

    async fn reset(&mut self) {
        self.cancel_backoff();
        self.teardown_session().await;

        let state = &mut self.state;
        state.attempt_count = 0;
        state.last_attempt_at = None;
        state.pairing = None;
        state.pairing_expires_at = None;
        state.auth_revoked = false;
        info!("Connection state reset");
    }

    async fn disconnect(&mut self) {
        self.cancel_backoff();
        let had_session = self.state.session.is_some();
        self.teardown_session().await;
        self.state.pairing = None;
        self.state.pairing_expires_at = None;

        if had_session {
            info!("Session disconnected");
        } else {
            debug!("Disconnect requested with no live session");
        }
    }

    async fn clear_credentials(&mut self) -> Result<Vec<String>, Error> {
        self.disconnect().await;

        let removed = self.store.clear().await.map_err(|e| {
            error!("Failed to clear persisted credentials: {e}");
            Error::from(e)
        })?;
        self.state.auth_revoked = false;
        self.state.attempt_count = 0;
        self.state.last_attempt_at = None;
        info!(
            "Cleared {} credential artifacts, starting a fresh pairing flow",
            removed.len()
        );
        self.publisher
            .publish(DomainEvent::CredentialsCleared {
                removed: removed.clone(),
            })
            .await;

        self.connect().await?;
        Ok(removed)
    }

    /// Replaces whatever session exists with a new one. Completion is reported
    /// later through transport events.
    async fn connect(&mut self) -> Result<(), Error> {
        self.cancel_backoff();
        self.teardown_session().await;

        let credentials = self.store.load().await.map_err(|e| {
            error!("Failed to load persisted credentials: {e}");
            Error::from(e)
        })?;

        self.state.generation += 1;
        let generation = self.state.generation;
        info!(
            "Starting session generation {generation} with {} persisted credential entries",
            credentials.len()
        );

        let session = self
            .factory
            .create(credentials, self.config.session_options.clone())
            .await
            .map_err(|e| {
                error!("Failed to create session generation {generation}: {e}");
                Error::from(e)
            })?;

        self.spawn_forwarder(generation, session.events);
        self.state.session = Some(LiveSession {
            generation,
            handle: session.handle,
        });
        Ok(())
    }

    /// Ends the live session, if any. Close errors are ignored.
    async fn teardown_session(&mut self) {
        self.state.connected = false;
        if let Some(live) = self.state.session.take() {
            debug!("Ending session generation {}", live.generation);
            if let Err(e) = live.handle.end().await {
                debug!(
                    "Ignoring error while ending session generation {}: {e}",
                    live.generation
                );
            }
        }
    }

    /// Relays a session's events into the inbox, tagged with its generation.
    fn spawn_forwarder(
        &self,
        generation: u64,
        mut events: mpsc::UnboundedReceiver<TransportEvent>,
    ) {
        let commands = self.commands.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(commands) = commands.upgrade() else {
                    break;
                };
                if commands
                    .send(Command::Transport { generation, event })
                    .await
                    .is_err()
                {
                    break;
                }
            }
            trace!("Event forwarder for session generation {generation} finished");
        });
    }

    fn schedule_reconnect(&mut self, delay: Duration) {
        self.cancel_backoff();
        self.state.backoff_ticket += 1;
        let ticket = self.state.backoff_ticket;
        let commands = self.commands.clone();

        self.state.backoff = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(commands) = commands.upgrade() {
                let _ = commands.send(Command::Reconnect { ticket }).await;
            }
        }));
    }

    fn cancel_backoff(&mut self) {
        if let Some(task) = self.state.backoff.take() {
            task.abort();
            self.state.backoff_ticket += 1;
            debug!("Cancelled pending reconnect");
        }
    }

    async fn on_reconnect_due(&mut self, ticket: u64) {
        if ticket != self.state.backoff_ticket || self.state.backoff.is_none() {
            debug!("Ignoring superseded reconnect timer {ticket}");
            return;
        }
        self.state.backoff = None;

        info!(
            "Reconnect attempt {}/{}",
            self.state.attempt_count, self.config.max_attempts
        );
        if let Err(e) = self.connect().await {
            error!("Reconnect attempt failed, waiting for operator action: {e}");
        }
    }

    async fn on_transport_event(&mut self, generation: u64, event: TransportEvent) {
        let current = self.state.session.as_ref().map(|live| live.generation);
        if current != Some(generation) {
            debug!(
                "Ignoring {} from stale session generation {generation} (current: {current:?})",
                event_name(&event)
            );
            return;
        }

        match event {
            TransportEvent::PairingCodeReady(code) => self.on_pairing_code(code).await,
            TransportEvent::Opened => self.on_opened(generation).await,
            TransportEvent::Closed(close) => self.on_closed(close).await,
            TransportEvent::CredentialsChanged(update) => self.on_credentials_changed(update).await,
        }
    }

    async fn on_pairing_code(&mut self, code: String) {
        let issued_at = Utc::now();
        self.state.pairing = Some(PairingArtifact { code, issued_at });
        self.state.pairing_expires_at = None;
        info!("Pairing code ready, waiting for the device to be linked");

        self.publisher
            .publish(DomainEvent::PairingCodeReady { issued_at })
            .await;
    }

    async fn on_opened(&mut self, generation: u64) {
        let state = &mut self.state;
        state.connected = true;
        state.pairing = None;
        state.pairing_expires_at = None;
        state.attempt_count = 0;
        state.auth_revoked = false;
        info!("Session generation {generation} opened");

        self.publisher.publish(DomainEvent::ConnectionOpened).await;
    }

    async fn on_closed(&mut self, close: CloseInfo) {
        let now = Instant::now();
        self.state.connected = false;
        if let Some(live) = self.state.session.take() {
            let _ = live.handle.end().await;
        }
        if self.state.pairing.is_some() && self.state.pairing_expires_at.is_none() {
            self.state.pairing_expires_at = Some(now + PAIRING_GRACE);
        }
        self.state.last_close_reason = Some(close.reason.clone());

        if close.auth_failure {
            self.state.auth_revoked = true;
            warn!(
                "Session closed, credentials revoked by the remote network ({}); automatic reconnect disabled",
                close.reason
            );
            self.publisher
                .publish(DomainEvent::ConnectionClosed {
                    reason: close.reason,
                    auth_failure: true,
                    retry_in: None,
                })
                .await;
            return;
        }

        if self.state.attempt_count < self.config.max_attempts {
            self.state.attempt_count += 1;
            let delay = self.config.base_retry_delay * self.state.attempt_count;
            info!(
                "Session closed ({}), reconnect attempt {}/{} in {}ms",
                close.reason,
                self.state.attempt_count,
                self.config.max_attempts,
                delay.as_millis()
            );
            self.schedule_reconnect(delay);
            self.publisher
                .publish(DomainEvent::ConnectionClosed {
                    reason: close.reason,
                    auth_failure: false,
                    retry_in: Some(delay),
                })
                .await;
        } else {
            self.state.last_attempt_at = Some(now);
            let ends_at = Utc::now()
                + chrono::Duration::from_std(self.config.cooldown)
                    .unwrap_or_else(|_| chrono::Duration::zero());
            warn!(
                "Session closed ({}), reconnect ceiling of {} attempts reached; cooling down until {}",
                close.reason,
                self.config.max_attempts,
                ends_at.to_rfc3339()
            );
            self.publisher
                .publish(DomainEvent::ConnectionClosed {
                    reason: close.reason,
                    auth_failure: false,
                    retry_in: None,
                })
                .await;
            self.publisher
                .publish(DomainEvent::CooldownStarted { ends_at })
                .await;
        }
    }

    async fn on_credentials_changed(&mut self, update: CredentialUpdate) {
        if let Err(e) = self.store.save(&update).await {
            error!("Failed to persist credential entry {}: {e}", update.name);
        }
    }

    fn cooldown_remaining(&self, now: Instant) -> Duration {
        match self.state.last_attempt_at {
            Some(at) => self
                .config
                .cooldown
                .saturating_sub(now.saturating_duration_since(at)),
            None => Duration::ZERO,
        }
    }

    /// Drops the pairing artifact once its post-close grace window has passed.
    fn expire_pairing(&mut self, now: Instant) {
        if let Some(expires_at) = self.state.pairing_expires_at {
            if now >= expires_at {
                self.state.pairing = None;
                self.state.pairing_expires_at = None;
                debug!("Pairing artifact expired");
            }
        }
    }

    fn phase(&self, now: Instant) -> Phase {
        let state = &self.state;
        if state.connected {
            Phase::Open
        } else if state.session.is_some() {
            if state.pairing.is_some() {
                Phase::PairingPending
            } else {
                Phase::Connecting
            }
        } else if state.backoff.is_some() {
            Phase::Backoff
        } else if state.auth_revoked {
            Phase::AuthRevoked
        } else if !self.cooldown_remaining(now).is_zero() {
            Phase::Cooldown
        } else {
            Phase::Idle
        }
    }

    fn status(&mut self, now: Instant) -> Status {
        self.expire_pairing(now);
        Status {
            connected: self.state.connected,
            has_pairing_artifact: self.state.pairing.is_some(),
            attempt_count: self.state.attempt_count,
        }
    }

    fn detailed_status(&mut self, now: Instant) -> DetailedStatus {
        let status = self.status(now);
        let remaining = self.cooldown_remaining(now);
        let in_cooldown = !remaining.is_zero();
        let cooldown_ends_at = in_cooldown.then(|| {
            Utc::now()
                + chrono::Duration::from_std(remaining).unwrap_or_else(|_| chrono::Duration::zero())
        });

        DetailedStatus {
            connected: status.connected,
            has_pairing_artifact: status.has_pairing_artifact,
            attempt_count: status.attempt_count,
            max_attempts: self.config.max_attempts,
            in_cooldown,
            cooldown_remaining_seconds: remaining.as_secs_f64().ceil() as u64,
            cooldown_ends_at,
            has_session_handle: self.state.session.is_some(),
            phase: self.phase(now),
            auth_revoked: self.state.auth_revoked,
            last_close_reason: self.state.last_close_reason.clone(),
        }
    }
}

fn event_name(event: &TransportEvent) -> &'static str {
    match event {
        TransportEvent::PairingCodeReady(_) => "pairing-code-ready",
        TransportEvent::Opened => "opened",
        TransportEvent::Closed(_) => "closed",
        TransportEvent::CredentialsChanged(_) => "credentials-changed",
    }
}
