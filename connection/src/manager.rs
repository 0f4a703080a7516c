use events::EventPublisher;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use transport::{CredentialStore, SessionHandle, SessionOptions, TransportEvent, TransportFactory};

use crate::actor::ConnectionActor;
use crate::error::{unavailable, Error};
use crate::status::{DetailedStatus, PairingArtifact, Status};

/// Depth of the command queue. API calls are rare; transport events come in short bursts.
const COMMAND_QUEUE_DEPTH: usize = 64;

/// Tunables for the reconnection policy.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Consecutive reconnect attempts before entering cooldown.
    pub max_attempts: u32,
    /// Reconnect attempt `n` waits `base_retry_delay * n`.
    pub base_retry_delay: Duration,
    /// How long `initialize` is refused after the ceiling is reached.
    pub cooldown: Duration,
    pub session_options: SessionOptions,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_retry_delay: Duration::from_millis(5_000),
            cooldown: Duration::from_millis(300_000),
            session_options: SessionOptions::default(),
        }
    }
}

/// Commands processed by the connection actor, one at a time.
pub(crate) enum Command {
    Initialize {
        reply: oneshot::Sender<Result<(), Error>>,
    },
    ForceReconnect {
        reply: oneshot::Sender<Result<(), Error>>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
    ClearCredentials {
        reply: oneshot::Sender<Result<Vec<String>, Error>>,
    },
    Status {
        reply: oneshot::Sender<Status>,
    },
    DetailedStatus {
        reply: oneshot::Sender<DetailedStatus>,
    },
    PairingArtifact {
        reply: oneshot::Sender<Option<PairingArtifact>>,
    },
    ActiveSession {
        reply: oneshot::Sender<Option<Arc<dyn SessionHandle>>>,
    },
    /// An event pushed by the session created as `generation`.
    Transport {
        generation: u64,
        event: TransportEvent,
    },
    /// A backoff timer elapsed.
    Reconnect { ticket: u64 },
}

/// Cloneable handle to the connection manager.
///
/// The manager task owns the single session to the remote network and every
/// piece of connection state; this handle only sends it commands.
#[derive(Clone)]
pub struct Manager {
    commands: mpsc::Sender<Command>,
}

impl Manager {
    /// Start the manager task. The manager begins idle; call `initialize` to connect.
    pub fn spawn(
        config: ManagerConfig,
        factory: Arc<dyn TransportFactory>,
        store: Arc<dyn CredentialStore>,
        publisher: EventPublisher,
    ) -> Self {
        let (commands, inbox) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let actor = ConnectionActor::new(config, factory, store, publisher, commands.downgrade());
        tokio::spawn(actor.run(inbox));
        Self { commands }
    }

    /// Connect unless the reconnect cooldown is still running.
    pub async fn initialize(&self) -> Result<(), Error> {
        self.request(|reply| Command::Initialize { reply }).await?
    }

    /// Reset all reconnect state and start a new session, ignoring any cooldown.
    pub async fn force_reconnect(&self) -> Result<(), Error> {
        self.request(|reply| Command::ForceReconnect { reply }).await?
    }

    /// End the session and clear every counter without reconnecting.
    pub async fn reset(&self) -> Result<(), Error> {
        self.request(|reply| Command::Reset { reply }).await
    }

    /// End the live session, if any.
    pub async fn disconnect(&self) -> Result<(), Error> {
        self.request(|reply| Command::Disconnect { reply }).await
    }

    /// Wipe the persisted credentials and start a fresh pairing flow.
    /// Returns the names of the removed artifacts.
    pub async fn clear_persisted_credentials(&self) -> Result<Vec<String>, Error> {
        self.request(|reply| Command::ClearCredentials { reply }).await?
    }

    pub async fn status(&self) -> Result<Status, Error> {
        self.request(|reply| Command::Status { reply }).await
    }

    pub async fn detailed_status(&self) -> Result<DetailedStatus, Error> {
        self.request(|reply| Command::DetailedStatus { reply }).await
    }

    pub async fn current_pairing_artifact(&self) -> Result<Option<PairingArtifact>, Error> {
        self.request(|reply| Command::PairingArtifact { reply }).await
    }

    /// The live session handle, only while the session is open.
    pub async fn active_session(&self) -> Result<Option<Arc<dyn SessionHandle>>, Error> {
        self.request(|reply| Command::ActiveSession { reply }).await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, Error> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| unavailable())?;
        response.await.map_err(|_| unavailable())
    }
}
