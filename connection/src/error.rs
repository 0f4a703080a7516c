//! Error types for the `connection` crate.

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

/// Top-level error type for connection manager operations.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// The ways a connection manager operation can fail. None of them are fatal
/// to the process.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// A connection was requested while the reconnect cooldown is still running.
    CooldownActive { remaining: Duration },
    /// The remote network revoked the credentials; an operator must clear them or force a reconnect.
    AuthRevoked,
    /// The session transport failed to construct a session.
    Transport,
    /// The credential store could not be read or cleared.
    Credentials,
    /// The manager task is no longer running.
    Unavailable,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::CooldownActive { remaining } => write!(
                f,
                "Reconnect cooldown active, retry in {}s",
                remaining.as_secs()
            ),
            ErrorKind::AuthRevoked => write!(f, "Credentials were revoked by the remote network"),
            ErrorKind::Transport => match &self.source {
                Some(source) => write!(f, "Transport error: {source}"),
                None => write!(f, "Transport error"),
            },
            ErrorKind::Credentials => match &self.source {
                Some(source) => write!(f, "Credential store error: {source}"),
                None => write!(f, "Credential store error"),
            },
            ErrorKind::Unavailable => write!(f, "Connection manager is not running"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// Session failures and credential store failures arrive as the same
// transport error type and are told apart by their kind.
impl From<transport::Error> for Error {
    fn from(err: transport::Error) -> Self {
        let error_kind = match err.error_kind {
            transport::ErrorKind::Session(_) => ErrorKind::Transport,
            transport::ErrorKind::Credential(_) => ErrorKind::Credentials,
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

pub(crate) fn cooldown_active(remaining: Duration) -> Error {
    Error {
        source: None,
        error_kind: ErrorKind::CooldownActive { remaining },
    }
}

pub(crate) fn auth_revoked() -> Error {
    Error {
        source: None,
        error_kind: ErrorKind::AuthRevoked,
    }
}

pub(crate) fn unavailable() -> Error {
    Error {
        source: None,
        error_kind: ErrorKind::Unavailable,
    }
}
