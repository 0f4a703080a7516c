//! Error types for the `domain` layer.
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field is used to hold the original error that caused
/// the domain error. The intent is to translate errors between layers while maintaining
/// layer boundaries. Ex. `domain` is dependent on `connection` and `transport`, and `web`
/// is dependent on `domain`, but `web` should not match on `connection` or `transport`
/// errors directly. Ultimately the various `error_kind`s are used by `web` to return
/// appropriate HTTP status codes and messages to the client.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    /// Caller input was rejected before anything was attempted; the message says why.
    Validation(String),
    Connection(ConnectionErrorKind),
    Config,
    Other(String),
}

/// Connection manager conditions, reduced to what callers can act on.
#[derive(Debug, PartialEq)]
pub enum ConnectionErrorKind {
    /// No open session; retry once pairing completes.
    NotConnected,
    /// Reconnects are cooling down for this many more seconds.
    CooldownActive { remaining_secs: u64 },
    /// The remote network revoked the credentials; operator action is required.
    AuthRevoked,
    /// No pairing code is currently outstanding.
    NoPairingArtifact,
    /// The credential store could not be read or cleared.
    Credentials,
    /// The connection manager is not running.
    Unavailable,
}

/// Enum representing the various kinds of external errors that can occur in the `domain`` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    /// The session transport failed; carries its underlying message.
    Transport(String),
    Network,
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "Domain Error: {:?}: {source}", self.error_kind),
            None => write!(f, "Domain Error: {:?}", self.error_kind),
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

// This is where we translate errors from the `connection` layer to the `domain` layer.
impl From<connection::Error> for Error {
    fn from(err: connection::Error) -> Self {
        let error_kind = match &err.error_kind {
            connection::ErrorKind::CooldownActive { remaining } => {
                DomainErrorKind::Internal(InternalErrorKind::Connection(
                    ConnectionErrorKind::CooldownActive {
                        remaining_secs: remaining.as_secs_f64().ceil() as u64,
                    },
                ))
            }
            connection::ErrorKind::AuthRevoked => DomainErrorKind::Internal(
                InternalErrorKind::Connection(ConnectionErrorKind::AuthRevoked),
            ),
            connection::ErrorKind::Transport => DomainErrorKind::External(
                ExternalErrorKind::Transport(err.to_string()),
            ),
            connection::ErrorKind::Credentials => DomainErrorKind::Internal(
                InternalErrorKind::Connection(ConnectionErrorKind::Credentials),
            ),
            connection::ErrorKind::Unavailable => DomainErrorKind::Internal(
                InternalErrorKind::Connection(ConnectionErrorKind::Unavailable),
            ),
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

// Failures reported by a live session while sending.
impl From<transport::Error> for Error {
    fn from(err: transport::Error) -> Self {
        let error_kind = match &err.error_kind {
            transport::ErrorKind::Session(_) => {
                DomainErrorKind::External(ExternalErrorKind::Transport(err.message()))
            }
            transport::ErrorKind::Credential(_) => DomainErrorKind::Internal(
                InternalErrorKind::Connection(ConnectionErrorKind::Credentials),
            ),
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<qrcode::types::QrError> for Error {
    fn from(err: qrcode::types::QrError) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                "Failed to render pairing code".to_string(),
            )),
        }
    }
}

pub(crate) fn validation_error(message: &str) -> Error {
    Error {
        source: None,
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Validation(message.to_string())),
    }
}

pub(crate) fn connection_error(kind: ConnectionErrorKind) -> Error {
    Error {
        source: None,
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Connection(kind)),
    }
}
