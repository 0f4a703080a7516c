//! Error types for the `transport` crate.
//!
//! Follows the same pattern as domain::error with a root Error struct and error kind enums.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for the transport crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in the transport crate.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    Session(SessionErrorKind),
    Credential(CredentialErrorKind),
}

/// Errors from creating or using a session.
#[derive(Debug, PartialEq)]
pub enum SessionErrorKind {
    /// The session could not be constructed.
    Construction,
    /// The session is gone; nothing can be sent on it.
    Closed,
    /// The remote network did not acknowledge in time.
    Timeout,
    /// The remote network refused the item.
    Rejected,
    Network,
}

/// Errors from credential store operations.
#[derive(Debug, PartialEq)]
pub enum CredentialErrorKind {
    InvalidName,
    Unwritable,
    ReadFailed,
    WriteFailed,
    DeleteFailed,
}

impl Error {
    /// The innermost message, without the kind prefix.
    pub fn message(&self) -> String {
        match &self.source {
            Some(source) => source.to_string(),
            None => format!("{:?}", self.error_kind),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Session(kind) => write!(f, "Session error ({:?}): {}", kind, self.message()),
            ErrorKind::Credential(kind) => {
                write!(f, "Credential error ({:?}): {}", kind, self.message())
            }
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

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Session(SessionErrorKind::Network),
        }
    }
}

/// Helper function to create session errors.
pub fn session_error(kind: SessionErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Session(kind),
    }
}

/// Helper function to create credential errors that wrap an I/O failure.
pub fn credential_io_error(kind: CredentialErrorKind, err: std::io::Error) -> Error {
    Error {
        source: Some(Box::new(err)),
        error_kind: ErrorKind::Credential(kind),
    }
}

/// Helper function to create credential errors.
pub fn credential_error(kind: CredentialErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Credential(kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind_and_message() {
        let err = session_error(SessionErrorKind::Rejected, "recipient not on network");
        assert_eq!(
            err.to_string(),
            "Session error (Rejected): recipient not on network"
        );
        assert_eq!(err.message(), "recipient not on network");
    }

    #[test]
    fn test_message_falls_back_to_kind_without_source() {
        let err = Error {
            source: None,
            error_kind: ErrorKind::Session(SessionErrorKind::Closed),
        };
        assert_eq!(err.message(), "Session(Closed)");
    }
}
