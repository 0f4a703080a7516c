use std::error::Error as StdError;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use domain::error::{
    ConnectionErrorKind, DomainErrorKind, Error as DomainError, ExternalErrorKind,
    InternalErrorKind,
};
use log::*;

/// Suggested wait before retrying a send that found no open session.
pub(crate) const NOT_CONNECTED_RETRY_AFTER_SECS: u64 = 30;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(DomainError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

/// Body of every failed request.
#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    status_code: u16,
    error: String,
}

/// Builds a JSON error response, with `Retry-After` when `retry_after` is set.
pub(crate) fn error_response(
    status: StatusCode,
    message: impl Into<String>,
    retry_after: Option<u64>,
) -> Response {
    let body = ErrorResponse {
        status_code: status.as_u16(),
        error: message.into(),
    };
    let mut response = (status, Json(body)).into_response();
    if let Some(seconds) = retry_after {
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
    }
    response
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html#associatedconstant.UNPROCESSABLE_ENTITY
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message, retry_after) = match &self.0.error_kind {
            DomainErrorKind::Internal(internal_error_kind) => match internal_error_kind {
                InternalErrorKind::Validation(message) => {
                    (StatusCode::BAD_REQUEST, message.clone(), None)
                }
                InternalErrorKind::Connection(connection_error_kind) => {
                    match connection_error_kind {
                        ConnectionErrorKind::NotConnected => (
                            StatusCode::SERVICE_UNAVAILABLE,
                            "Not connected to the messaging network, retry once pairing completes"
                                .to_string(),
                            Some(NOT_CONNECTED_RETRY_AFTER_SECS),
                        ),
                        ConnectionErrorKind::CooldownActive { remaining_secs } => (
                            StatusCode::TOO_MANY_REQUESTS,
                            format!("Reconnect cooldown active, retry in {remaining_secs}s"),
                            Some(*remaining_secs),
                        ),
                        ConnectionErrorKind::AuthRevoked => (
                            StatusCode::CONFLICT,
                            "Credentials were revoked by the messaging network, clear them or force a reconnect"
                                .to_string(),
                            None,
                        ),
                        ConnectionErrorKind::NoPairingArtifact => (
                            StatusCode::NOT_FOUND,
                            "No pairing code is available".to_string(),
                            None,
                        ),
                        ConnectionErrorKind::Credentials | ConnectionErrorKind::Unavailable => (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            "INTERNAL SERVER ERROR".to_string(),
                            None,
                        ),
                    }
                }
                InternalErrorKind::Config | InternalErrorKind::Other(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL SERVER ERROR".to_string(),
                    None,
                ),
            },
            DomainErrorKind::External(external_error_kind) => match external_error_kind {
                ExternalErrorKind::Transport(message) => {
                    (StatusCode::BAD_GATEWAY, message.clone(), None)
                }
                ExternalErrorKind::Network => {
                    (StatusCode::BAD_GATEWAY, "BAD GATEWAY".to_string(), None)
                }
                ExternalErrorKind::Other(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL SERVER ERROR".to_string(),
                    None,
                ),
            },
        };

        if status.is_server_error() {
            error!("Request failed with {status}: {}", self.0);
        } else {
            debug!("Request rejected with {status}: {}", self.0);
        }
        error_response(status, message, retry_after)
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
