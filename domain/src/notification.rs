//! Notification Dispatcher: validates a request and hands it to the open session.

use crate::error::{connection_error, validation_error, ConnectionErrorKind, Error};
use log::*;
use serde::Serialize;
use utoipa::ToSchema;

const MIN_DIGITS: usize = 2;
const MAX_DIGITS: usize = 15;

/// Formatting characters tolerated between the digits of a destination.
const SEPARATORS: &[char] = &[' ', '-', '(', ')', '.'];

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SentNotification {
    pub delivery_id: String,
    pub normalized_destination: String,
}

/// Deliver `body` to `destination` over the open session.
///
/// Input is validated before the connection is consulted, so a malformed
/// request is rejected the same way whether or not a session is open.
/// Transport failures are returned as-is; retry policy belongs to the caller.
pub async fn send(
    manager: &connection::Manager,
    address_domain: &str,
    destination: &str,
    body: &str,
) -> Result<SentNotification, Error> {
    let address = normalize_destination(destination, address_domain)?;
    if body.trim().is_empty() {
        return Err(validation_error("message body must not be empty"));
    }

    let session = manager
        .active_session()
        .await?
        .ok_or_else(|| connection_error(ConnectionErrorKind::NotConnected))?;

    let receipt = session.send(&address, body).await.map_err(|e| {
        warn!("Failed to deliver notification to {address}: {e}");
        Error::from(e)
    })?;

    info!(
        "Delivered notification {} to {address}",
        receipt.delivery_id
    );
    Ok(SentNotification {
        delivery_id: receipt.delivery_id,
        normalized_destination: address,
    })
}

/// `+15551234567` becomes `15551234567@<address_domain>`.
pub fn normalize_destination(destination: &str, address_domain: &str) -> Result<String, Error> {
    let trimmed = destination.trim();
    let number = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits: String = number.chars().filter(|c| !SEPARATORS.contains(c)).collect();

    let bounded_by_digits = number.starts_with(|c: char| c.is_ascii_digit())
        && number.ends_with(|c: char| c.is_ascii_digit());
    let valid = bounded_by_digits
        && (MIN_DIGITS..=MAX_DIGITS).contains(&digits.len())
        && digits.chars().all(|c| c.is_ascii_digit());
    if !valid {
        return Err(validation_error(&format!(
            "destination must be an international number of {MIN_DIGITS} to {MAX_DIGITS} digits, optionally prefixed with '+'"
        )));
    }

    Ok(format!("{digits}@{address_domain}"))
}
