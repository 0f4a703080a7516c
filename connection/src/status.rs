use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// The pairing code the remote network issued to link this device.
#[derive(Debug, Clone, PartialEq)]
pub struct PairingArtifact {
    pub code: String,
    pub issued_at: DateTime<Utc>,
}

/// Where the connection currently sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Connecting,
    PairingPending,
    Open,
    Backoff,
    Cooldown,
    /// Credentials were revoked; only an explicit reconnect or credential clear leaves it.
    AuthRevoked,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Status {
    pub connected: bool,
    pub has_pairing_artifact: bool,
    pub attempt_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DetailedStatus {
    pub connected: bool,
    pub has_pairing_artifact: bool,
    pub attempt_count: u32,
    pub max_attempts: u32,
    pub in_cooldown: bool,
    pub cooldown_remaining_seconds: u64,
    /// RFC 3339 timestamp at which the cooldown ends, absent outside a cooldown.
    pub cooldown_ends_at: Option<DateTime<Utc>>,
    pub has_session_handle: bool,
    pub phase: Phase,
    pub auth_revoked: bool,
    pub last_close_reason: Option<String>,
}
