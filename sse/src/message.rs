use serde::Serialize;
use serde_json::Value;

/// Trait for getting the SSE event type name
pub trait EventType {
    fn event_type(&self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    // Snapshot sent to a subscriber as soon as it connects
    #[serde(rename = "connection_status")]
    ConnectionStatus { status: Value },

    // Connection lifecycle
    #[serde(rename = "pairing_code_ready")]
    PairingCodeReady { issued_at: String },
    #[serde(rename = "connection_opened")]
    ConnectionOpened,
    #[serde(rename = "connection_closed")]
    ConnectionClosed {
        reason: String,
        auth_failure: bool,
        retry_in_seconds: Option<u64>,
    },
    #[serde(rename = "cooldown_started")]
    CooldownStarted { ends_at: String },

    // Credential store
    #[serde(rename = "credentials_cleared")]
    CredentialsCleared { removed: Vec<String> },
}

impl EventType for Event {
    fn event_type(&self) -> &'static str {
        match self {
            Event::ConnectionStatus { .. } => "connection_status",
            Event::PairingCodeReady { .. } => "pairing_code_ready",
            Event::ConnectionOpened => "connection_opened",
            Event::ConnectionClosed { .. } => "connection_closed",
            Event::CooldownStarted { .. } => "cooldown_started",
            Event::CredentialsCleared { .. } => "credentials_cleared",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = Event::ConnectionClosed {
            reason: "stream errored".to_string(),
            auth_failure: false,
            retry_in_seconds: Some(5),
        };

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "connection_closed",
                "data": {
                    "reason": "stream errored",
                    "auth_failure": false,
                    "retry_in_seconds": 5
                }
            })
        );
    }

    #[test]
    fn test_unit_event_serializes_without_data() {
        assert_eq!(
            serde_json::to_value(Event::ConnectionOpened).unwrap(),
            json!({"type": "connection_opened"})
        );
    }

    #[test]
    fn test_event_type_matches_serialized_tag() {
        let events = [
            Event::ConnectionStatus { status: json!({}) },
            Event::PairingCodeReady {
                issued_at: "2024-01-01T00:00:00Z".to_string(),
            },
            Event::ConnectionOpened,
            Event::CooldownStarted {
                ends_at: "2024-01-01T00:05:00Z".to_string(),
            },
            Event::CredentialsCleared { removed: vec![] },
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], event.event_type());
        }
    }
}
