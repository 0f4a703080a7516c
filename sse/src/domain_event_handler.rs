use crate::message::Event as SseEvent;
use crate::Manager;
use async_trait::async_trait;
use events::{DomainEvent, EventHandler};
use log::*;
use std::sync::Arc;

/// Streams connection lifecycle events to every SSE subscriber.
pub struct SseDomainEventHandler {
    sse_manager: Arc<Manager>,
}

impl SseDomainEventHandler {
    pub fn new(sse_manager: Arc<Manager>) -> Self {
        Self { sse_manager }
    }
}

/// Converts a domain event into its wire form.
pub fn to_sse_event(event: &DomainEvent) -> SseEvent {
    match event {
        DomainEvent::PairingCodeReady { issued_at } => SseEvent::PairingCodeReady {
            issued_at: issued_at.to_rfc3339(),
        },
        DomainEvent::ConnectionOpened => SseEvent::ConnectionOpened,
        DomainEvent::ConnectionClosed {
            reason,
            auth_failure,
            retry_in,
        } => SseEvent::ConnectionClosed {
            reason: reason.clone(),
            auth_failure: *auth_failure,
            retry_in_seconds: retry_in.map(|delay| delay.as_secs_f64().ceil() as u64),
        },
        DomainEvent::CooldownStarted { ends_at } => SseEvent::CooldownStarted {
            ends_at: ends_at.to_rfc3339(),
        },
        DomainEvent::CredentialsCleared { removed } => SseEvent::CredentialsCleared {
            removed: removed.clone(),
        },
    }
}

#[async_trait]
impl EventHandler for SseDomainEventHandler {
    async fn handle(&self, event: &DomainEvent) {
        debug!("Streaming domain event to SSE subscribers: {event:?}");
        self.sse_manager.broadcast(&to_sse_event(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[test]
    fn test_closed_event_rounds_retry_delay_up_to_seconds() {
        let event = DomainEvent::ConnectionClosed {
            reason: "stream errored".to_string(),
            auth_failure: false,
            retry_in: Some(Duration::from_millis(2_500)),
        };

        assert_eq!(
            to_sse_event(&event),
            SseEvent::ConnectionClosed {
                reason: "stream errored".to_string(),
                auth_failure: false,
                retry_in_seconds: Some(3),
            }
        );
    }

    #[test]
    fn test_timestamps_are_rfc3339() {
        let ends_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(
            to_sse_event(&DomainEvent::CooldownStarted { ends_at }),
            SseEvent::CooldownStarted {
                ends_at: "2024-05-01T12:00:00+00:00".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_handler_broadcasts_to_subscribers() {
        let manager = Arc::new(Manager::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        manager.register_connection("dashboard".to_string(), tx);
        let handler = SseDomainEventHandler::new(manager);

        handler.handle(&DomainEvent::ConnectionOpened).await;

        assert!(rx.try_recv().is_ok());
    }
}
