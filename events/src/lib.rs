//! Event system infrastructure for courier.
//!
//! This crate provides the event system that decouples the connection
//! lifecycle manager from infrastructure concerns (like SSE notifications).
//!
//! # Architecture
//!
//! - **DomainEvent**: Enum representing every lifecycle event of the messaging session
//! - **EventHandler**: Trait for implementing event handlers
//! - **EventPublisher**: Publishes events to registered handlers
//!
//! This crate has no dependencies on internal crates, avoiding circular
//! dependencies between `connection`, `sse` and `web`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Domain events emitted by the connection manager as the session moves through
/// its lifecycle. Subscribers receive them in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// The remote network issued a new pairing code that must be scanned to link this device.
    PairingCodeReady {
        /// Wall-clock time at which the code was received.
        issued_at: DateTime<Utc>,
    },
    /// The session finished its handshake and can deliver messages.
    ConnectionOpened,
    /// The session closed.
    ConnectionClosed {
        /// Human readable close reason reported by the transport.
        reason: String,
        /// The remote network revoked our credentials; no reconnect will be attempted.
        auth_failure: bool,
        /// Delay before the scheduled reconnect, `None` when no reconnect is scheduled.
        retry_in: Option<Duration>,
    },
    /// The reconnect ceiling was reached; automatic reconnects are suspended.
    CooldownStarted {
        /// Wall-clock time at which `initialize` will be accepted again.
        ends_at: DateTime<Utc>,
    },
    /// The persisted credentials were wiped and a fresh pairing flow was started.
    CredentialsCleared {
        /// Names of the credential entries that were removed.
        removed: Vec<String>,
    },
}

/// Trait for handling domain events.
/// Implementations can perform side effects like streaming notifications,
/// updating caches, logging, etc.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent);
}

/// Publishes domain events to registered handlers.
/// Handlers are called sequentially in registration order.
#[derive(Clone)]
pub struct EventPublisher {
    handlers: Arc<Vec<Arc<dyn EventHandler>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
        }
    }

    /// Register a new event handler.
    /// Note: This creates a new publisher instance with the additional handler.
    /// Store the returned publisher wherever events are emitted from.
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        let mut handlers = (*self.handlers).clone();
        handlers.push(handler);
        self.handlers = Arc::new(handlers);
        self
    }

    /// Publish an event to all registered handlers.
    pub async fn publish(&self, event: DomainEvent) {
        for handler in self.handlers.iter() {
            handler.handle(&event).await;
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<(&'static str, DomainEvent)>>>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle(&self, event: &DomainEvent) {
            self.log.lock().unwrap().push((self.name, event.clone()));
        }
    }

    #[tokio::test]
    async fn test_publish_calls_handlers_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let publisher = EventPublisher::new()
            .with_handler(Arc::new(Recorder {
                name: "first",
                log: log.clone(),
            }))
            .with_handler(Arc::new(Recorder {
                name: "second",
                log: log.clone(),
            }));

        publisher.publish(DomainEvent::ConnectionOpened).await;

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], ("first", DomainEvent::ConnectionOpened));
        assert_eq!(log[1], ("second", DomainEvent::ConnectionOpened));
    }

    #[tokio::test]
    async fn test_with_handler_leaves_original_publisher_untouched() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let bare = EventPublisher::new();
        let _wired = bare.clone().with_handler(Arc::new(Recorder {
            name: "only",
            log: log.clone(),
        }));

        bare.publish(DomainEvent::ConnectionOpened).await;

        assert!(log.lock().unwrap().is_empty());
    }
}
