use axum::response::sse::Event;
use dashmap::DashMap;
use log::*;
use std::convert::Infallible;
use tokio::sync::mpsc::UnboundedSender;

/// Unique identifier for a connection (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// A dashboard subscribed to the connection event stream.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Who subscribed, for logging only (the client address).
    pub subscriber: String,
    pub sender: UnboundedSender<Result<Event, Infallible>>,
}

/// Registry of live SSE subscribers.
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionInfo>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    pub fn register(
        &self,
        subscriber: String,
        sender: UnboundedSender<Result<Event, Infallible>>,
    ) -> ConnectionId {
        let connection_id = ConnectionId::new();
        self.connections.insert(
            connection_id.clone(),
            ConnectionInfo { subscriber, sender },
        );
        connection_id
    }

    pub fn unregister(&self, connection_id: &ConnectionId) -> Option<ConnectionInfo> {
        self.connections
            .remove(connection_id)
            .map(|(_, info)| info)
    }

    /// Send to a single connection. Returns false when it is gone.
    pub fn send_to(&self, connection_id: &ConnectionId, event: Event) -> bool {
        match self.connections.get(connection_id) {
            Some(info) => info.sender.send(Ok(event)).is_ok(),
            None => false,
        }
    }

    /// Broadcast to all connections, dropping the ones whose stream has ended.
    /// Returns the number of connections that received the event.
    pub fn broadcast(&self, event: Event) -> usize {
        let mut delivered = 0;
        self.connections.retain(|connection_id, info| {
            match info.sender.send(Ok(event.clone())) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(e) => {
                    warn!(
                        "Failed to send broadcast to connection {} ({}): {}. Dropping it.",
                        connection_id.as_str(),
                        info.subscriber,
                        e
                    );
                    false
                }
            }
        });
        delivered
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
