use crate::connection::{ConnectionId, ConnectionRegistry};
use crate::message::{Event as SseEvent, EventType};
use axum::response::sse::Event;
use log::*;
use std::convert::Infallible;
use tokio::sync::mpsc::UnboundedSender;

pub struct Manager {
    registry: ConnectionRegistry,
}

impl Manager {
    pub fn new() -> Self {
        Self {
            registry: ConnectionRegistry::new(),
        }
    }

    /// Register a new connection and return its unique ID
    pub fn register_connection(
        &self,
        subscriber: String,
        sender: UnboundedSender<Result<Event, Infallible>>,
    ) -> ConnectionId {
        let connection_id = self.registry.register(subscriber.clone(), sender);
        info!(
            "Registered SSE connection {} for {subscriber}",
            connection_id.as_str()
        );
        connection_id
    }

    /// Unregister a connection by ID
    pub fn unregister_connection(&self, connection_id: &ConnectionId) {
        if let Some(info) = self.registry.unregister(connection_id) {
            info!(
                "Unregistered SSE connection {} for {}",
                connection_id.as_str(),
                info.subscriber
            );
        }
    }

    /// Send an event to one connection, e.g. the snapshot a new subscriber starts with.
    pub fn send_to(&self, connection_id: &ConnectionId, event: &SseEvent) {
        if let Some(event) = Self::encode(event) {
            self.registry.send_to(connection_id, event);
        }
    }

    /// Send an event to every connected subscriber.
    pub fn broadcast(&self, event: &SseEvent) {
        if let Some(encoded) = Self::encode(event) {
            let delivered = self.registry.broadcast(encoded);
            trace!(
                "Broadcast {} to {delivered} subscriber(s)",
                event.event_type()
            );
        }
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    fn encode(event: &SseEvent) -> Option<Event> {
        match serde_json::to_string(event) {
            Ok(json) => Some(Event::default().event(event.event_type()).data(json)),
            Err(e) => {
                error!("Failed to serialize SSE event: {e}");
                None
            }
        }
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}
