//! Server-Sent Events (SSE) infrastructure for live connection updates.
//!
//! Every lifecycle event the connection manager publishes (pairing code
//! ready, opened, closed, cooldown started, credentials cleared) is pushed
//! to all subscribed dashboards.
//!
//! # Architecture
//!
//! - **Broadcast only**: there is a single operator identity, so every
//!   subscriber receives every event.
//! - **Ephemeral messages**: a subscriber that is offline misses the event
//!   and picks up the current state from the snapshot sent on connect.
//! - **Self-cleaning registry**: connections whose stream ended are dropped
//!   on the next broadcast.
//!
//! # Modules
//!
//! - `connection`: ConnectionRegistry and type-safe ConnectionId
//! - `domain_event_handler`: maps `events::DomainEvent` to SSE events
//! - `manager`: serialization and fan-out
//! - `message`: typed event definitions

pub mod connection;
pub mod domain_event_handler;
pub mod manager;
pub mod message;

pub use domain_event_handler::SseDomainEventHandler;
pub use manager::Manager;
