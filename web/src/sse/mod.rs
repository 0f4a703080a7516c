//! SSE HTTP handler for the web layer.
//!
//! This module contains only the Axum handler for SSE endpoints.
//! The core SSE infrastructure (Manager, ConnectionRegistry, Message types)
//! lives in the `sse` crate so the connection manager can publish to it
//! without depending on `web`.

pub mod handler;
