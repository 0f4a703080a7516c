//! Connection lifecycle management for the single session courier holds with
//! the remote messaging network.
//!
//! # Architecture
//!
//! - **One owner**: a single task (the actor) owns the session handle, the
//!   pairing artifact and the reconnect counters. `Manager` is a cloneable
//!   handle that talks to it over a channel, so every state change happens in
//!   one place, one command at a time.
//! - **Generations**: each created session is tagged with a monotonically
//!   increasing generation. Events from any generation other than the live
//!   one are dropped, so a late `closed` from a replaced session never
//!   touches the new one.
//! - **Linear backoff**: after a close, attempt `n` reconnects after
//!   `base_retry_delay * n`. Once `max_attempts` is reached the manager stops
//!   and `initialize` is refused until `cooldown` has passed.
//! - **Explicit overrides**: `force_reconnect` and
//!   `clear_persisted_credentials` ignore backoff and cooldown.
//!
//! # Example
//!
//! ```rust,ignore
//! let manager = connection::Manager::spawn(config, factory, store, publisher);
//! manager.initialize().await?;
//! let status = manager.status().await?;
//! ```

mod actor;
pub mod error;
mod manager;
pub mod status;


use std::time::Duration;

pub use error::{Error, ErrorKind};
pub use manager::{Manager, ManagerConfig};
pub use status::{DetailedStatus, PairingArtifact, Phase, Status};

/// How long a pairing artifact stays readable after its session closed.
pub const PAIRING_GRACE: Duration = Duration::from_secs(120);
