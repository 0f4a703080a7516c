//! Domain layer: the Notification Dispatcher, pairing code rendering and the
//! connection control surface the API exposes.
//!
//! Every operation takes the `connection::Manager` it works on as a parameter
//! and reports failures as `domain::error::Error`, so `web` never depends on
//! the error types of the lower layers.

pub use connection::{DetailedStatus, Phase, Status};

pub mod control;
pub mod error;
pub mod notification;
pub mod pairing;
