//! Connection control for the API layer, with errors translated into the
//! domain error tree.

use crate::error::Error;
use connection::{DetailedStatus, Manager, Status};
use log::*;

pub async fn initialize(manager: &Manager) -> Result<(), Error> {
    Ok(manager.initialize().await?)
}

pub async fn force_reconnect(manager: &Manager) -> Result<(), Error> {
    Ok(manager.force_reconnect().await?)
}

pub async fn reset(manager: &Manager) -> Result<(), Error> {
    Ok(manager.reset().await?)
}

pub async fn disconnect(manager: &Manager) -> Result<(), Error> {
    Ok(manager.disconnect().await?)
}

/// Wipes the persisted credentials and restarts pairing. Returns the removed entries.
pub async fn clear_credentials(manager: &Manager) -> Result<Vec<String>, Error> {
    let removed = manager.clear_persisted_credentials().await?;
    info!("Operator cleared {} credential entries", removed.len());
    Ok(removed)
}

pub async fn status(manager: &Manager) -> Result<Status, Error> {
    Ok(manager.status().await?)
}

pub async fn detailed_status(manager: &Manager) -> Result<DetailedStatus, Error> {
    Ok(manager.detailed_status().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConnectionErrorKind, DomainErrorKind, InternalErrorKind};
    use connection::ManagerConfig;
    use events::EventPublisher;
    use std::sync::Arc;
    use std::time::Duration;
    use transport::mock::{MemoryCredentialStore, MockTransportFactory};

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_is_reported_in_whole_seconds() {
        let (factory, _sessions) = MockTransportFactory::new();
        let manager = Manager::spawn(
            ManagerConfig {
                cooldown: Duration::from_millis(90_500),
                ..ManagerConfig::default()
            },
            Arc::new(factory),
            Arc::new(MemoryCredentialStore::new()),
            EventPublisher::new(),
        );
        initialize(&manager).await.unwrap();

        let err = initialize(&manager).await.unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Connection(
                ConnectionErrorKind::CooldownActive { remaining_secs: 91 }
            ))
        );
    }

    #[tokio::test]
    async fn test_clear_credentials_returns_removed_names() {
        let (factory, _sessions) = MockTransportFactory::new();
        let mut entries = transport::Credentials::new();
        entries.insert("creds", serde_json::Value::Null);
        let manager = Manager::spawn(
            ManagerConfig::default(),
            Arc::new(factory),
            Arc::new(MemoryCredentialStore::with_entries(entries)),
            EventPublisher::new(),
        );

        let removed = clear_credentials(&manager).await.unwrap();

        assert_eq!(removed, vec!["creds.json".to_string()]);
        assert!(status(&manager).await.is_ok());
    }
}
