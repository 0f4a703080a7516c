//! Credential storage for session material.

use async_trait::async_trait;
use log::*;
use std::path::{Path, PathBuf};

use crate::error::{credential_error, credential_io_error, CredentialErrorKind, Error};
use crate::{CredentialUpdate, Credentials};

/// File kept in the store directory so it survives a full clear.
pub const SENTINEL_FILE: &str = ".gitkeep";

const ENTRY_EXTENSION: &str = "json";

/// Trait for storing session credentials.
///
/// Implementations should:
/// - Persist every update before returning
/// - Never remove the sentinel marker on `clear`
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load every persisted entry.
    async fn load(&self) -> Result<Credentials, Error>;

    /// Persist one changed entry.
    async fn save(&self, update: &CredentialUpdate) -> Result<(), Error>;

    /// Remove every persisted artifact and return their names.
    async fn clear(&self) -> Result<Vec<String>, Error>;
}

/// Multi-file credential store: one `<name>.json` file per entry.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    root: PathBuf,
}

impl FileCredentialStore {
    /// Open the store at `root`, creating the directory and verifying it is writable.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| credential_io_error(CredentialErrorKind::Unwritable, e))?;
        std::fs::write(root.join(SENTINEL_FILE), b"")
            .map_err(|e| credential_io_error(CredentialErrorKind::Unwritable, e))?;

        info!("Credential store opened at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, name: &str) -> Result<PathBuf, Error> {
        if !is_valid_entry_name(name) {
            warn!("Rejecting credential entry name: {name:?}");
            return Err(credential_error(
                CredentialErrorKind::InvalidName,
                &format!("invalid credential entry name: {name:?}"),
            ));
        }
        Ok(self.root.join(format!("{name}.{ENTRY_EXTENSION}")))
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Credentials, Error> {
        let mut credentials = Credentials::new();
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| credential_io_error(CredentialErrorKind::ReadFailed, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| credential_io_error(CredentialErrorKind::ReadFailed, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            let raw = tokio::fs::read(&path)
                .await
                .map_err(|e| credential_io_error(CredentialErrorKind::ReadFailed, e))?;
            match serde_json::from_slice(&raw) {
                Ok(value) => credentials.insert(name, value),
                // Torn writes are skipped; the session re-issues missing entries.
                Err(e) => warn!("Skipping unreadable credential entry {name}: {e}"),
            }
        }

        debug!("Loaded {} credential entries", credentials.len());
        Ok(credentials)
    }

    async fn save(&self, update: &CredentialUpdate) -> Result<(), Error> {
        let path = self.entry_path(&update.name)?;
        let raw = serde_json::to_vec(&update.value).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: crate::ErrorKind::Credential(CredentialErrorKind::WriteFailed),
        })?;

        tokio::fs::write(&path, raw)
            .await
            .map_err(|e| credential_io_error(CredentialErrorKind::WriteFailed, e))?;

        trace!("Persisted credential entry {}", update.name);
        Ok(())
    }

    async fn clear(&self) -> Result<Vec<String>, Error> {
        let mut removed = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| credential_io_error(CredentialErrorKind::ReadFailed, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| credential_io_error(CredentialErrorKind::ReadFailed, e))?
        {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if file_name == SENTINEL_FILE {
                continue;
            }

            let path = entry.path();
            let result = if path.is_dir() {
                tokio::fs::remove_dir_all(&path).await
            } else {
                tokio::fs::remove_file(&path).await
            };
            result.map_err(|e| {
                warn!("Failed to remove credential artifact {file_name}: {e}");
                credential_io_error(CredentialErrorKind::DeleteFailed, e)
            })?;
            removed.push(file_name);
        }

        removed.sort();
        info!("Removed {} credential artifacts", removed.len());
        Ok(removed)
    }
}

/// Entry names become file names, so only a conservative character set is allowed.
fn is_valid_entry_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
