//! Local filesystem seen-appointment store.
//!
//! Persists the mapping as a single JSON document. Intended for development
//! and tests; production runs use [`super::FirestoreStore`].
//!
//! Merge semantics are implemented as a read-modify-write of one key
//! followed by an atomic rename.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::{SeenAppointments, SeenStore};

/// Seen-appointment store backed by a JSON file.
#[derive(Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    /// Create a store persisting to the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read(&self) -> Result<SeenAppointments> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(SeenAppointments::new())
            }
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SeenStore for LocalStore {
    async fn load(&self) -> Result<SeenAppointments> {
        self.read().await
    }

    async fn merge(&self, doctor_name: &str, dates: &[String]) -> Result<()> {
        let mut stored = self.read().await?;
        stored.set_dates(doctor_name, dates.to_vec());
        let bytes = serde_json::to_vec_pretty(&stored)?;
        self.write_bytes(&bytes).await
    }
}
