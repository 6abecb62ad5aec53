//! Backing store of backend records.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::config::BackendConfig;

/// Error reading the backing store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached
    #[error("backing store unreachable: {0}")]
    Unreachable(String),

    /// The store answered something that is not a list of records
    #[error("malformed backing store: {0}")]
    Malformed(String),
}

/// A backend record kept in the backing store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredBackend {
    pub id: String,
    #[serde(alias = "klass")]
    pub class: String,
    #[serde(default)]
    pub args: Value,
    #[serde(default)]
    pub modes: Vec<String>,
    /// Deployment the backend belongs to
    pub deployment: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StoredBackend {
    /// When the record was last written.
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.created_at)
    }

    pub fn to_config(&self) -> BackendConfig {
        BackendConfig {
            id: Some(self.id.clone()),
            class: self.class.clone(),
            args: self.args.clone(),
            modes: self.modes.clone(),
        }
    }
}

/// Source of backend records, polled by the manager.
#[async_trait]
pub trait BackendStore: Send + Sync {
    /// Every record, all deployments included.
    async fn load(&self) -> Result<Vec<StoredBackend>, StoreError>;
}

/// Records read from a JSON file holding an array of [`StoredBackend`].
#[derive(Debug, Clone)]
pub struct FileBackendStore {
    path: PathBuf,
}

impl FileBackendStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl BackendStore for FileBackendStore {
    async fn load(&self) -> Result<Vec<StoredBackend>, StoreError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| StoreError::Unreachable(format!("{}: {e}", self.path.display())))?;
        serde_json::from_str(&contents)
            .map_err(|e| StoreError::Malformed(format!("{}: {e}", self.path.display())))
    }
}
