// src/core/session_store.rs
//! Persists the identity provider's tokens between runs as a small TOML file

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl StoredSession {
    pub fn to_session(&self) -> Session {
        let mut session = Session::new(self.access_token.clone());
        if let Some(expires_at) = self.expires_at {
            session = session.with_expiry(expires_at);
        }
        if let Some(email) = &self.email {
            session = session.with_email(email.clone());
        }
        session
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.to_session().is_expired_at(now)
    }
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing or unreadable file is treated as "no session".
    pub async fn load(&self) -> Option<StoredSession> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read session file {}: {}", self.path.display(), e);
                return None;
            }
        };

        match toml::from_str::<StoredSession>(&content) {
            Ok(stored) => Some(stored),
            Err(e) => {
                warn!("Ignoring corrupt session file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    pub async fn save(&self, stored: &StoredSession) -> Result<(), ClientError> {
        let content = toml::to_string_pretty(stored)
            .map_err(|e| ClientError::Storage(format!("Failed to serialize session: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ClientError::Storage(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        tokio::fs::write(&self.path, content).await.map_err(|e| {
            ClientError::Storage(format!(
                "Failed to write session file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        debug!("Session saved to {}", self.path.display());
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), ClientError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClientError::Storage(format!(
                "Failed to remove session file {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}
