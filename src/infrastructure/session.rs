// src/infrastructure/session.rs
use crate::application::SessionProvider;
use crate::domain::{DomainError, Session, UserIdentity};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

/// Session persisted as a small TOML file
#[derive(Debug, Clone)]
pub struct FileSessionProvider {
    path: PathBuf,
}

impl FileSessionProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionProvider for FileSessionProvider {
    #[instrument(level = "debug", skip(self))]
    async fn current_session(&self) -> Result<Option<Session>, DomainError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No session file");
                return Ok(None);
            }
            Err(e) => {
                return Err(DomainError::Config(format!(
                    "read session {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let session: Session = toml::from_str(&content).map_err(|e| {
            DomainError::Config(format!("parse session {}: {}", self.path.display(), e))
        })?;
        if session.user.username().trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(session))
    }

    #[instrument(level = "debug", skip(self))]
    async fn sign_in(&self, user: UserIdentity) -> Result<Session, DomainError> {
        let session = Session::new(user);
        let content = toml::to_string_pretty(&session)
            .map_err(|e| DomainError::Config(format!("serialize session: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                DomainError::Config(format!("create_dir_all({}): {}", parent.display(), e))
            })?;
        }
        fs::write(&self.path, content).await.map_err(|e| {
            DomainError::Config(format!("write session {}: {}", self.path.display(), e))
        })?;

        info!(user = %session.user, "Signed in");
        Ok(session)
    }

    #[instrument(level = "debug", skip(self))]
    async fn sign_out(&self) -> Result<(), DomainError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("Signed out");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DomainError::Config(format!(
                "remove session {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}
