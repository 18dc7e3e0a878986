// src/infrastructure/filesystem.rs
use crate::application::ObjectStorage;
use crate::domain::{DomainError, StorageKey};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;
use tracing::{debug, info, instrument};
use url::Url;

/// Object storage in a local directory.
///
/// An object with key `media/<uuid>/cat.png` lives at
/// `<root>/media/<uuid>/cat.png`. Resolved URLs are `file://` URLs carrying an
/// `expires` unix timestamp.
#[derive(Debug, Clone)]
pub struct FilesystemStorage {
    root: PathBuf,
    url_ttl: Duration,
}

impl FilesystemStorage {
    pub fn new(root: impl Into<PathBuf>, url_ttl: Duration) -> Result<Self> {
        let root = root.into();
        let root = if root.is_absolute() {
            root
        } else {
            std::env::current_dir()
                .context("Failed to determine current directory")?
                .join(root)
        };
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create storage directory {}", root.display()))?;

        debug!(root = %root.display(), ttl_secs = url_ttl.as_secs(), "Opened filesystem storage");
        Ok(Self { root, url_ttl })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to its file, rejecting keys that would leave the root
    fn object_path(&self, key: &StorageKey) -> Result<PathBuf, DomainError> {
        let relative = Path::new(key.as_str());
        let escapes = key.as_str().contains('\\')
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(DomainError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn expires_at(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        (now + self.url_ttl).as_secs()
    }
}

#[async_trait]
impl ObjectStorage for FilesystemStorage {
    #[instrument(level = "debug", skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(&self, key: &StorageKey, bytes: Vec<u8>) -> Result<(), DomainError> {
        let path = self.object_path(key)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                DomainError::Storage(format!("create_dir_all({}): {}", parent.display(), e))
            })?;
        }
        fs::write(&path, &bytes)
            .await
            .map_err(|e| DomainError::Storage(format!("write({}): {}", path.display(), e)))?;

        info!(%key, size = bytes.len(), "Stored object");
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    async fn resolve_url(&self, key: &StorageKey) -> Result<Url, DomainError> {
        let path = self.object_path(key)?;

        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(DomainError::ObjectNotFound(key.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DomainError::ObjectNotFound(key.to_string()))
            }
            Err(e) => {
                return Err(DomainError::Storage(format!(
                    "metadata({}): {}",
                    path.display(),
                    e
                )))
            }
        }

        let mut url = Url::from_file_path(&path)
            .map_err(|_| DomainError::Storage(format!("not a file URL: {}", path.display())))?;
        url.query_pairs_mut()
            .append_pair("expires", &self.expires_at().to_string());
        Ok(url)
    }

    #[instrument(level = "debug", skip(self))]
    async fn remove(&self, key: &StorageKey) -> Result<(), DomainError> {
        let path = self.object_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => info!(%key, "Removed object"),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(%key, "Object already absent");
            }
            Err(e) => {
                return Err(DomainError::Storage(format!(
                    "remove_file({}): {}",
                    path.display(),
                    e
                )))
            }
        }

        // Drop the now empty per-upload directory
        if let Some(parent) = path.parent() {
            if parent != self.root {
                let _ = fs::remove_dir(parent).await;
            }
        }
        Ok(())
    }
}
