use anyhow::{Context, Result};
use notegrid::application::SessionProvider;
use notegrid::domain::{Session, UserIdentity};
use notegrid::infrastructure::{Config, FilesystemStorage, SqliteNoteRepository};
use notegrid::util::testing::MockSessionProvider;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Test fixture for a temporary notegrid data directory
#[allow(dead_code)]
pub struct TestWorkspace {
    _temp_dir: TempDir,
    pub data_dir: PathBuf,
    pub config_path: PathBuf,
}

#[allow(dead_code)]
impl TestWorkspace {
    /// Create an empty data dir plus a config file pointing at it
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::tempdir().context("Failed to create temporary directory")?;
        let data_dir = temp_dir.path().join("data");
        let config_path = temp_dir.path().join("notegrid.toml");

        let mut config = Config::default();
        config.storage.data_dir = data_dir.to_string_lossy().into_owned();
        config.storage.url_ttl_secs = 120;
        config.save(&config_path)?;

        Ok(Self {
            _temp_dir: temp_dir,
            data_dir,
            config_path,
        })
    }

    pub fn config_arg(&self) -> String {
        self.config_path.to_string_lossy().into_owned()
    }

    pub fn open_repository(&self) -> Result<SqliteNoteRepository> {
        SqliteNoteRepository::new(self.data_dir.join("notes.sqlite3"))
    }

    pub fn open_storage(&self) -> Result<FilesystemStorage> {
        FilesystemStorage::new(self.data_dir.join("objects"), Duration::from_secs(120))
    }

    /// Write an image file outside the data dir and return its path
    pub fn write_image(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let dir = self._temp_dir.path().join("uploads");
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(name);
        std::fs::write(&path, bytes)?;
        Ok(path)
    }
}

#[allow(dead_code)]
pub fn session(username: &str) -> Session {
    Session::new(UserIdentity::new(username))
}

/// Session provider already signed in as `username`
#[allow(dead_code)]
pub fn sessions(username: &str) -> Arc<dyn SessionProvider> {
    Arc::new(MockSessionProvider::signed_in(username))
}

/// Minimal PNG header, enough for a stored "image"
#[allow(dead_code)]
pub const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a];
