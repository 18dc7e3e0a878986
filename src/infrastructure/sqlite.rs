// src/infrastructure/sqlite.rs
use crate::application::NoteRepository;
use crate::domain::{DomainError, NewNote, Note, NoteId, StorageKey};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, instrument};
use uuid::Uuid;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS notes (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT NOT NULL,
    image       TEXT,
    created_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
)";

impl From<rusqlite::Error> for DomainError {
    fn from(e: rusqlite::Error) -> Self {
        DomainError::Backend(e.to_string())
    }
}

/// Note records in a local SQLite database
pub struct SqliteNoteRepository {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteNoteRepository {
    pub fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let path = PathBuf::from(database_path.as_ref());
        debug!(?path, "Opening note database");

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory {}", parent.display())
            })?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open note database {}", path.display()))?;
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize note database schema")?;

        info!(?path, "Opened note database");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize note database schema")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run a statement batch on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&Connection) -> Result<T, DomainError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            f(&conn)
        })
        .await
        .map_err(|e| DomainError::Backend(format!("database task failed: {}", e)))?
    }
}

#[async_trait]
impl NoteRepository for SqliteNoteRepository {
    #[instrument(level = "debug", skip(self))]
    async fn list_notes(&self) -> Result<Vec<Note>, DomainError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, description, image FROM notes ORDER BY created_at, rowid",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(id, name, description, image)| -> Result<Note, DomainError> {
                    Ok(Note {
                        id: NoteId::new(id),
                        name,
                        description,
                        image: image.map(StorageKey::parse).transpose()?,
                    })
                })
                .collect()
        })
        .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn create_note(&self, note: NewNote) -> Result<Note, DomainError> {
        let id = NoteId::new(Uuid::new_v4().to_string());
        let created = Note {
            id,
            name: note.name,
            description: note.description,
            image: note.image,
        };

        let record = created.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO notes (id, name, description, image) VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.id.as_str(),
                    record.name,
                    record.description,
                    record.image.as_ref().map(StorageKey::as_str),
                ],
            )?;
            Ok(())
        })
        .await?;

        info!(note_id = %created.id, "Inserted note");
        Ok(created)
    }

    #[instrument(level = "debug", skip(self))]
    async fn delete_note(&self, id: &NoteId) -> Result<(), DomainError> {
        let id = id.clone();
        self.with_conn(move |conn| {
            let exists = conn
                .query_row(
                    "SELECT 1 FROM notes WHERE id = ?1",
                    params![id.as_str()],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();

            if !exists {
                debug!(note_id = %id, "Note not found for deletion");
                return Err(DomainError::NoteNotFound(id.to_string()));
            }

            conn.execute("DELETE FROM notes WHERE id = ?1", params![id.as_str()])?;
            info!(note_id = %id, "Deleted note record");
            Ok(())
        })
        .await
    }
}
