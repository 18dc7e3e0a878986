// src/application/repository.rs
use crate::domain::{DomainError, NewNote, Note, NoteId, StorageKey};
use async_trait::async_trait;
use url::Url;

/// Data service holding note records
#[async_trait]
pub trait NoteRepository: Send + Sync {
    async fn list_notes(&self) -> Result<Vec<Note>, DomainError>;

    /// Create a record; the service assigns the id
    async fn create_note(&self, note: NewNote) -> Result<Note, DomainError>;

    async fn delete_note(&self, id: &NoteId) -> Result<(), DomainError>;
}

/// Storage service holding uploaded note images
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` under `key`, returns once the upload completed
    async fn upload(&self, key: &StorageKey, bytes: Vec<u8>) -> Result<(), DomainError>;

    /// Resolve a time-limited URL the object can be fetched from
    async fn resolve_url(&self, key: &StorageKey) -> Result<Url, DomainError>;

    async fn remove(&self, key: &StorageKey) -> Result<(), DomainError>;
}

