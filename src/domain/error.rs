// src/domain/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Note not found: {0}")]
    NoteNotFound(String),
    #[error("Not signed in. Run `notegrid login <USERNAME>` first")]
    NotSignedIn,
    #[error("Invalid username: {0}")]
    InvalidUsername(String),
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
    #[error("Stored object not found: {0}")]
    ObjectNotFound(String),
    #[error("Data service error: {0}")]
    Backend(String),
    #[error("Storage service error: {0}")]
    Storage(String),
    #[error("Note deleted but its image {key} could not be removed: {reason}")]
    OrphanedObject { key: String, reason: String },
    #[error("Configuration error: {0}")]
    Config(String),
}

