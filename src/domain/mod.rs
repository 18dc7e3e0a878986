// src/domain/mod.rs
pub mod error;
pub mod note;
pub mod session;
pub mod storage_key;

pub use error::DomainError;
pub use note::{ImageFile, NewNote, Note, NoteCard, NoteForm, NoteId};
pub use session::{Session, UserIdentity};
pub use storage_key::StorageKey;
