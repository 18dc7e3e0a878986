// src/application/mod.rs
pub mod note_manager;
pub mod repository;
pub mod session;

pub use note_manager::{FetchReport, NoteManager};
pub use repository::{NoteRepository, ObjectStorage};
pub use session::{AuthGate, SessionProvider};
