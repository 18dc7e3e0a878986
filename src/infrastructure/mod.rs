// src/infrastructure/mod.rs
pub mod config;
pub mod filesystem;
pub mod renderer;
pub mod session;
pub mod sqlite;

pub use config::Config;
pub use filesystem::FilesystemStorage;
pub use renderer::PageRenderer;
pub use session::FileSessionProvider;
pub use sqlite::SqliteNoteRepository;
