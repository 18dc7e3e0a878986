// src/constants.rs
//
// Application-wide constants. Each constant is documented with its purpose
// and usage context.

/// Top-level namespace for uploaded note images.
///
/// Keys look like `media/<uuid>/<file name>` so two uploads with the same
/// file name never collide.
///
/// Used in: `domain/storage_key.rs`
pub const MEDIA_PREFIX: &str = "media";

/// Fallback file name when an upload has no usable base name.
///
/// Used in: `domain/storage_key.rs`
pub const UNNAMED_UPLOAD: &str = "upload";

/// Lifetime of a resolved image URL in seconds.
///
/// Used in: `infrastructure/config.rs`
pub const DEFAULT_URL_TTL_SECS: u64 = 900;

/// Directory name below the platform config/data dirs.
pub const APP_DIR_NAME: &str = "notegrid";

pub const CONFIG_FILE_NAME: &str = "notegrid.toml";
pub const SESSION_FILE_NAME: &str = "session.toml";
pub const DATABASE_FILE_NAME: &str = "notes.sqlite3";

/// Root directory for stored objects inside the data dir.
///
/// Used in: `lib.rs`
pub const OBJECTS_DIR_NAME: &str = "objects";

/// Delay in milliseconds after writing HTML file before opening browser.
///
/// On macOS, the browser needs a brief moment for the file to be fully written
/// and indexed before opening. Without this delay, the browser may open an empty
/// or incomplete file.
///
/// Used in: `infrastructure/renderer.rs`
pub const BROWSER_LAUNCH_DELAY_MS: u64 = 500;
