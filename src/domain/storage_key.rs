// src/domain/storage_key.rs
use crate::constants::{MEDIA_PREFIX, UNNAMED_UPLOAD};
use crate::domain::DomainError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

lazy_static! {
    // media/<uuid v4>/<file name>
    static ref NAMESPACED_KEY_REGEX: Regex = Regex::new(
        r"^media/[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}/[^/]+$"
    )
    .expect("Failed to compile storage key regex");
}

/// Key of an object in the storage service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorageKey(String);

impl StorageKey {
    /// Generate a fresh key `media/<uuid>/<file name>` for an upload.
    ///
    /// Only the final path component of `file_name` is kept.
    pub fn generate(file_name: &str) -> Self {
        let base = file_name
            .rsplit(['/', '\\'])
            .next()
            .filter(|name| !name.trim().is_empty() && *name != "." && *name != "..")
            .unwrap_or(UNNAMED_UPLOAD);

        Self(format!("{}/{}/{}", MEDIA_PREFIX, Uuid::new_v4(), base))
    }

    /// Accept a key stored by the data service.
    ///
    /// Keys written by other clients may not follow the media namespace, they
    /// are still valid references as long as they are non-empty.
    pub fn parse(key: impl Into<String>) -> Result<Self, DomainError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(DomainError::InvalidKey("empty key".to_string()));
        }
        Ok(Self(key))
    }

    pub fn is_namespaced(&self) -> bool {
        NAMESPACED_KEY_REGEX.is_match(&self.0)
    }

    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for StorageKey {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<StorageKey> for String {
    fn from(key: StorageKey) -> Self {
        key.0
    }
}
