// src/domain/note.rs
use crate::domain::StorageKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Opaque note identifier assigned by the data service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<StorageKey>,
}

/// Record payload for the data service's create operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewNote {
    pub name: String,
    pub description: String,
    pub image: Option<StorageKey>,
}

/// A note as displayed: the record plus its resolved, time-limited image URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteCard {
    #[serde(flatten)]
    pub note: Note,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<Url>,
}

impl NoteCard {
    pub fn new(note: Note) -> Self {
        Self {
            note,
            image_url: None,
        }
    }

    pub fn with_image_url(note: Note, image_url: Url) -> Self {
        Self {
            note,
            image_url: Some(image_url),
        }
    }
}

impl AsRef<Note> for NoteCard {
    fn as_ref(&self) -> &Note {
        &self.note
    }
}

impl AsRef<Note> for Note {
    fn as_ref(&self) -> &Note {
        self
    }
}

/// Working draft of the note being created
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteForm {
    pub name: String,
    pub description: String,
}

impl NoteForm {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.description.is_empty()
    }
}

/// Local file selected for upload, not yet stored
#[derive(Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

// Bytes are left out, images can be large
impl fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageFile")
            .field("name", &self.name)
            .field("size", &self.bytes.len())
            .finish()
    }
}
