// src/ports/text.rs
use crate::domain::NoteCard;
use crate::util::text::summarize;
use std::fmt::Write;

const DESCRIPTION_WIDTH: usize = 40;

/// Plain terminal listing of note cards
#[derive(Debug, Default)]
pub struct TextPresenter;

impl TextPresenter {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, notes: &[NoteCard]) -> String {
        if notes.is_empty() {
            return "No notes yet.\n".to_string();
        }

        let mut out = String::new();
        for card in notes {
            let _ = writeln!(
                out,
                "{}\t{}\t{}",
                card.note.id,
                card.note.name,
                summarize(&card.note.description, DESCRIPTION_WIDTH)
            );
            if let Some(key) = &card.note.image {
                match &card.image_url {
                    Some(url) => {
                        let _ = writeln!(out, "\timage: {} ({})", key, url);
                    }
                    None => {
                        let _ = writeln!(out, "\timage: {} (unavailable)", key);
                    }
                }
            }
        }
        out
    }
}
