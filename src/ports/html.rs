// src/ports/html.rs
use crate::domain::{NoteCard, NoteForm, UserIdentity};
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write;
use tracing::instrument;

/// Renders the notes page: welcome header, creation form and the note grid
#[derive(Debug, Default)]
pub struct HtmlPresenter;

impl HtmlPresenter {
    pub fn new() -> Self {
        Self
    }

    fn render_card(&self, card: &NoteCard) -> String {
        let mut html = String::new();
        let _ = write!(
            html,
            r#"
            <div class="card note-card" data-note-id="{id}">
                <strong>{name}</strong>
                <p>{description}</p>"#,
            id = encode_double_quoted_attribute(card.note.id.as_str()),
            name = encode_text(&card.note.name),
            description = encode_text(&card.note.description),
        );
        if let Some(url) = &card.image_url {
            let _ = write!(
                html,
                r#"
                <img src="{src}" alt="note" class="note-img">"#,
                src = encode_double_quoted_attribute(url.as_str()),
            );
        }
        let _ = write!(
            html,
            r#"
                <code class="delete-hint">notegrid delete {id}</code>
            </div>"#,
            id = encode_text(card.note.id.as_str()),
        );
        html
    }

    #[instrument(level = "debug", skip(self, form, notes), fields(notes = notes.len()))]
    pub fn render(&self, user: &UserIdentity, form: &NoteForm, notes: &[NoteCard]) -> String {
        let cards: String = notes.iter().map(|card| self.render_card(card)).collect();
        let grid = if cards.is_empty() {
            r#"<p class="empty">No notes yet.</p>"#.to_string()
        } else {
            cards
        };

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Notes of {user}</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
            line-height: 1.6;
            background-color: #f5f5f5;
        }}
        .container {{
            max-width: 960px;
            margin: 2rem auto;
            padding: 0 1rem;
        }}
        .header {{
            display: flex;
            justify-content: space-between;
            align-items: center;
        }}
        .card {{
            background: white;
            border-radius: 8px;
            padding: 1rem;
            box-shadow: 0 2px 4px rgba(0,0,0,0.1);
        }}
        .form-card {{
            display: flex;
            flex-direction: column;
            gap: 0.5rem;
        }}
        .notes-grid {{
            display: grid;
            grid-template-columns: repeat(auto-fill, minmax(220px, 1fr));
            gap: 1rem;
        }}
        .note-img {{
            max-width: 100%;
            border-radius: 4px;
        }}
        code {{
            background-color: #f0f0f0;
            padding: 2px 4px;
            border-radius: 3px;
            font-family: monospace;
            font-size: 0.8em;
        }}
    </style>
</head>
<body>
    <main class="container">
        <header class="header">
            <h2>Welcome, {user}</h2>
            <code class="sign-out-hint">notegrid logout</code>
        </header>

        <section class="form-section">
            <h3>Create a New Note</h3>
            <div class="card form-card">
                <input placeholder="Note name" value="{form_name}" readonly>
                <input placeholder="Description" value="{form_description}" readonly>
                <code class="create-hint">notegrid create --name NAME --description TEXT [--image FILE]</code>
            </div>
        </section>

        <section class="notes-section">
            <h3>Your Notes</h3>
            <div class="notes-grid">{grid}
            </div>
        </section>
    </main>
</body>
</html>"#,
            user = encode_text(user.username()),
            form_name = encode_double_quoted_attribute(&form.name),
            form_description = encode_double_quoted_attribute(&form.description),
            grid = grid,
        )
    }
}
