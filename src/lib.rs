// src/lib.rs
pub mod application;
pub mod cli;
pub mod constants;
pub mod domain;
pub mod infrastructure;
pub mod ports;
pub mod util;

use crate::cli::args::{Args, Command};
use anyhow::{Context, Result};
use application::{AuthGate, NoteManager};
use domain::{ImageFile, NoteForm, NoteId};
use infrastructure::{
    Config, FileSessionProvider, FilesystemStorage, PageRenderer, SqliteNoteRepository,
};
use ports::{HtmlPresenter, TextPresenter};
use std::path::Path;
use tracing::{debug, info};

type LocalNoteManager = NoteManager<SqliteNoteRepository, FilesystemStorage>;
type LocalAuthGate = AuthGate<FileSessionProvider>;

pub async fn run(args: Args) -> Result<()> {
    debug!(?args, "Starting notegrid with arguments");

    let config = load_config(&args)?;
    let gate = AuthGate::new(FileSessionProvider::new(config.session_file()?));

    match args.command {
        Command::Login { username } => {
            let session = gate.sign_in(&username).await?;
            println!("Signed in as {}", session.user);
        }
        Command::Logout => {
            gate.sign_out().await?;
            println!("Signed out");
        }
        Command::Whoami => {
            let session = gate.require().await?;
            println!("{}", session.user);
        }
        Command::List { json } => {
            let manager = open_notes(&gate, &config).await?;
            list_notes(&manager, json)?;
        }
        Command::Create {
            name,
            description,
            image,
        } => {
            let manager = open_notes(&gate, &config).await?;
            create_note(&manager, NoteForm::new(name, description), image.as_deref()).await?;
        }
        Command::Delete { note_id } => {
            let manager = open_notes(&gate, &config).await?;
            let id = NoteId::new(note_id);
            manager.delete_note_by_id(&id).await?;
            println!("Deleted note {}", id);
        }
        Command::Show => {
            let manager = open_notes(&gate, &config).await?;
            show_notes(&manager).await?;
        }
    }

    Ok(())
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            debug!(?path, "Using provided config file");
            Config::load(path)?
        }
        None => Config::load_or_default(Config::default_path()?)?,
    };

    if let Some(dir) = &args.data_dir {
        config.storage.data_dir = dir.to_string_lossy().into_owned();
    }
    Ok(config)
}

/// Pass the authentication gate and mount the notes of the signed-in user
async fn open_notes(gate: &LocalAuthGate, config: &Config) -> Result<LocalNoteManager> {
    let session = gate.require().await?;
    let data_dir = config.data_dir()?;
    info!(data_dir = %data_dir.display(), user = %session.user, "Opening notes");

    let repository = SqliteNoteRepository::new(data_dir.join(constants::DATABASE_FILE_NAME))?;
    let storage = FilesystemStorage::new(
        data_dir.join(constants::OBJECTS_DIR_NAME),
        config.url_ttl(),
    )?;

    let manager =
        NoteManager::mount(session, gate.session_provider(), repository, storage).await?;
    Ok(manager)
}

fn list_notes(manager: &LocalNoteManager, json: bool) -> Result<()> {
    let notes = manager.notes();
    if json {
        println!("{}", serde_json::to_string_pretty(&notes)?);
    } else {
        print!("{}", TextPresenter::new().render(&notes));
    }
    Ok(())
}

async fn create_note(
    manager: &LocalNoteManager,
    form: NoteForm,
    image: Option<&Path>,
) -> Result<()> {
    manager.set_form(form);
    if let Some(path) = image {
        manager.select_image(load_image(path).await?);
    }
    let note = manager.create_note().await?;
    println!("Created note {}", note.id);
    if let Some(key) = &note.image {
        println!("Stored image as {}", key);
    }
    Ok(())
}

async fn show_notes(manager: &LocalNoteManager) -> Result<()> {
    let html = HtmlPresenter::new().render(manager.user(), &manager.form(), &manager.notes());
    let mut renderer = PageRenderer::new();
    let path = renderer.write_page(&html)?;
    renderer.open_in_browser(&path).await?;
    if renderer.persist().is_some() {
        println!("{}", path.display());
    }
    Ok(())
}

async fn load_image(path: &Path) -> Result<ImageFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image {}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .context("Image path has no file name")?;
    Ok(ImageFile::new(name, bytes))
}
