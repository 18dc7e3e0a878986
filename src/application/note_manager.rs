// src/application/note_manager.rs
use crate::application::{NoteRepository, ObjectStorage, SessionProvider};
use crate::domain::{
    DomainError, ImageFile, NewNote, Note, NoteCard, NoteForm, NoteId, Session, StorageKey,
    UserIdentity,
};
use futures::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

/// State owned by the manager, replaced or reset only by its operations
#[derive(Debug, Default)]
struct ViewState {
    notes: Vec<NoteCard>,
    form: NoteForm,
    image_file: Option<ImageFile>,
    // sequence number of the fetch whose snapshot is in `notes`
    applied_fetch: u64,
}

/// Outcome of a refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchReport {
    pub notes: usize,
    /// Images whose URL could not be resolved, their cards stay unannotated
    pub unresolved_images: usize,
    /// False when a later-started fetch already replaced the list
    pub applied: bool,
}

/// Create, list and delete notes of the signed-in user.
///
/// Holds the note list snapshot, the creation form draft and the pending
/// image. Operations take `&self` and may overlap; the lock on the view
/// state is never held across a service call.
pub struct NoteManager<R: NoteRepository, S: ObjectStorage> {
    session: Session,
    sessions: Arc<dyn SessionProvider>,
    repository: R,
    storage: S,
    state: Mutex<ViewState>,
    fetch_seq: AtomicU64,
}

impl<R: NoteRepository, S: ObjectStorage> NoteManager<R, S> {
    pub fn new(
        session: Session,
        sessions: Arc<dyn SessionProvider>,
        repository: R,
        storage: S,
    ) -> Self {
        Self {
            session,
            sessions,
            repository,
            storage,
            state: Mutex::new(ViewState::default()),
            fetch_seq: AtomicU64::new(0),
        }
    }

    /// Build the manager and load the initial note list
    pub async fn mount(
        session: Session,
        sessions: Arc<dyn SessionProvider>,
        repository: R,
        storage: S,
    ) -> Result<Self, DomainError> {
        let manager = Self::new(session, sessions, repository, storage);
        manager.fetch_notes().await?;
        Ok(manager)
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn user(&self) -> &UserIdentity {
        &self.session.user
    }

    pub fn notes(&self) -> Vec<NoteCard> {
        self.state().notes.clone()
    }

    pub fn form(&self) -> NoteForm {
        self.state().form.clone()
    }

    pub fn set_form(&self, form: NoteForm) {
        self.state().form = form;
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.state().form.name = name.into();
    }

    pub fn set_description(&self, description: impl Into<String>) {
        self.state().form.description = description.into();
    }

    /// Select the file to upload with the next create, replacing any earlier pick
    pub fn select_image(&self, file: ImageFile) {
        debug!(?file, "Image selected");
        self.state().image_file = Some(file);
    }

    pub fn clear_image(&self) {
        self.state().image_file = None;
    }

    pub fn image_file(&self) -> Option<ImageFile> {
        self.state().image_file.clone()
    }

    /// End the session this manager was opened with and drop the view state
    #[instrument(level = "debug", skip(self))]
    pub async fn sign_out(&self) -> Result<(), DomainError> {
        self.sessions.sign_out().await?;
        *self.state() = ViewState::default();
        info!(user = %self.session.user, "Signed out");
        Ok(())
    }

    /// Reload all notes and resolve the display URL of every attached image.
    ///
    /// URL resolution runs concurrently for all notes. A failed resolution
    /// leaves that card without URL; a failed list call keeps the previous
    /// snapshot.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_notes(&self) -> Result<FetchReport, DomainError> {
        let seq = self.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let records = self.repository.list_notes().await?;
        debug!(seq, count = records.len(), "Fetched note records");

        let storage = &self.storage;
        let resolved = join_all(records.into_iter().map(|note| async move {
            let Some(key) = note.image.clone() else {
                return (NoteCard::new(note), false);
            };
            match storage.resolve_url(&key).await {
                Ok(url) => (NoteCard::with_image_url(note, url), false),
                Err(e) => {
                    warn!(note_id = %note.id, %key, error = %e, "Failed to resolve image URL");
                    (NoteCard::new(note), true)
                }
            }
        }))
        .await;

        let unresolved_images = resolved.iter().filter(|(_, failed)| *failed).count();
        let cards: Vec<NoteCard> = resolved.into_iter().map(|(card, _)| card).collect();
        let count = cards.len();

        let mut state = self.state();
        let applied = seq > state.applied_fetch;
        if applied {
            state.notes = cards;
            state.applied_fetch = seq;
        } else {
            debug!(
                seq,
                newer = state.applied_fetch,
                "Discarding stale snapshot, a later fetch already applied"
            );
        }

        Ok(FetchReport {
            notes: count,
            unresolved_images,
            applied,
        })
    }

    /// Create a note from the current form and pending image.
    ///
    /// The image is uploaded first under a fresh `media/<uuid>/<name>` key.
    /// If the record cannot be created afterwards the upload is removed
    /// again. On success the form and pending image are cleared before the
    /// list is refreshed.
    #[instrument(level = "debug", skip(self))]
    pub async fn create_note(&self) -> Result<Note, DomainError> {
        let (form, image_file) = {
            let state = self.state();
            (state.form.clone(), state.image_file.clone())
        };

        let image = match image_file {
            Some(file) => {
                let key = StorageKey::generate(&file.name);
                debug!(%key, size = file.bytes.len(), "Uploading image");
                self.storage.upload(&key, file.bytes).await?;
                Some(key)
            }
            None => None,
        };

        let new_note = NewNote {
            name: form.name,
            description: form.description,
            image: image.clone(),
        };

        let created = match self.repository.create_note(new_note).await {
            Ok(note) => note,
            Err(e) => {
                if let Some(key) = &image {
                    match self.storage.remove(key).await {
                        Ok(()) => debug!(%key, "Removed upload of failed create"),
                        Err(cleanup) => {
                            warn!(%key, error = %cleanup, "Failed to remove upload of failed create")
                        }
                    }
                }
                return Err(e);
            }
        };
        info!(note_id = %created.id, "Created note");

        {
            let mut state = self.state();
            state.form = NoteForm::default();
            state.image_file = None;
        }

        self.fetch_notes().await?;
        Ok(created)
    }

    /// Delete the note record, then its stored image.
    ///
    /// When the record is gone but the image removal fails the list is
    /// still refreshed and `DomainError::OrphanedObject` is returned.
    #[instrument(level = "debug", skip_all)]
    pub async fn delete_note(&self, note: impl AsRef<Note>) -> Result<(), DomainError> {
        let note = note.as_ref();
        self.repository.delete_note(&note.id).await?;
        info!(note_id = %note.id, "Deleted note");

        let orphan = match &note.image {
            Some(key) => match self.storage.remove(key).await {
                Ok(()) => None,
                Err(e) => {
                    warn!(%key, error = %e, "Note deleted but image remains in storage");
                    Some(DomainError::OrphanedObject {
                        key: key.to_string(),
                        reason: e.to_string(),
                    })
                }
            },
            None => None,
        };

        self.fetch_notes().await?;
        match orphan {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Delete a note of the current snapshot by id
    pub async fn delete_note_by_id(&self, id: &NoteId) -> Result<(), DomainError> {
        let note = self
            .state()
            .notes
            .iter()
            .find(|card| &card.note.id == id)
            .map(|card| card.note.clone())
            .ok_or_else(|| DomainError::NoteNotFound(id.to_string()))?;
        self.delete_note(&note).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::testing::{Call, Failure, MockBackend, MockSessionProvider};
    use std::time::Duration;
    use url::Url;

    fn session() -> Session {
        Session::new(UserIdentity::new("alice"))
    }

    fn sessions() -> Arc<MockSessionProvider> {
        Arc::new(MockSessionProvider::signed_in("alice"))
    }

    fn manager(backend: &MockBackend) -> NoteManager<MockBackend, MockBackend> {
        NoteManager::new(session(), sessions(), backend.clone(), backend.clone())
    }

    fn note(id: &str, name: &str, image: Option<&str>) -> Note {
        Note {
            id: NoteId::new(id),
            name: name.to_string(),
            description: format!("{} description", name),
            image: image.map(|k| StorageKey::parse(k).unwrap()),
        }
    }

    #[tokio::test]
    async fn given_note_with_image_when_fetching_then_annotates_resolved_url() {
        // Arrange
        let backend = MockBackend::builder()
            .with_note(Note {
                id: NoteId::new("1"),
                name: "A".to_string(),
                description: "d".to_string(),
                image: Some(StorageKey::parse("media/x/y.png").unwrap()),
            })
            .with_url("media/x/y.png", "https://cdn/x/y.png")
            .build();
        let manager = manager(&backend);

        // Act
        let report = manager.fetch_notes().await.expect("fetch should succeed");

        // Assert
        assert_eq!(report.notes, 1);
        assert!(report.applied);
        let notes = manager.notes();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].note.id.as_str(), "1");
        assert_eq!(notes[0].note.name, "A");
        assert_eq!(notes[0].note.description, "d");
        assert_eq!(notes[0].note.image.as_ref().unwrap().as_str(), "media/x/y.png");
        assert_eq!(
            notes[0].image_url,
            Some(Url::parse("https://cdn/x/y.png").unwrap())
        );
    }

    #[tokio::test]
    async fn given_n_notes_with_m_images_when_fetching_then_resolves_exactly_m_urls() {
        // Arrange
        let backend = MockBackend::builder()
            .with_note(note("1", "one", Some("media/a/1.png")))
            .with_note(note("2", "two", None))
            .with_note(note("3", "three", Some("media/c/3.png")))
            .with_note(note("4", "four", None))
            .with_url("media/a/1.png", "https://cdn/a/1.png")
            .with_url("media/c/3.png", "https://cdn/c/3.png")
            .build();
        let manager = manager(&backend);

        // Act
        manager.fetch_notes().await.expect("fetch should succeed");

        // Assert
        let resolves = backend
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::ResolveUrl(_)))
            .count();
        assert_eq!(resolves, 2);
        let notes = manager.notes();
        assert_eq!(notes.len(), 4);
        assert_eq!(notes.iter().filter(|c| c.image_url.is_some()).count(), 2);
        assert!(notes
            .iter()
            .filter(|c| c.note.image.is_none())
            .all(|c| c.image_url.is_none()));
    }

    #[tokio::test]
    async fn given_one_url_fails_when_fetching_then_keeps_other_annotations() {
        // Arrange
        let backend = MockBackend::builder()
            .with_note(note("1", "one", Some("media/a/1.png")))
            .with_note(note("2", "two", Some("media/b/2.png")))
            .with_url("media/a/1.png", "https://cdn/a/1.png")
            .with_failure(Failure::ResolveUrl("media/b/2.png".to_string()))
            .build();
        let manager = manager(&backend);

        // Act
        let report = manager.fetch_notes().await.expect("fetch should succeed");

        // Assert
        assert_eq!(report.unresolved_images, 1);
        let notes = manager.notes();
        assert_eq!(notes.len(), 2);
        assert!(notes[0].image_url.is_some());
        assert!(notes[1].image_url.is_none());
        assert_eq!(notes[1].note.image.as_ref().unwrap().as_str(), "media/b/2.png");
    }

    #[tokio::test]
    async fn given_list_fails_when_fetching_then_keeps_previous_snapshot() {
        // Arrange
        let backend = MockBackend::builder()
            .with_note(note("1", "one", None))
            .build();
        let manager = manager(&backend);
        manager.fetch_notes().await.expect("first fetch should succeed");
        backend.fail(Failure::List);

        // Act
        let result = manager.fetch_notes().await;

        // Assert
        assert!(matches!(result, Err(DomainError::Backend(_))));
        assert_eq!(manager.notes().len(), 1);
    }

    #[tokio::test]
    async fn given_slow_earlier_fetch_when_newer_fetch_applied_first_then_discards_stale() {
        // Arrange
        let backend = MockBackend::builder()
            .with_note(note("1", "one", None))
            .with_list_delays(vec![Duration::from_millis(200)])
            .build();
        let manager = manager(&backend);

        // Act
        let (slow, fast) = tokio::join!(manager.fetch_notes(), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            backend.insert_note(note("2", "two", None));
            manager.fetch_notes().await
        });

        // Assert
        let slow = slow.expect("slow fetch should succeed");
        let fast = fast.expect("fast fetch should succeed");
        assert!(fast.applied);
        assert!(!slow.applied);
        assert_eq!(slow.notes, 1);
        assert_eq!(manager.notes().len(), 2);
    }

    #[tokio::test]
    async fn given_no_image_when_creating_then_creates_record_and_refreshes() {
        // Arrange
        let backend = MockBackend::builder().build();
        let manager = manager(&backend);
        manager.set_form(NoteForm::new("N", "D"));

        // Act
        let created = manager.create_note().await.expect("create should succeed");

        // Assert
        assert_eq!(created.image, None);
        assert_eq!(
            backend.calls(),
            vec![
                Call::Create(NewNote {
                    name: "N".to_string(),
                    description: "D".to_string(),
                    image: None,
                }),
                Call::List,
            ]
        );
        assert_eq!(manager.form(), NoteForm::new("", ""));
        assert_eq!(manager.notes().len(), 1);
    }

    #[tokio::test]
    async fn given_refresh_fails_when_creating_then_returns_err_and_clears_form() {
        // Arrange
        let backend = MockBackend::builder()
            .with_failure(Failure::List)
            .build();
        let manager = manager(&backend);
        manager.set_form(NoteForm::new("N", "D"));

        // Act
        let result = manager.create_note().await;

        // Assert
        assert!(matches!(result, Err(DomainError::Backend(_))));
        assert!(manager.form().is_empty());
        assert_eq!(backend.notes().len(), 1);
    }

    #[tokio::test]
    async fn given_image_selected_when_creating_then_uploads_under_namespaced_key() {
        // Arrange
        let backend = MockBackend::builder().build();
        let manager = manager(&backend);
        manager.set_name("Cat");
        manager.set_description("A cat");
        manager.select_image(ImageFile::new("cat.png", vec![0x89, 0x50, 0x4e, 0x47]));

        // Act
        let created = manager.create_note().await.expect("create should succeed");

        // Assert
        let key = created.image.clone().expect("note should reference an image");
        assert!(key.is_namespaced());
        assert!(key.as_str().ends_with("/cat.png"));
        let calls = backend.calls();
        assert_eq!(calls[0], Call::Upload(key.clone(), 4));
        assert!(matches!(&calls[1], Call::Create(n) if n.image.as_ref() == Some(&key)));
        assert_eq!(manager.image_file(), None);
        assert!(manager.form().is_empty());
        let notes = manager.notes();
        assert_eq!(notes[0].note, created);
        assert!(notes[0].image_url.is_some());
    }

    #[tokio::test]
    async fn given_cleared_image_when_creating_then_skips_upload() {
        let backend = MockBackend::builder().build();
        let manager = manager(&backend);
        manager.select_image(ImageFile::new("cat.png", vec![1]));
        manager.clear_image();

        let created = manager.create_note().await.expect("create should succeed");

        assert_eq!(created.image, None);
        assert!(!backend.calls().iter().any(|c| matches!(c, Call::Upload(..))));
    }

    #[tokio::test]
    async fn given_empty_form_when_creating_then_accepts_note() {
        let backend = MockBackend::builder().build();
        let manager = manager(&backend);

        let created = manager.create_note().await.expect("create should succeed");

        assert_eq!(created.name, "");
        assert_eq!(created.description, "");
    }

    #[tokio::test]
    async fn given_upload_fails_when_creating_then_keeps_form_and_creates_nothing() {
        // Arrange
        let backend = MockBackend::builder()
            .with_failure(Failure::Upload)
            .build();
        let manager = manager(&backend);
        manager.set_form(NoteForm::new("N", "D"));
        manager.select_image(ImageFile::new("cat.png", vec![1]));

        // Act
        let result = manager.create_note().await;

        // Assert
        assert!(matches!(result, Err(DomainError::Storage(_))));
        assert!(backend.notes().is_empty());
        assert!(!backend.calls().iter().any(|c| matches!(c, Call::Create(_) | Call::List)));
        assert_eq!(manager.form(), NoteForm::new("N", "D"));
        assert_eq!(manager.image_file(), Some(ImageFile::new("cat.png", vec![1])));
    }

    #[tokio::test]
    async fn given_record_create_fails_when_creating_with_image_then_removes_upload() {
        // Arrange
        let backend = MockBackend::builder()
            .with_failure(Failure::Create)
            .build();
        let manager = manager(&backend);
        manager.set_form(NoteForm::new("N", "D"));
        manager.select_image(ImageFile::new("cat.png", vec![1, 2]));

        // Act
        let result = manager.create_note().await;

        // Assert
        assert!(matches!(result, Err(DomainError::Backend(_))));
        assert!(backend.objects().is_empty());
        let calls = backend.calls();
        let Call::Upload(uploaded, _) = &calls[0] else {
            panic!("Expected upload first, got {:?}", calls);
        };
        assert_eq!(calls.last(), Some(&Call::Remove(uploaded.clone())));
        assert_eq!(manager.form(), NoteForm::new("N", "D"));
    }

    #[tokio::test]
    async fn given_note_with_image_when_deleting_then_removes_object_after_record() {
        // Arrange
        let key = "media/x/y.png";
        let backend = MockBackend::builder()
            .with_note(note("1", "one", Some(key)))
            .with_object(key)
            .build();
        let manager = manager(&backend);
        manager.fetch_notes().await.expect("fetch should succeed");
        let target = manager.notes().remove(0);
        backend.clear_calls();

        // Act
        manager.delete_note(&target).await.expect("delete should succeed");

        // Assert
        let calls = backend.calls();
        assert_eq!(calls[0], Call::Delete(NoteId::new("1")));
        assert_eq!(calls[1], Call::Remove(StorageKey::parse(key).unwrap()));
        assert_eq!(calls[2], Call::List);
        assert!(manager.notes().is_empty());
        assert!(backend.objects().is_empty());
    }

    #[tokio::test]
    async fn given_note_without_image_when_deleting_then_no_storage_removal() {
        // Arrange
        let backend = MockBackend::builder()
            .with_note(note("1", "one", None))
            .build();
        let manager = manager(&backend);
        let target = note("1", "one", None);

        // Act
        manager.delete_note(&target).await.expect("delete should succeed");

        // Assert
        assert!(!backend.calls().iter().any(|c| matches!(c, Call::Remove(_))));
        assert!(backend.notes().is_empty());
    }

    #[tokio::test]
    async fn given_record_delete_fails_when_deleting_then_storage_untouched() {
        // Arrange
        let backend = MockBackend::builder()
            .with_note(note("1", "one", Some("media/x/y.png")))
            .with_object("media/x/y.png")
            .with_failure(Failure::Delete)
            .build();
        let manager = manager(&backend);

        // Act
        let result = manager.delete_note(note("1", "one", Some("media/x/y.png"))).await;

        // Assert
        assert!(result.is_err());
        assert_eq!(backend.calls(), vec![Call::Delete(NoteId::new("1"))]);
        assert_eq!(backend.objects().len(), 1);
    }

    #[tokio::test]
    async fn given_storage_removal_fails_when_deleting_then_reports_orphan_and_refreshes() {
        // Arrange
        let backend = MockBackend::builder()
            .with_note(note("1", "one", Some("media/x/y.png")))
            .with_note(note("2", "two", None))
            .with_object("media/x/y.png")
            .with_failure(Failure::Remove)
            .build();
        let manager = manager(&backend);

        // Act
        let result = manager.delete_note(note("1", "one", Some("media/x/y.png"))).await;

        // Assert
        match result {
            Err(DomainError::OrphanedObject { key, .. }) => assert_eq!(key, "media/x/y.png"),
            other => panic!("Expected OrphanedObject, got {:?}", other),
        }
        let notes = manager.notes();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].note.id.as_str(), "2");
    }

    #[tokio::test]
    async fn given_unknown_id_when_deleting_by_id_then_returns_not_found() {
        let backend = MockBackend::builder().build();
        let manager = manager(&backend);

        let result = manager.delete_note_by_id(&NoteId::new("missing")).await;

        assert!(matches!(result, Err(DomainError::NoteNotFound(id)) if id == "missing"));
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn given_selected_image_when_reading_image_file_then_returns_pending_file() {
        let backend = MockBackend::builder().build();
        let manager = manager(&backend);
        assert_eq!(manager.image_file(), None);

        manager.select_image(ImageFile::new("dog.gif", vec![7, 8, 9]));

        assert_eq!(manager.image_file(), Some(ImageFile::new("dog.gif", vec![7, 8, 9])));
    }

    #[tokio::test]
    async fn given_signed_in_manager_when_signing_out_then_session_ends_and_view_resets() {
        // Arrange
        let backend = MockBackend::builder()
            .with_note(note("1", "one", None))
            .build();
        let provider = sessions();
        let manager =
            NoteManager::mount(session(), provider.clone(), backend.clone(), backend.clone())
                .await
                .expect("mount should succeed");
        manager.set_form(NoteForm::new("N", "D"));
        manager.select_image(ImageFile::new("cat.png", vec![1]));

        // Act
        manager.sign_out().await.expect("sign out should succeed");

        // Assert
        let current = provider.current_session().await.expect("session lookup should succeed");
        assert!(current.is_none());
        assert!(manager.notes().is_empty());
        assert!(manager.form().is_empty());
        assert_eq!(manager.image_file(), None);
    }

    #[tokio::test]
    async fn given_mixed_operations_when_each_completes_then_snapshot_matches_backend() {
        // Arrange
        let backend = MockBackend::builder()
            .with_note(note("seed", "seed", None))
            .build();
        let manager = NoteManager::mount(session(), sessions(), backend.clone(), backend.clone())
            .await
            .expect("mount should succeed");

        // Act & Assert
        manager.set_form(NoteForm::new("first", "1"));
        manager.select_image(ImageFile::new("a.png", vec![1]));
        let first = manager.create_note().await.expect("create should succeed");
        assert_eq!(snapshot_ids(&manager), backend_ids(&backend));

        manager.set_form(NoteForm::new("second", "2"));
        manager.create_note().await.expect("create should succeed");
        assert_eq!(snapshot_ids(&manager), backend_ids(&backend));

        manager.delete_note(&first).await.expect("delete should succeed");
        assert_eq!(snapshot_ids(&manager), backend_ids(&backend));

        manager
            .delete_note_by_id(&NoteId::new("seed"))
            .await
            .expect("delete should succeed");
        assert_eq!(snapshot_ids(&manager), backend_ids(&backend));
        assert_eq!(manager.notes().len(), 1);
        assert!(backend.objects().is_empty());
    }

    fn snapshot_ids(manager: &NoteManager<MockBackend, MockBackend>) -> Vec<NoteId> {
        manager.notes().into_iter().map(|c| c.note.id).collect()
    }

    fn backend_ids(backend: &MockBackend) -> Vec<NoteId> {
        backend.notes().into_iter().map(|n| n.id).collect()
    }
}
