// src/util/testing.rs

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::env;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};
use url::Url;

use crate::application::{NoteRepository, ObjectStorage, SessionProvider};
use crate::domain::{DomainError, NewNote, Note, NoteId, Session, StorageKey, UserIdentity};

/// Service call as seen by the mock, in invocation order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Create(NewNote),
    Delete(NoteId),
    /// key and payload size
    Upload(StorageKey, usize),
    ResolveUrl(StorageKey),
    Remove(StorageKey),
}

/// Operation the mock should fail
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Failure {
    List,
    Create,
    Delete,
    Upload,
    /// fail URL resolution for this key only
    ResolveUrl(String),
    Remove,
}

#[derive(Default)]
struct MockState {
    notes: Vec<Note>,
    objects: HashMap<StorageKey, Vec<u8>>,
    urls: HashMap<String, Url>,
    failures: HashSet<Failure>,
    list_delays: VecDeque<Duration>,
    calls: Vec<Call>,
    next_id: u64,
}

/// Shared in-memory data and storage service for testing the note manager
///
/// Implements both `NoteRepository` and `ObjectStorage`; clones share state,
/// so a test keeps one handle to inspect the recorded calls.
///
/// # Examples
///
/// ```
/// use notegrid::util::testing::{Failure, MockBackend};
/// use notegrid::domain::{Note, NoteId};
///
/// let backend = MockBackend::builder()
///     .with_note(Note {
///         id: NoteId::new("1"),
///         name: "Groceries".to_string(),
///         description: "milk".to_string(),
///         image: None,
///     })
///     .with_failure(Failure::Upload)
///     .build();
/// assert_eq!(backend.notes().len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct MockBackend {
    inner: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn builder() -> MockBackendBuilder {
        MockBackendBuilder::new()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Current records, in creation order
    pub fn notes(&self) -> Vec<Note> {
        self.lock().notes.clone()
    }

    pub fn objects(&self) -> Vec<StorageKey> {
        self.lock().objects.keys().cloned().collect()
    }

    /// Add a record behind the manager's back
    pub fn insert_note(&self, note: Note) {
        self.lock().notes.push(note);
    }

    pub fn fail(&self, failure: Failure) {
        self.lock().failures.insert(failure);
    }

    fn record(&self, call: Call) -> MutexGuard<'_, MockState> {
        let mut state = self.lock();
        state.calls.push(call);
        state
    }
}

#[async_trait]
impl NoteRepository for MockBackend {
    async fn list_notes(&self) -> Result<Vec<Note>, DomainError> {
        let (notes, delay) = {
            let mut state = self.record(Call::List);
            if state.failures.contains(&Failure::List) {
                return Err(DomainError::Backend("list failed".to_string()));
            }
            (state.notes.clone(), state.list_delays.pop_front())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(notes)
    }

    async fn create_note(&self, note: NewNote) -> Result<Note, DomainError> {
        let mut state = self.record(Call::Create(note.clone()));
        if state.failures.contains(&Failure::Create) {
            return Err(DomainError::Backend("create failed".to_string()));
        }
        state.next_id += 1;
        let created = Note {
            id: NoteId::new(format!("mock-{}", state.next_id)),
            name: note.name,
            description: note.description,
            image: note.image,
        };
        state.notes.push(created.clone());
        Ok(created)
    }

    async fn delete_note(&self, id: &NoteId) -> Result<(), DomainError> {
        let mut state = self.record(Call::Delete(id.clone()));
        if state.failures.contains(&Failure::Delete) {
            return Err(DomainError::Backend("delete failed".to_string()));
        }
        let before = state.notes.len();
        state.notes.retain(|n| &n.id != id);
        if state.notes.len() == before {
            return Err(DomainError::NoteNotFound(id.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for MockBackend {
    async fn upload(&self, key: &StorageKey, bytes: Vec<u8>) -> Result<(), DomainError> {
        let mut state = self.record(Call::Upload(key.clone(), bytes.len()));
        if state.failures.contains(&Failure::Upload) {
            return Err(DomainError::Storage("upload failed".to_string()));
        }
        state.objects.insert(key.clone(), bytes);
        Ok(())
    }

    async fn resolve_url(&self, key: &StorageKey) -> Result<Url, DomainError> {
        let state = self.record(Call::ResolveUrl(key.clone()));
        if state
            .failures
            .contains(&Failure::ResolveUrl(key.to_string()))
        {
            return Err(DomainError::Storage(format!("cannot resolve {}", key)));
        }
        if let Some(url) = state.urls.get(key.as_str()) {
            return Ok(url.clone());
        }
        if state.objects.contains_key(key) {
            return Url::parse(&format!("https://cdn.test/{}", key))
                .map_err(|e| DomainError::Storage(e.to_string()));
        }
        Err(DomainError::ObjectNotFound(key.to_string()))
    }

    async fn remove(&self, key: &StorageKey) -> Result<(), DomainError> {
        let mut state = self.record(Call::Remove(key.clone()));
        if state.failures.contains(&Failure::Remove) {
            return Err(DomainError::Storage("remove failed".to_string()));
        }
        state.objects.remove(key);
        Ok(())
    }
}

/// Builder for MockBackend
///
/// Provides a fluent interface for configuring mock behavior.
pub struct MockBackendBuilder {
    state: MockState,
}

impl MockBackendBuilder {
    pub fn new() -> Self {
        Self {
            state: MockState::default(),
        }
    }

    /// Add a record returned by list_notes
    pub fn with_note(mut self, note: Note) -> Self {
        self.state.notes.push(note);
        self
    }

    /// Add a stored object so it resolves and can be removed
    pub fn with_object(mut self, key: &str) -> Self {
        if let Ok(key) = StorageKey::parse(key) {
            self.state.objects.insert(key, Vec::new());
        }
        self
    }

    /// Configure the URL resolve_url returns for a key
    pub fn with_url(mut self, key: &str, url: &str) -> Self {
        if let Ok(url) = Url::parse(url) {
            self.state.urls.insert(key.to_string(), url);
        }
        self
    }

    pub fn with_failure(mut self, failure: Failure) -> Self {
        self.state.failures.insert(failure);
        self
    }

    /// Delay successive list_notes calls after they read the records
    pub fn with_list_delays(mut self, delays: Vec<Duration>) -> Self {
        self.state.list_delays = delays.into();
        self
    }

    pub fn build(self) -> MockBackend {
        MockBackend {
            inner: Arc::new(Mutex::new(self.state)),
        }
    }
}

impl Default for MockBackendBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory session gate
#[derive(Default)]
pub struct MockSessionProvider {
    session: Mutex<Option<Session>>,
}

impl MockSessionProvider {
    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn signed_in(username: &str) -> Self {
        Self {
            session: Mutex::new(Some(Session::new(UserIdentity::new(username)))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SessionProvider for MockSessionProvider {
    async fn current_session(&self) -> Result<Option<Session>, DomainError> {
        Ok(self.lock().clone())
    }

    async fn sign_in(&self, user: UserIdentity) -> Result<Session, DomainError> {
        let session = Session::new(user);
        *self.lock() = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), DomainError> {
        *self.lock() = None;
        Ok(())
    }
}

pub fn init_test_setup() -> Result<()> {
    // Set up logging first
    setup_test_logging();

    info!("Test Setup complete");
    Ok(())
}

fn setup_test_logging() {
    debug!("INIT: Attempting logger init from testing.rs");
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "trace");
    }

    // Create a filter for noisy modules
    let noisy_modules = ["rusqlite", "mio", "tokio"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    // Set up the subscriber with environment filter
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    // Build and set the subscriber
    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}
