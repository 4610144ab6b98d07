//! Note synchronizer.
//!
//! # Responsibility
//! - Own the in-memory note list, the loading gate and the draft input.
//! - Mediate `load`/`create`/`remove` between callers and a `DocumentStore`.
//! - Turn store failures into user notifications and typed errors.
//!
//! # Invariants
//! - `notes` is always the result of one successful list call, ordered as the
//!   store returned it. It is never patched from a create/delete response:
//!   every successful mutation is followed by a full re-read.
//! - A failed call leaves `notes` at its last-known-good value.
//! - The loading gate is released on every exit path.
//! - At most one mutation is in flight; a second one gets `SyncError::Busy`.
//! - A load that finishes after a newer load was applied is discarded.
//! - Note titles and bodies are never logged.

use crate::config::{
    ConfigError, SyncConfig, CONTENT_FIELD, CREATED_AT_FIELD, TITLE_FIELD,
};
use crate::model::note::{Note, NoteDraft, NoteId, NoteValidationError, Timestamp};
use crate::service::presenter::{Notification, Presenter, DELETE_CONFIRM_PROMPT};
use crate::store::{Document, DocumentFields, DocumentStore, FieldValue, StoreError};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

pub const VALIDATION_FAILED_MESSAGE: &str = "Please fill in both title and content!";
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load notes!";
pub const CREATE_FAILED_MESSAGE: &str = "Failed to add note!";
pub const DELETE_FAILED_MESSAGE: &str = "Failed to delete note!";

/// Failure of one synchronizer operation.
#[derive(Debug)]
pub enum SyncError {
    /// Input rejected locally; the store was not contacted.
    ValidationFailed(NoteValidationError),
    LoadFailed(StoreError),
    CreateFailed(StoreError),
    DeleteFailed(StoreError),
    /// Another mutation is still in flight.
    Busy,
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ValidationFailed(err) => write!(f, "validation failed: {err}"),
            Self::LoadFailed(err) => write!(f, "failed to load notes: {err}"),
            Self::CreateFailed(err) => write!(f, "failed to create note: {err}"),
            Self::DeleteFailed(err) => write!(f, "failed to delete note: {err}"),
            Self::Busy => write!(f, "another note operation is in progress"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ValidationFailed(err) => Some(err),
            Self::LoadFailed(err) | Self::CreateFailed(err) | Self::DeleteFailed(err) => Some(err),
            Self::Busy => None,
        }
    }
}

/// Result of a confirmed-or-declined delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// The user declined; nothing was sent to the store.
    Declined,
}

#[derive(Debug, Default)]
struct SyncState {
    notes: Vec<Note>,
    in_flight: u32,
    mutating: bool,
    next_load_ticket: u64,
    applied_load_ticket: u64,
    load_failed: bool,
    draft: NoteDraft,
}

/// Holds the loading gate open until dropped.
struct LoadingGuard<'a> {
    state: &'a Mutex<SyncState>,
    mutating: bool,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.in_flight = state.in_flight.saturating_sub(1);
        if self.mutating {
            state.mutating = false;
        }
    }
}

/// Keeps an in-memory note list consistent with a document store.
pub struct NoteSynchronizer<S: DocumentStore, P: Presenter> {
    store: S,
    presenter: P,
    config: SyncConfig,
    state: Mutex<SyncState>,
}

impl<S: DocumentStore, P: Presenter> NoteSynchronizer<S, P> {
    /// Creates a synchronizer over the default `notes` collection.
    pub fn new(store: S, presenter: P) -> Self {
        Self {
            store,
            presenter,
            config: SyncConfig::default(),
            state: Mutex::new(SyncState::default()),
        }
    }

    /// Creates a synchronizer with explicit configuration.
    pub fn with_config(store: S, presenter: P, config: SyncConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            store,
            presenter,
            config,
            state: Mutex::new(SyncState::default()),
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Snapshot of the last successfully loaded list.
    pub fn notes(&self) -> Vec<Note> {
        self.lock().notes.clone()
    }

    /// Whether any operation is in flight.
    pub fn loading(&self) -> bool {
        self.lock().in_flight > 0
    }

    /// Whether the latest finished load failed, leaving `notes` behind the
    /// store. False before the first load.
    pub fn notes_stale(&self) -> bool {
        self.lock().load_failed
    }

    pub fn draft(&self) -> NoteDraft {
        self.lock().draft.clone()
    }

    pub fn set_draft_title(&self, title: impl Into<String>) {
        self.lock().draft.title = title.into();
    }

    pub fn set_draft_content(&self, content: impl Into<String>) {
        self.lock().draft.content = content.into();
    }

    /// Re-reads the whole collection and replaces `notes`.
    ///
    /// Safe to call at any time, including while a mutation is in flight.
    pub async fn load(&self) -> Result<(), SyncError> {
        let (_guard, ticket) = self.enter_load();
        let started_at = Instant::now();

        let result = self
            .store
            .list_documents(
                &self.config.collection,
                &self.config.order_by,
                self.config.direction,
            )
            .await;

        match result {
            Ok(documents) => {
                let notes = decode_notes(documents);
                let mut state = self.lock();
                state.load_failed = false;
                if ticket > state.applied_load_ticket {
                    info!(
                        "event=notes_load module=sync status=ok count={} duration_ms={}",
                        notes.len(),
                        started_at.elapsed().as_millis()
                    );
                    state.notes = notes;
                    state.applied_load_ticket = ticket;
                } else {
                    debug!(
                        "event=notes_load module=sync status=stale ticket={ticket} applied={}",
                        state.applied_load_ticket
                    );
                }
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=notes_load module=sync status=error duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                self.lock().load_failed = true;
                self.presenter
                    .notify(&Notification::error(LOAD_FAILED_MESSAGE));
                Err(SyncError::LoadFailed(err))
            }
        }
    }

    /// Writes a new note, then re-reads the list.
    ///
    /// Returns the new id once the write is acknowledged. A failing refresh
    /// after a successful write is reported as a load failure but does not
    /// turn the create into an error.
    pub async fn create(
        &self,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<NoteId, SyncError> {
        let draft = NoteDraft::new(title, content);
        if let Err(err) = draft.validate() {
            warn!("event=note_create module=sync status=rejected reason={err}");
            self.presenter
                .notify(&Notification::error(VALIDATION_FAILED_MESSAGE));
            return Err(SyncError::ValidationFailed(err));
        }

        let _guard = self.enter_mutation("note_create")?;
        let started_at = Instant::now();
        let result = self
            .store
            .add_document(&self.config.collection, note_fields(draft))
            .await;

        match result {
            Ok(id) => {
                info!(
                    "event=note_create module=sync status=ok id={id} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                self.lock().draft.clear();
                if self.load().await.is_err() {
                    warn!("event=note_create module=sync status=ok refresh=failed id={id}");
                }
                Ok(NoteId::new(id))
            }
            Err(err) => {
                error!(
                    "event=note_create module=sync status=error duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                self.presenter
                    .notify(&Notification::error(CREATE_FAILED_MESSAGE));
                Err(SyncError::CreateFailed(err))
            }
        }
    }

    /// Submits the cached draft through [`create`](Self::create).
    pub async fn submit_draft(&self) -> Result<NoteId, SyncError> {
        let draft = self.draft();
        self.create(draft.title, draft.content).await
    }

    /// Deletes a note after user confirmation, then re-reads the list.
    pub async fn remove(&self, id: &NoteId) -> Result<RemoveOutcome, SyncError> {
        let _guard = self.enter_mutation("note_remove")?;
        if !self.presenter.confirm(DELETE_CONFIRM_PROMPT) {
            info!("event=note_remove module=sync status=declined id={id}");
            return Ok(RemoveOutcome::Declined);
        }

        let started_at = Instant::now();
        let result = self
            .store
            .delete_document(&self.config.collection, id.as_str())
            .await;

        match result {
            Ok(()) => {
                info!(
                    "event=note_remove module=sync status=ok id={id} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                if self.load().await.is_err() {
                    warn!("event=note_remove module=sync status=ok refresh=failed id={id}");
                }
                Ok(RemoveOutcome::Removed)
            }
            Err(err) => {
                error!(
                    "event=note_remove module=sync status=error id={id} duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                self.presenter
                    .notify(&Notification::error(DELETE_FAILED_MESSAGE));
                Err(SyncError::DeleteFailed(err))
            }
        }
    }

    fn enter_load(&self) -> (LoadingGuard<'_>, u64) {
        let mut state = self.lock();
        state.in_flight += 1;
        state.next_load_ticket += 1;
        let ticket = state.next_load_ticket;
        (
            LoadingGuard {
                state: &self.state,
                mutating: false,
            },
            ticket,
        )
    }

    fn enter_mutation(&self, event: &str) -> Result<LoadingGuard<'_>, SyncError> {
        let mut state = self.lock();
        if state.mutating {
            warn!("event={event} module=sync status=rejected reason=busy");
            return Err(SyncError::Busy);
        }
        state.mutating = true;
        state.in_flight += 1;
        Ok(LoadingGuard {
            state: &self.state,
            mutating: true,
        })
    }

    fn lock(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn note_fields(draft: NoteDraft) -> DocumentFields {
    let mut fields = DocumentFields::new();
    fields.insert(TITLE_FIELD.to_string(), FieldValue::Text(draft.title));
    fields.insert(CONTENT_FIELD.to_string(), FieldValue::Text(draft.content));
    fields.insert(CREATED_AT_FIELD.to_string(), FieldValue::ServerTimestamp);
    fields
}

/// Projects store documents onto notes, keeping their order.
///
/// Documents without text `title`/`content` are skipped.
fn decode_notes(documents: Vec<Document>) -> Vec<Note> {
    documents
        .into_iter()
        .filter_map(|document| {
            let note = decode_note(&document);
            if note.is_none() {
                warn!(
                    "event=note_decode module=sync status=skipped id={}",
                    document.id
                );
            }
            note
        })
        .collect()
}

fn decode_note(document: &Document) -> Option<Note> {
    let title = document.fields.get(TITLE_FIELD)?.as_text()?;
    let content = document.fields.get(CONTENT_FIELD)?.as_text()?;
    let created_at = match document.fields.get(CREATED_AT_FIELD) {
        Some(FieldValue::Timestamp(epoch_ms)) => Timestamp::Committed(*epoch_ms),
        _ => Timestamp::Pending,
    };
    Some(Note {
        id: NoteId::new(document.id.clone()),
        title: title.to_string(),
        content: content.to_string(),
        created_at,
    })
}
