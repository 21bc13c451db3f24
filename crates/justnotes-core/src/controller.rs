//! Synchronization controller.
//!
//! The only component allowed to sequence operations across the note store,
//! the board store and the autosave scheduler. Presentation either calls the
//! methods directly or hands an [`Intent`] to [`SyncController::dispatch`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};

use crate::auth::AuthService;
use crate::autosave::AutosaveScheduler;
use crate::events::{DomainEvent, EventBus};
use crate::models::{Note, NoteId, NotePatch};
use crate::remote::NoteService;
use crate::state::{Route, WorkspaceSnapshot};
use crate::stores::{BoardStore, NoteStore};

/// User intents understood by the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Select(NoteId),
    Edit(String),
    CreateRequested,
    DeleteRequested(NoteId),
    DeleteConfirmed,
    DeleteCancelled,
}

pub struct SyncController<S: NoteService, A: AuthService> {
    notes: Arc<NoteStore<S>>,
    board: BoardStore,
    autosave: AutosaveScheduler,
    auth: A,
    events: EventBus,
    focus: watch::Sender<Option<NoteId>>,
}

impl<S: NoteService, A: AuthService> SyncController<S, A> {
    pub fn new(service: S, auth: A) -> Self {
        let (focus, _) = watch::channel(None);
        Self {
            notes: Arc::new(NoteStore::new(service)),
            board: BoardStore::new(),
            autosave: AutosaveScheduler::default(),
            auth,
            events: EventBus::new(),
            focus,
        }
    }

    #[must_use]
    pub fn with_quiet_period(mut self, quiet_period: Duration) -> Self {
        self.autosave = AutosaveScheduler::new(quiet_period);
        self
    }

    /// Publish events on a bus shared with other components.
    #[must_use]
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn notes(&self) -> &NoteStore<S> {
        &self.notes
    }

    pub const fn board(&self) -> &BoardStore {
        &self.board
    }

    pub const fn autosave(&self) -> &AutosaveScheduler {
        &self.autosave
    }

    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    pub const fn auth(&self) -> &A {
        &self.auth
    }

    pub fn snapshot(&self) -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            notes: self.notes.notes(),
            loading: self.notes.loading_state(),
            board: self.board.snapshot(),
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DomainEvent> {
        self.events.subscribe()
    }

    /// Note the editor should take focus for, updated on every selection.
    pub fn focus_requests(&self) -> watch::Receiver<Option<NoteId>> {
        self.focus.subscribe()
    }

    /// Wait for armed autosaves to fire and settle.
    pub async fn wait_for_autosave(&self) {
        self.autosave.wait_idle().await;
    }

    /// Load the collection on workspace entry.
    pub async fn enter_workspace(&self) -> bool {
        self.notes.fetch_notes().await
    }

    pub async fn dispatch(&self, intent: Intent) -> bool {
        tracing::debug!("Dispatching {:?}", intent);
        match intent {
            Intent::Select(id) => self.select_by_id(&id),
            Intent::Edit(text) => self.edit(text),
            Intent::CreateRequested => self.create().await.is_some(),
            Intent::DeleteRequested(id) => self.request_delete_by_id(&id),
            Intent::DeleteConfirmed => self.confirm_delete().await,
            Intent::DeleteCancelled => {
                self.cancel_delete();
                true
            }
        }
    }

    pub fn select(&self, note: &Note) -> bool {
        if self.is_loading() {
            return false;
        }
        self.board.select_note(note);
        self.focus.send_replace(Some(note.id.clone()));
        true
    }

    /// Select a note of the collection by id. Unknown ids are ignored.
    pub fn select_by_id(&self, id: &NoteId) -> bool {
        match self.notes.find(id) {
            Some(note) => self.select(&note),
            None => {
                tracing::debug!("Ignoring selection of unknown note {}", id);
                false
            }
        }
    }

    /// Replace the draft and (re)arm the autosave for the selected note.
    ///
    /// The save carries `text` and the id selected right now, whatever the
    /// selection is when the timer fires.
    pub fn edit(&self, text: impl Into<String>) -> bool {
        if self.is_loading() {
            return false;
        }
        let text = text.into();
        let Some(id) = self.board.update_selected_content(text.clone()) else {
            tracing::debug!("Ignoring edit without a selected note");
            return false;
        };

        let notes = Arc::clone(&self.notes);
        let events = self.events.clone();
        let patch = NotePatch::content(text);
        self.autosave.schedule(id.clone(), move || async move {
            if notes.update_note_by_id(&id, patch).await.is_some() {
                events.emit(DomainEvent::NoteUpdated { id });
            }
        });
        true
    }

    /// Create an empty note and select it so typing can start right away.
    pub async fn create(&self) -> Option<Note> {
        if self.is_loading() {
            return None;
        }
        let note = self.notes.create_note().await?;
        self.select(&note);
        self.events.emit(DomainEvent::NoteCreated {
            id: note.id.clone(),
        });
        Some(note)
    }

    /// Open the delete confirmation for `id`. Never deletes by itself.
    pub fn request_delete_by_id(&self, id: &NoteId) -> bool {
        if self.is_loading() || self.notes.find(id).is_none() {
            return false;
        }
        self.board.select_id_to_delete(id.clone());
        true
    }

    /// Delete the note awaiting confirmation.
    ///
    /// The confirmation closes on both outcomes; a failed delete leaves the
    /// note in the collection and is only visible through `last_error`.
    pub async fn confirm_delete(&self) -> bool {
        let Some(id) = self.board.note_id_to_delete() else {
            return false;
        };
        let loading = self.notes.loading_state();
        if loading.is_loading || loading.is_deleting {
            return false;
        }

        let deleted = self.notes.delete_note_by_id(&id).await;
        if deleted {
            if self.autosave.cancel(&id) {
                tracing::debug!("Dropped pending autosave for deleted note {}", id);
            }
            if self.board.selected_note_id().as_ref() == Some(&id) {
                self.board.clear_select();
                self.focus.send_replace(None);
            }
            self.events.emit(DomainEvent::NoteDeleted { id });
        }
        self.board.clear_delete();
        deleted
    }

    /// Close the delete confirmation. A no-op when none is open.
    pub fn cancel_delete(&self) {
        self.board.clear_delete();
    }

    /// Sign out and leave the workspace.
    ///
    /// Leaving never depends on the auth backend: a failed sign-out is
    /// logged and the route is still [`Route::SignIn`]. Armed autosaves are
    /// not flushed; they keep running in the background.
    pub async fn logout(&self) -> Route {
        match self.auth.logout().await {
            Ok(()) => tracing::info!("Logged out"),
            Err(error) => tracing::warn!("Logout did not reach the auth service: {}", error),
        }
        self.events.emit(DomainEvent::UserLoggedOut);
        Route::SignIn
    }

    fn is_loading(&self) -> bool {
        let loading = self.notes.loading_state().is_loading;
        if loading {
            tracing::debug!("Ignoring intent while notes are loading");
        }
        loading
    }
}
