//! Authoritative cache of persisted notes plus coarse loading flags.
//!
//! The collection only changes when a remote call settles. There is no
//! optimistic placeholder for creates and no in-place edit without an id
//! returned by the service. Remote failures never escape this module: they
//! reset the matching flag, get logged, and are kept as `last_error` for
//! presentation.

use std::sync::Mutex;

use crate::models::{Note, NoteId, NotePatch};
use crate::remote::NoteService;
use crate::state::LoadingState;
use crate::util::lock;

#[derive(Debug, Default)]
struct NoteStoreState {
    notes: Vec<Note>,
    loading: LoadingState,
    last_error: Option<String>,
}

pub struct NoteStore<S> {
    service: S,
    state: Mutex<NoteStoreState>,
}

impl<S: NoteService> NoteStore<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            state: Mutex::new(NoteStoreState::default()),
        }
    }

    pub const fn service(&self) -> &S {
        &self.service
    }

    /// Snapshot of the collection in server order.
    pub fn notes(&self) -> Vec<Note> {
        lock(&self.state).notes.clone()
    }

    pub fn loading_state(&self) -> LoadingState {
        lock(&self.state).loading
    }

    pub fn find(&self, id: &NoteId) -> Option<Note> {
        lock(&self.state)
            .notes
            .iter()
            .find(|note| &note.id == id)
            .cloned()
    }

    /// Message of the most recent failed remote call, if any.
    pub fn last_error(&self) -> Option<String> {
        lock(&self.state).last_error.clone()
    }

    pub fn clear_error(&self) {
        lock(&self.state).last_error = None;
    }

    /// Load the collection from the service.
    ///
    /// Returns `false` when the call failed or a load is already running.
    /// `is_loading` is cleared on every outcome.
    pub async fn fetch_notes(&self) -> bool {
        {
            let mut state = lock(&self.state);
            if state.loading.is_loading {
                tracing::debug!("Ignoring fetch while notes are already loading");
                return false;
            }
            state.loading.is_loading = true;
        }

        let result = self.service.list().await;

        let mut state = lock(&self.state);
        state.loading.is_loading = false;
        match result {
            Ok(notes) => {
                tracing::info!("Loaded {} notes", notes.len());
                state.notes = dedup_by_id(notes);
                state.last_error = None;
                true
            }
            Err(error) => {
                tracing::warn!("Failed to load notes: {}", error);
                state.last_error = Some(format!("Failed to load notes: {error}"));
                false
            }
        }
    }

    /// Create an empty note and append it once the service confirms it.
    ///
    /// Returns `None` on failure or while another create is in flight.
    pub async fn create_note(&self) -> Option<Note> {
        {
            let mut state = lock(&self.state);
            if state.loading.is_creating {
                tracing::debug!("Ignoring create while another create is in flight");
                return None;
            }
            state.loading.is_creating = true;
        }

        let result = self.service.create().await;

        let mut state = lock(&self.state);
        state.loading.is_creating = false;
        match result {
            Ok(note) => {
                tracing::info!("Created note {}", note.id);
                match state.notes.iter_mut().find(|existing| existing.id == note.id) {
                    Some(existing) => existing.clone_from(&note),
                    None => state.notes.push(note.clone()),
                }
                Some(note)
            }
            Err(error) => {
                tracing::warn!("Failed to create note: {}", error);
                state.last_error = Some(format!("Failed to create note: {error}"));
                None
            }
        }
    }

    /// Persist `patch` and refresh the cached copy from the service's answer.
    ///
    /// On failure the cached note keeps its last known good content.
    pub async fn update_note_by_id(&self, id: &NoteId, patch: NotePatch) -> Option<Note> {
        let result = self.service.update(id, &patch).await;

        let mut state = lock(&self.state);
        match result {
            Ok(updated) => {
                if let Some(note) = state.notes.iter_mut().find(|note| &note.id == id) {
                    note.apply_update(&updated);
                    tracing::debug!("Saved note {}", id);
                } else {
                    tracing::debug!("Saved note {} is no longer in the collection", id);
                }
                Some(updated)
            }
            Err(error) => {
                tracing::warn!("Failed to save note {}: {}", id, error);
                state.last_error = Some(format!("Failed to save note: {error}"));
                None
            }
        }
    }

    /// Delete a note remotely, then drop it from the collection.
    ///
    /// Returns `false` on failure or while another delete is in flight.
    pub async fn delete_note_by_id(&self, id: &NoteId) -> bool {
        {
            let mut state = lock(&self.state);
            if state.loading.is_deleting {
                tracing::debug!("Ignoring delete of {} while another delete is in flight", id);
                return false;
            }
            state.loading.is_deleting = true;
        }

        let result = self.service.delete(id).await;

        let mut state = lock(&self.state);
        state.loading.is_deleting = false;
        match result {
            Ok(()) => {
                state.notes.retain(|note| &note.id != id);
                tracing::info!("Deleted note {}", id);
                true
            }
            Err(error) => {
                tracing::warn!("Failed to delete note {}: {}", id, error);
                state.last_error = Some(format!("Failed to delete note: {error}"));
                false
            }
        }
    }
}

fn dedup_by_id(notes: Vec<Note>) -> Vec<Note> {
    let mut unique: Vec<Note> = Vec::with_capacity(notes.len());
    for note in notes {
        if unique.iter().any(|existing| existing.id == note.id) {
            tracing::warn!("Dropping duplicate note id {} from service listing", note.id);
            continue;
        }
        unique.push(note);
    }
    unique
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::remote::{MemoryNoteService, RemoteOperation};

    fn seeded() -> (MemoryNoteService, NoteStore<MemoryNoteService>) {
        let service = MemoryNoteService::with_notes(vec![
            Note::new("1", "a", 1000),
            Note::new("2", "b", 2000),
        ]);
        (service.clone(), NoteStore::new(service))
    }

    #[tokio::test]
    async fn fetch_replaces_collection_in_server_order() {
        let (_, store) = seeded();
        assert!(store.fetch_notes().await);

        let ids = store
            .notes()
            .into_iter()
            .map(|note| note.id.to_string())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["1", "2"]);
        assert!(!store.loading_state().is_loading);
    }

    #[tokio::test]
    async fn fetch_failure_leaves_collection_empty_and_clears_loading() {
        let (service, store) = seeded();
        service.fail_next(RemoteOperation::List);

        assert!(!store.fetch_notes().await);
        assert!(store.notes().is_empty());
        assert!(!store.loading_state().is_loading);
        assert!(store.last_error().unwrap().contains("Failed to load notes"));
    }

    #[tokio::test]
    async fn fetch_drops_duplicate_ids() {
        let service = MemoryNoteService::with_notes(vec![
            Note::new("1", "first", 1),
            Note::new("1", "second", 2),
        ]);
        let store = NoteStore::new(service);
        store.fetch_notes().await;
        assert_eq!(store.notes(), vec![Note::new("1", "first", 1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn is_loading_is_set_while_list_is_in_flight() {
        let service = MemoryNoteService::new().with_latency(Duration::from_millis(100));
        let store = std::sync::Arc::new(NoteStore::new(service));

        let task = tokio::spawn({
            let store = std::sync::Arc::clone(&store);
            async move { store.fetch_notes().await }
        });
        tokio::task::yield_now().await;
        assert!(store.loading_state().is_loading);

        assert!(task.await.unwrap());
        assert!(!store.loading_state().is_loading);
    }

    #[tokio::test]
    async fn create_appends_confirmed_note() {
        let (_, store) = seeded();
        store.fetch_notes().await;

        let created = store.create_note().await.unwrap();
        let notes = store.notes();
        assert_eq!(notes.len(), 3);
        assert_eq!(notes.last(), Some(&created));
        assert!(!store.loading_state().is_creating);
    }

    #[tokio::test]
    async fn failed_create_appends_nothing() {
        let (service, store) = seeded();
        store.fetch_notes().await;
        service.fail_next(RemoteOperation::Create);

        assert!(store.create_note().await.is_none());
        assert_eq!(store.notes().len(), 2);
        assert!(!store.loading_state().is_creating);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_create_is_rejected_while_flag_is_set() {
        let service = MemoryNoteService::new().with_latency(Duration::from_millis(50));
        let store = NoteStore::new(service.clone());

        let (first, second) = tokio::join!(store.create_note(), store.create_note());
        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(service.notes().len(), 1);
    }

    #[tokio::test]
    async fn update_replaces_content_and_timestamp() {
        let (_, store) = seeded();
        store.fetch_notes().await;

        let updated = store
            .update_note_by_id(&NoteId::from("1"), NotePatch::content("abc"))
            .await
            .unwrap();
        let cached = store.find(&NoteId::from("1")).unwrap();
        assert_eq!(cached, updated);
        assert_eq!(cached.content, "abc");
    }

    #[tokio::test]
    async fn failed_update_keeps_last_known_good() {
        let (service, store) = seeded();
        store.fetch_notes().await;
        service.fail_next(RemoteOperation::Update);

        let result = store
            .update_note_by_id(&NoteId::from("1"), NotePatch::content("abc"))
            .await;
        assert!(result.is_none());
        assert_eq!(
            store.find(&NoteId::from("1")),
            Some(Note::new("1", "a", 1000))
        );
    }

    #[tokio::test]
    async fn delete_removes_note_on_success_only() {
        let (service, store) = seeded();
        store.fetch_notes().await;

        service.fail_next(RemoteOperation::Delete);
        assert!(!store.delete_note_by_id(&NoteId::from("1")).await);
        assert_eq!(store.notes().len(), 2);
        assert!(!store.loading_state().is_deleting);

        assert!(store.delete_note_by_id(&NoteId::from("1")).await);
        assert_eq!(store.notes(), vec![Note::new("2", "b", 2000)]);
        assert!(!store.loading_state().is_deleting);
    }
}
