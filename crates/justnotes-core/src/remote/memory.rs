//! Process-local note service.
//!
//! Backs the CLI demo shell and doubles as the remote in tests: every call
//! is recorded, failures can be injected per operation, and an artificial
//! latency turns each call into a real suspension point.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uuid::Uuid;

use super::NoteService;
use crate::models::{Note, NoteId, NotePatch};
use crate::util::{lock, unix_timestamp_millis};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOperation {
    List,
    Create,
    Update,
    Delete,
}

/// A call as received by the service, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    List,
    Create,
    Update { id: NoteId, content: String },
    Delete { id: NoteId },
}

impl RemoteCall {
    const fn operation(&self) -> RemoteOperation {
        match self {
            Self::List => RemoteOperation::List,
            Self::Create => RemoteOperation::Create,
            Self::Update { .. } => RemoteOperation::Update,
            Self::Delete { .. } => RemoteOperation::Delete,
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    notes: Vec<Note>,
    calls: Vec<RemoteCall>,
    pending_failures: HashMap<RemoteOperation, usize>,
    pending_delays: HashMap<RemoteOperation, VecDeque<Duration>>,
    latency: Duration,
}

impl MemoryState {
    fn take_failure(&mut self, operation: RemoteOperation) -> bool {
        match self.pending_failures.get_mut(&operation) {
            Some(count) if *count > 0 => {
                *count -= 1;
                true
            }
            _ => false,
        }
    }

    fn take_delay(&mut self, operation: RemoteOperation) -> Duration {
        self.pending_delays
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
            .unwrap_or(self.latency)
    }

    fn position(&self, id: &NoteId) -> Result<usize> {
        self.notes
            .iter()
            .position(|note| &note.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryNoteService {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryNoteService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_notes(notes: Vec<Note>) -> Self {
        let service = Self::new();
        lock(&service.inner).notes = notes;
        service
    }

    /// Delay every call by `latency` before it settles.
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        lock(&self.inner).latency = latency;
        self
    }

    /// Make the next call of `operation` fail. Stacks when called repeatedly.
    pub fn fail_next(&self, operation: RemoteOperation) {
        *lock(&self.inner)
            .pending_failures
            .entry(operation)
            .or_insert(0) += 1;
    }

    /// Delay the next call of `operation` by `delay` instead of the default
    /// latency. Queued delays apply to calls in arrival order.
    pub fn delay_next(&self, operation: RemoteOperation, delay: Duration) {
        lock(&self.inner)
            .pending_delays
            .entry(operation)
            .or_default()
            .push_back(delay);
    }

    /// Current server-side notes.
    #[must_use]
    pub fn notes(&self) -> Vec<Note> {
        lock(&self.inner).notes.clone()
    }

    #[must_use]
    pub fn calls(&self) -> Vec<RemoteCall> {
        lock(&self.inner).calls.clone()
    }

    /// `(id, content)` of every update call received so far.
    #[must_use]
    pub fn update_calls(&self) -> Vec<(NoteId, String)> {
        lock(&self.inner)
            .calls
            .iter()
            .filter_map(|call| match call {
                RemoteCall::Update { id, content } => Some((id.clone(), content.clone())),
                _ => None,
            })
            .collect()
    }

    async fn settle<T, F>(&self, call: RemoteCall, apply: F) -> Result<T>
    where
        F: FnOnce(&mut MemoryState) -> Result<T> + Send,
    {
        let operation = call.operation();
        let latency = {
            let mut state = lock(&self.inner);
            state.calls.push(call);
            state.take_delay(operation)
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = lock(&self.inner);
        if state.take_failure(operation) {
            return Err(Error::Api(format!("injected {operation:?} failure (503)")));
        }
        apply(&mut state)
    }
}

impl NoteService for MemoryNoteService {
    async fn list(&self) -> Result<Vec<Note>> {
        self.settle(RemoteCall::List, |state| Ok(state.notes.clone()))
            .await
    }

    async fn create(&self) -> Result<Note> {
        self.settle(RemoteCall::Create, |state| {
            let note = Note::new(Uuid::now_v7().to_string(), "", unix_timestamp_millis());
            state.notes.push(note.clone());
            Ok(note)
        })
        .await
    }

    async fn update(&self, id: &NoteId, patch: &NotePatch) -> Result<Note> {
        let call = RemoteCall::Update {
            id: id.clone(),
            content: patch.content.clone(),
        };
        self.settle(call, |state| {
            let index = state.position(id)?;
            let note = &mut state.notes[index];
            note.content.clone_from(&patch.content);
            note.ts = unix_timestamp_millis().max(note.ts + 1);
            Ok(note.clone())
        })
        .await
    }

    async fn delete(&self, id: &NoteId) -> Result<()> {
        self.settle(RemoteCall::Delete { id: id.clone() }, |state| {
            let index = state.position(id)?;
            state.notes.remove(index);
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn create_assigns_unique_ids_and_empty_content() {
        let service = MemoryNoteService::new();
        let first = service.create().await.unwrap();
        let second = service.create().await.unwrap();

        assert_ne!(first.id, second.id);
        assert!(first.content.is_empty());
        assert_eq!(service.notes().len(), 2);
    }

    #[tokio::test]
    async fn update_bumps_timestamp() {
        let service = MemoryNoteService::with_notes(vec![Note::new("1", "a", 1000)]);
        let updated = service
            .update(&NoteId::from("1"), &NotePatch::content("abc"))
            .await
            .unwrap();

        assert_eq!(updated.content, "abc");
        assert!(updated.ts > 1000);
    }

    #[tokio::test]
    async fn injected_failure_is_consumed_once() {
        let service = MemoryNoteService::new();
        service.fail_next(RemoteOperation::Create);

        assert!(service.create().await.is_err());
        assert!(service.create().await.is_ok());
        assert_eq!(
            service.calls(),
            vec![RemoteCall::Create, RemoteCall::Create]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn queued_delays_reorder_settlement() {
        let service = MemoryNoteService::with_notes(vec![Note::new("1", "a", 1000)]);
        service.delay_next(RemoteOperation::Update, Duration::from_millis(300));
        service.delay_next(RemoteOperation::Update, Duration::from_millis(100));

        let id = NoteId::from("1");
        let slow_patch = NotePatch::content("slow");
        let fast_patch = NotePatch::content("fast");
        let (slow, fast) = tokio::join!(
            service.update(&id, &slow_patch),
            service.update(&id, &fast_patch),
        );

        assert!(slow.unwrap().ts >= fast.unwrap().ts);
        assert_eq!(service.notes()[0].content, "slow");
    }

    #[tokio::test]
    async fn delete_unknown_note_is_not_found() {
        let service = MemoryNoteService::new();
        let error = service.delete(&NoteId::from("missing")).await.unwrap_err();
        assert!(matches!(error, Error::NotFound(id) if id == "missing"));
    }
}
