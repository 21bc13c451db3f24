//! Single-note editing session.
//!
//! Every operation is synchronous and never touches the note service, so
//! selection and drafts always reflect the latest user input.

use std::sync::Mutex;

use crate::models::{Note, NoteId};
use crate::state::BoardState;
use crate::util::lock;

#[derive(Debug, Default)]
pub struct BoardStore {
    state: Mutex<BoardState>,
}

impl BoardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> BoardState {
        lock(&self.state).clone()
    }

    pub fn selected_note_id(&self) -> Option<NoteId> {
        lock(&self.state).selected_note_id.clone()
    }

    pub fn content(&self) -> String {
        lock(&self.state).content.clone()
    }

    pub fn note_id_to_delete(&self) -> Option<NoteId> {
        lock(&self.state).note_id_to_delete.clone()
    }

    /// Start editing `note`, seeding the draft from its stored content.
    ///
    /// Any unsaved draft of the previous selection is replaced.
    pub fn select_note(&self, note: &Note) {
        let mut state = lock(&self.state);
        state.selected_note_id = Some(note.id.clone());
        state.content.clone_from(&note.content);
    }

    pub fn update_content(&self, text: impl Into<String>) {
        lock(&self.state).content = text.into();
    }

    /// Replace the draft and return the note it belongs to, atomically.
    ///
    /// Without a selection there is no draft and nothing changes.
    pub(crate) fn update_selected_content(&self, text: impl Into<String>) -> Option<NoteId> {
        let mut state = lock(&self.state);
        let id = state.selected_note_id.clone()?;
        state.content = text.into();
        Some(id)
    }

    pub fn select_note_to_delete(&self, note: &Note) {
        self.select_id_to_delete(note.id.clone());
    }

    pub(crate) fn select_id_to_delete(&self, id: NoteId) {
        lock(&self.state).note_id_to_delete = Some(id);
    }

    pub fn clear_delete(&self) {
        lock(&self.state).note_id_to_delete = None;
    }

    /// Return to the empty workspace.
    pub fn clear_select(&self) {
        let mut state = lock(&self.state);
        state.selected_note_id = None;
        state.content.clear();
    }
}
