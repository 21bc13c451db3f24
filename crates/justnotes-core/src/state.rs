//! Observable state shared with presentation.

use serde::Serialize;

use crate::models::{Note, NoteId};

/// Coarse-grained loading flags owned by the note store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct LoadingState {
    /// True only while the initial `list` call is in flight.
    pub is_loading: bool,
    pub is_creating: bool,
    pub is_deleting: bool,
}

/// The single active editing session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BoardState {
    pub selected_note_id: Option<NoteId>,
    /// Live draft for `selected_note_id`; ahead of the stored copy until autosave commits.
    pub content: String,
    /// Note awaiting delete confirmation. Independent of the selection.
    pub note_id_to_delete: Option<NoteId>,
}

impl BoardState {
    #[must_use]
    pub fn is_selected(&self, id: &NoteId) -> bool {
        self.selected_note_id.as_ref() == Some(id)
    }
}

/// Everything presentation needs to render the workspace.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WorkspaceSnapshot {
    pub notes: Vec<Note>,
    pub loading: LoadingState,
    pub board: BoardState,
}

impl WorkspaceSnapshot {
    #[must_use]
    pub fn has_notes(&self) -> bool {
        !self.notes.is_empty()
    }

    /// Currently selected note as last persisted, if any.
    #[must_use]
    pub fn selected_note(&self) -> Option<&Note> {
        let selected = self.board.selected_note_id.as_ref()?;
        self.notes.iter().find(|note| &note.id == selected)
    }
}

/// Top-level screens a flow may navigate to once it settles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    SignIn,
    SignUp,
    Notes,
}
