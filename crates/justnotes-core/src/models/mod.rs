//! Data models for justnotes

mod note;

pub use note::{Note, NoteId, NotePatch};
