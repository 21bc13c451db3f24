//! State containers. Each store owns one piece of state exclusively.

mod board_store;
mod note_store;

pub use board_store::BoardStore;
pub use note_store::NoteStore;
