//! Remote note storage.
//!
//! The note service is an opaque CRUD backend. Every call is asynchronous
//! and fallible; callers treat each one as a suspension point.

use std::future::Future;

use crate::models::{Note, NoteId, NotePatch};
use crate::Result;

mod http;
mod memory;

pub use http::HttpNoteService;
pub use memory::{MemoryNoteService, RemoteCall, RemoteOperation};

/// CRUD contract consumed by the note store.
pub trait NoteService: Send + Sync + 'static {
    /// All notes of the signed-in user, in server order.
    fn list(&self) -> impl Future<Output = Result<Vec<Note>>> + Send;

    /// Create an empty note. The service assigns the id and timestamp.
    fn create(&self) -> impl Future<Output = Result<Note>> + Send;

    /// Apply `patch` and return the note with its new timestamp.
    fn update(&self, id: &NoteId, patch: &NotePatch) -> impl Future<Output = Result<Note>> + Send;

    fn delete(&self, id: &NoteId) -> impl Future<Output = Result<()>> + Send;
}
