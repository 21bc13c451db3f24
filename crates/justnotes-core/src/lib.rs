//! justnotes-core - Core library for justnotes
//!
//! Keeps an in-memory note collection, the single editing draft and the
//! remote note service consistent under continuous typing. Front ends drive
//! it through [`SyncController`] and render [`WorkspaceSnapshot`]s.

pub mod auth;
pub mod autosave;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod models;
pub mod remote;
pub mod state;
pub mod stores;
pub mod util;

#[cfg(test)]
mod tests;

pub use auth::{AuthError, AuthPage, AuthService, Credentials, SignUpCredentials};
pub use autosave::{AutosaveScheduler, AutosaveState};
pub use config::ClientConfig;
pub use controller::{Intent, SyncController};
pub use error::{Error, Result};
pub use events::{DomainEvent, EventBus, EventObserver, TracingAnalytics};
pub use models::{Note, NoteId, NotePatch};
pub use remote::{HttpNoteService, MemoryNoteService, NoteService};
pub use state::{BoardState, LoadingState, Route, WorkspaceSnapshot};
