//! Post-commit domain events.
//!
//! The controller publishes an event only after the mutation it describes
//! has settled successfully. Observers such as analytics subscribe here so
//! the core never talks to telemetry directly.

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::models::NoteId;

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    NoteCreated { id: NoteId },
    NoteUpdated { id: NoteId },
    NoteDeleted { id: NoteId },
    UserSignedIn,
    UserSignedUp,
    UserLoggedOut,
}

impl DomainEvent {
    /// Analytics `(category, action)` pair for this event.
    pub const fn analytics_label(&self) -> (&'static str, &'static str) {
        match self {
            Self::NoteCreated { .. } => ("Note", "Create"),
            Self::NoteUpdated { .. } => ("Note", "Update"),
            Self::NoteDeleted { .. } => ("Note", "Delete"),
            Self::UserSignedIn => ("User", "Sign In"),
            Self::UserSignedUp => ("User", "Sign Up"),
            Self::UserLoggedOut => ("User", "Logout"),
        }
    }
}

/// Fan-out channel for domain events. Cloning shares the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publish `event`. Having no subscriber is not an error.
    pub fn emit(&self, event: DomainEvent) {
        tracing::debug!("Domain event: {:?}", event);
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

/// Receives domain events after they are committed.
pub trait EventObserver: Send + 'static {
    fn on_event(&mut self, event: &DomainEvent);
}

/// Forwards events to `tracing` under the `analytics` target.
#[derive(Debug, Default)]
pub struct TracingAnalytics;

impl EventObserver for TracingAnalytics {
    fn on_event(&mut self, event: &DomainEvent) {
        let (category, action) = event.analytics_label();
        tracing::info!(target: "analytics", category, action, "analytics event");
    }
}

/// Drive `observer` from `bus` on a background task until the bus closes.
pub fn spawn_observer<O: EventObserver>(bus: &EventBus, mut observer: O) -> JoinHandle<()> {
    let mut events = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => observer.on_event(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Event observer lagged; skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<(&'static str, &'static str)>>>);

    impl EventObserver for Recorder {
        fn on_event(&mut self, event: &DomainEvent) {
            self.0.lock().unwrap().push(event.analytics_label());
        }
    }

    #[test]
    fn emit_without_subscribers_is_silent() {
        EventBus::new().emit(DomainEvent::UserLoggedOut);
    }

    #[test]
    fn events_serialize_with_tag() {
        let json = serde_json::to_value(DomainEvent::NoteDeleted {
            id: NoteId::from("1"),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"event": "note_deleted", "id": "1"}));
    }

    #[tokio::test]
    async fn observer_receives_events_in_order() {
        let bus = EventBus::new();
        let recorder = Recorder::default();
        let handle = spawn_observer(&bus, recorder.clone());

        bus.emit(DomainEvent::NoteCreated {
            id: NoteId::from("1"),
        });
        bus.emit(DomainEvent::UserLoggedOut);
        drop(bus);
        handle.await.unwrap();

        assert_eq!(
            recorder.0.lock().unwrap().clone(),
            vec![("Note", "Create"), ("User", "Logout")]
        );
    }
}
