//! Workspace scenarios driven through the synchronization controller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::broadcast::Receiver;
use tokio::time::sleep;

use crate::auth::{
    AuthError, AuthResult, AuthService, AuthSession, Credentials, SignUpCredentials,
    SignUpOutcome,
};
use crate::remote::{MemoryNoteService, RemoteCall, RemoteOperation};
use crate::{DomainEvent, Intent, LoadingState, Note, NoteId, Route, SyncController};

#[derive(Clone, Default)]
struct StubAuth {
    fail_logout: Arc<AtomicBool>,
}

impl AuthService for StubAuth {
    async fn sign_in(&self, _credentials: &Credentials) -> AuthResult<AuthSession> {
        Err(AuthError::NotConfigured)
    }

    async fn sign_up(&self, _credentials: &SignUpCredentials) -> AuthResult<SignUpOutcome> {
        Err(AuthError::NotConfigured)
    }

    async fn logout(&self) -> AuthResult<()> {
        if self.fail_logout.load(Ordering::SeqCst) {
            return Err(AuthError::Api("network down".to_string()));
        }
        Ok(())
    }
}

type Controller = SyncController<MemoryNoteService, StubAuth>;

async fn workspace(notes: Vec<Note>) -> (MemoryNoteService, Controller) {
    let service = MemoryNoteService::with_notes(notes);
    let controller = SyncController::new(service.clone(), StubAuth::default());
    assert!(controller.enter_workspace().await);
    (service, controller)
}

fn two_notes() -> Vec<Note> {
    vec![Note::new("1", "a", 1000), Note::new("2", "b", 2000)]
}

fn drain(events: &mut Receiver<DomainEvent>) -> Vec<DomainEvent> {
    let mut received = Vec::new();
    loop {
        match events.try_recv() {
            Ok(event) => received.push(event),
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            Err(TryRecvError::Lagged(_)) => {}
        }
    }
    received
}

fn id(value: &str) -> NoteId {
    NoteId::from(value)
}

#[tokio::test(start_paused = true)]
async fn typing_within_quiet_period_sends_one_update_with_last_content() {
    let (service, controller) = workspace(vec![Note::new("1", "a", 1000)]).await;
    let mut events = controller.subscribe_events();

    assert!(controller.select_by_id(&id("1")));
    assert!(controller.edit("ab"));
    sleep(Duration::from_millis(400)).await;
    assert!(controller.edit("abc"));
    controller.wait_for_autosave().await;

    assert_eq!(service.update_calls(), vec![(id("1"), "abc".to_string())]);
    assert_eq!(controller.notes().find(&id("1")).unwrap().content, "abc");
    assert_eq!(drain(&mut events), vec![DomainEvent::NoteUpdated { id: id("1") }]);
}

#[tokio::test(start_paused = true)]
async fn no_update_is_sent_before_the_quiet_period_ends() {
    let (service, controller) = workspace(two_notes()).await;

    controller.select_by_id(&id("1"));
    controller.edit("draft");
    sleep(Duration::from_millis(999)).await;
    assert!(service.update_calls().is_empty());

    controller.wait_for_autosave().await;
    assert_eq!(service.update_calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn switching_selection_still_saves_previous_note_with_captured_content() {
    let (service, controller) = workspace(two_notes()).await;

    controller.select_by_id(&id("1"));
    controller.edit("first draft");
    sleep(Duration::from_millis(300)).await;

    controller.select_by_id(&id("2"));
    assert_eq!(controller.board().content(), "b");
    controller.edit("second draft");
    controller.wait_for_autosave().await;

    assert_eq!(
        service.update_calls(),
        vec![
            (id("1"), "first draft".to_string()),
            (id("2"), "second draft".to_string()),
        ]
    );
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.board.selected_note_id, Some(id("2")));
    assert_eq!(snapshot.board.content, "second draft");
    assert_eq!(snapshot.notes[0].content, "first draft");
}

#[tokio::test(start_paused = true)]
async fn failed_autosave_keeps_draft_and_next_edit_retries() {
    let (service, controller) = workspace(two_notes()).await;
    let mut events = controller.subscribe_events();

    controller.select_by_id(&id("1"));
    service.fail_next(RemoteOperation::Update);
    controller.edit("lost");
    controller.wait_for_autosave().await;

    assert_eq!(controller.board().content(), "lost");
    assert_eq!(controller.notes().find(&id("1")).unwrap().content, "a");
    assert!(controller.notes().last_error().is_some());
    assert!(drain(&mut events).is_empty());

    controller.edit("kept");
    controller.wait_for_autosave().await;
    assert_eq!(controller.notes().find(&id("1")).unwrap().content, "kept");
    assert_eq!(service.update_calls().len(), 2);
}

#[tokio::test]
async fn edit_without_selection_is_ignored() {
    let (service, controller) = workspace(two_notes()).await;

    assert!(!controller.edit("nowhere"));
    assert_eq!(controller.autosave().pending_count(), 0);
    assert_eq!(controller.board().content(), "");
    assert!(service.update_calls().is_empty());
}

#[tokio::test]
async fn created_note_is_selected_with_empty_draft() {
    let (_, controller) = workspace(two_notes()).await;
    let mut events = controller.subscribe_events();
    let focus = controller.focus_requests();

    let created = controller.create().await.unwrap();

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.board.selected_note_id, Some(created.id.clone()));
    assert_eq!(snapshot.board.content, "");
    assert_eq!(snapshot.notes.len(), 3);
    assert!(!snapshot.loading.is_creating);
    assert_eq!(*focus.borrow(), Some(created.id.clone()));
    assert_eq!(drain(&mut events), vec![DomainEvent::NoteCreated { id: created.id }]);
}

#[tokio::test]
async fn failed_create_changes_nothing_but_the_flag() {
    let (service, controller) = workspace(two_notes()).await;
    controller.select_by_id(&id("1"));
    let before = controller.snapshot();

    service.fail_next(RemoteOperation::Create);
    assert!(controller.create().await.is_none());

    let after = controller.snapshot();
    assert!(!after.loading.is_creating);
    assert_eq!(after.notes, before.notes);
    assert_eq!(after.board.selected_note_id, Some(id("1")));
}

#[tokio::test]
async fn deleting_selected_note_clears_selection_and_confirmation() {
    let (_, controller) = workspace(vec![Note::new("1", "a", 1000)]).await;
    let mut events = controller.subscribe_events();

    controller.select_by_id(&id("1"));
    assert!(controller.request_delete_by_id(&id("1")));
    assert_eq!(controller.board().note_id_to_delete(), Some(id("1")));
    assert!(controller.confirm_delete().await);

    let snapshot = controller.snapshot();
    assert!(snapshot.notes.is_empty());
    assert_eq!(snapshot.board.selected_note_id, None);
    assert_eq!(snapshot.board.note_id_to_delete, None);
    assert_eq!(snapshot.board.content, "");
    assert!(!snapshot.loading.is_deleting);
    assert_eq!(*controller.focus_requests().borrow(), None);
    assert_eq!(drain(&mut events), vec![DomainEvent::NoteDeleted { id: id("1") }]);
}

#[tokio::test]
async fn deleting_other_note_keeps_selection_and_draft() {
    let (_, controller) = workspace(two_notes()).await;

    controller.select_by_id(&id("1"));
    controller.edit("typing");
    controller.request_delete_by_id(&id("2"));
    assert!(controller.confirm_delete().await);

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.notes, vec![Note::new("1", "a", 1000)]);
    assert_eq!(snapshot.board.selected_note_id, Some(id("1")));
    assert_eq!(snapshot.board.content, "typing");
}

#[tokio::test]
async fn failed_delete_closes_confirmation_and_keeps_note() {
    let (service, controller) = workspace(two_notes()).await;
    let mut events = controller.subscribe_events();

    controller.select_by_id(&id("1"));
    controller.request_delete_by_id(&id("1"));
    service.fail_next(RemoteOperation::Delete);
    assert!(!controller.confirm_delete().await);

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.notes.len(), 2);
    assert_eq!(snapshot.board.note_id_to_delete, None);
    assert_eq!(snapshot.board.selected_note_id, Some(id("1")));
    assert!(!snapshot.loading.is_deleting);
    assert!(drain(&mut events).is_empty());
}

#[tokio::test(start_paused = true)]
async fn deleting_note_drops_its_pending_autosave() {
    let (service, controller) = workspace(two_notes()).await;

    controller.select_by_id(&id("1"));
    controller.edit("doomed");
    controller.request_delete_by_id(&id("1"));
    assert!(controller.confirm_delete().await);
    controller.wait_for_autosave().await;

    assert!(service.update_calls().is_empty());
    assert_eq!(
        service.calls(),
        vec![RemoteCall::List, RemoteCall::Delete { id: id("1") }]
    );
}

#[tokio::test]
async fn cancel_delete_is_idempotent() {
    let (service, controller) = workspace(two_notes()).await;
    controller.select_by_id(&id("2"));
    let before = controller.snapshot();

    controller.cancel_delete();
    assert_eq!(controller.snapshot(), before);

    controller.request_delete_by_id(&id("1"));
    controller.cancel_delete();
    controller.cancel_delete();
    assert_eq!(controller.snapshot(), before);
    assert!(!controller.confirm_delete().await);
    assert_eq!(service.calls(), vec![RemoteCall::List]);
}

#[tokio::test]
async fn unknown_ids_are_ignored() {
    let (_, controller) = workspace(two_notes()).await;

    assert!(!controller.select_by_id(&id("missing")));
    assert!(!controller.request_delete_by_id(&id("missing")));
    assert_eq!(controller.snapshot().board, crate::BoardState::default());
}

#[tokio::test]
async fn failed_fetch_shows_empty_workspace() {
    let service = MemoryNoteService::with_notes(two_notes());
    service.fail_next(RemoteOperation::List);
    let controller = SyncController::new(service, StubAuth::default());

    assert!(!controller.enter_workspace().await);
    let snapshot = controller.snapshot();
    assert!(!snapshot.has_notes());
    assert!(!snapshot.loading.is_loading);
}

#[tokio::test(start_paused = true)]
async fn editing_intents_are_ignored_while_loading() {
    let service =
        MemoryNoteService::with_notes(two_notes()).with_latency(Duration::from_millis(100));
    let controller = SyncController::new(service.clone(), StubAuth::default());

    let (loaded, created) = tokio::join!(controller.enter_workspace(), async {
        assert!(controller.snapshot().loading.is_loading);
        controller.create().await
    });

    assert!(loaded);
    assert!(created.is_none());
    assert_eq!(service.calls(), vec![RemoteCall::List]);
    assert!(controller.select_by_id(&id("1")));
}

#[tokio::test]
async fn dispatch_routes_intents() {
    let (service, controller) = workspace(two_notes()).await;

    assert!(controller.dispatch(Intent::Select(id("2"))).await);
    assert!(controller.dispatch(Intent::DeleteRequested(id("2"))).await);
    assert!(controller.dispatch(Intent::DeleteCancelled).await);
    assert_eq!(controller.board().note_id_to_delete(), None);

    assert!(controller.dispatch(Intent::DeleteRequested(id("2"))).await);
    assert!(controller.dispatch(Intent::DeleteConfirmed).await);
    assert_eq!(service.notes(), vec![Note::new("1", "a", 1000)]);
    assert_eq!(controller.board().selected_note_id(), None);

    assert!(controller.dispatch(Intent::CreateRequested).await);
    assert!(controller.dispatch(Intent::Edit("hello".to_string())).await);
    assert_eq!(controller.board().content(), "hello");
}

#[tokio::test]
async fn logout_routes_to_sign_in_after_success() {
    let (_, controller) = workspace(two_notes()).await;
    let mut events = controller.subscribe_events();

    assert_eq!(controller.logout().await, Route::SignIn);
    assert_eq!(drain(&mut events), vec![DomainEvent::UserLoggedOut]);
}

#[tokio::test]
async fn logout_leaves_workspace_when_auth_service_fails() {
    let (_, controller) = workspace(two_notes()).await;
    let mut events = controller.subscribe_events();
    controller.auth().fail_logout.store(true, Ordering::SeqCst);

    assert_eq!(controller.logout().await, Route::SignIn);
    assert_eq!(drain(&mut events), vec![DomainEvent::UserLoggedOut]);
}

#[tokio::test(start_paused = true)]
async fn racing_updates_for_one_note_keep_the_last_settled() {
    let (service, controller) = workspace(vec![Note::new("1", "a", 1000)]).await;
    service.delay_next(RemoteOperation::Update, Duration::from_millis(3000));
    service.delay_next(RemoteOperation::Update, Duration::ZERO);

    assert!(controller.select_by_id(&id("1")));
    assert!(controller.edit("first"));
    // The first save is now in flight and settles at 4000 ms.
    sleep(Duration::from_millis(1100)).await;
    assert!(controller.edit("second"));
    controller.wait_for_autosave().await;

    assert_eq!(
        service.update_calls(),
        vec![
            (id("1"), "first".to_string()),
            (id("1"), "second".to_string())
        ]
    );
    assert_eq!(controller.notes().find(&id("1")).unwrap().content, "first");
    assert_eq!(service.notes()[0].content, "first");
    assert_eq!(controller.board().content(), "second");
    assert_eq!(controller.board().selected_note_id(), Some(id("1")));
}

#[tokio::test(start_paused = true)]
async fn create_and_delete_of_different_notes_settle_in_either_order() {
    for (create_delay, delete_delay) in [(300, 100), (100, 300)] {
        let (service, controller) = workspace(two_notes()).await;
        service.delay_next(RemoteOperation::Create, Duration::from_millis(create_delay));
        service.delay_next(RemoteOperation::Delete, Duration::from_millis(delete_delay));
        assert!(controller.request_delete_by_id(&id("2")));

        let (created, deleted) = tokio::join!(controller.create(), controller.confirm_delete());
        let created = created.unwrap();

        assert!(deleted);
        assert_eq!(
            controller.notes().notes(),
            vec![Note::new("1", "a", 1000), created.clone()]
        );
        assert_eq!(service.notes(), controller.notes().notes());
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.board.selected_note_id, Some(created.id));
        assert_eq!(snapshot.board.note_id_to_delete, None);
        assert_eq!(snapshot.loading, LoadingState::default());
    }
}
