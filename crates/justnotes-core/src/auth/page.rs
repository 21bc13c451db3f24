//! Sign-in and sign-up form flows.

use std::sync::Mutex;

use serde::Serialize;

use super::{AuthService, Credentials, SignUpCredentials, SignUpOutcome};
use crate::events::{DomainEvent, EventBus};
use crate::state::Route;
use crate::util::lock;

pub const CONFIRMATION_NOTICE: &str = "Check your email to confirm your account, then sign in.";

/// What the form renders besides its inputs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AuthFormState {
    pub is_loading: bool,
    pub error: Option<String>,
    pub notice: Option<String>,
}

/// Submission state of an auth form. The inputs stay editable on failure.
#[derive(Debug, Default)]
pub struct AuthPage {
    state: Mutex<AuthFormState>,
    events: EventBus,
}

impl AuthPage {
    pub fn new(events: EventBus) -> Self {
        Self {
            state: Mutex::new(AuthFormState::default()),
            events,
        }
    }

    pub fn state(&self) -> AuthFormState {
        lock(&self.state).clone()
    }

    /// Submit the sign-in form. Returns where to navigate on success.
    pub async fn sign_in<A: AuthService>(
        &self,
        auth: &A,
        credentials: &Credentials,
    ) -> Option<Route> {
        if !self.begin() {
            return None;
        }

        match auth.sign_in(credentials).await {
            Ok(session) => {
                tracing::info!("Signed in as {}", session.user.id);
                self.finish(None, None);
                self.events.emit(DomainEvent::UserSignedIn);
                Some(Route::Notes)
            }
            Err(error) => {
                tracing::warn!("Sign-in failed: {}", error);
                self.finish(Some(error.to_string()), None);
                None
            }
        }
    }

    /// Submit the sign-up form.
    ///
    /// When the backend requires email confirmation the user is sent back to
    /// the sign-in form with a notice instead of entering the workspace.
    pub async fn sign_up<A: AuthService>(
        &self,
        auth: &A,
        credentials: &SignUpCredentials,
    ) -> Option<Route> {
        if !self.begin() {
            return None;
        }

        match auth.sign_up(credentials).await {
            Ok(SignUpOutcome::SignedIn(session)) => {
                tracing::info!("Signed up as {}", session.user.id);
                self.finish(None, None);
                self.events.emit(DomainEvent::UserSignedUp);
                Some(Route::Notes)
            }
            Ok(SignUpOutcome::ConfirmationRequired) => {
                tracing::info!("Sign-up awaiting email confirmation");
                self.finish(None, Some(CONFIRMATION_NOTICE.to_string()));
                self.events.emit(DomainEvent::UserSignedUp);
                Some(Route::SignIn)
            }
            Err(error) => {
                tracing::warn!("Sign-up failed: {}", error);
                self.finish(Some(error.to_string()), None);
                None
            }
        }
    }

    fn begin(&self) -> bool {
        let mut state = lock(&self.state);
        if state.is_loading {
            return false;
        }
        state.is_loading = true;
        state.error = None;
        state.notice = None;
        true
    }

    fn finish(&self, error: Option<String>, notice: Option<String>) {
        let mut state = lock(&self.state);
        state.is_loading = false;
        state.error = error;
        state.notice = notice;
    }
}
