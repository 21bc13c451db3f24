//! Authentication collaborator.
//!
//! The notes workspace only needs `sign_in`, `sign_up` and `logout`, each
//! succeeding or failing with a human-readable message. `SupabaseAuthClient`
//! is the shipped implementation; page-level flows live in [`page`].

use std::fmt;
use std::future::Future;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod page;
mod supabase;

pub use page::{AuthFormState, AuthPage};
pub use supabase::SupabaseAuthClient;

const EXPIRY_SKEW_SECONDS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= unix_timestamp_now() + EXPIRY_SKEW_SECONDS
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Sign-in form values.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> AuthResult<()> {
        if self.email.trim().is_empty() {
            return Err(AuthError::Validation("Email is required".to_string()));
        }
        if self.password.trim().is_empty() {
            return Err(AuthError::Validation("Password is required".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Sign-up form values.
#[derive(Clone, PartialEq, Eq)]
pub struct SignUpCredentials {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignUpCredentials {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            confirm_password: confirm_password.into(),
        }
    }

    pub fn validate(&self) -> AuthResult<()> {
        self.credentials().validate()?;
        if self.password != self.confirm_password {
            return Err(AuthError::Validation("Passwords do not match".to_string()));
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.email.clone(), self.password.clone())
    }
}

impl fmt::Debug for SignUpCredentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SignUpCredentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("confirm_password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn(AuthSession),
    ConfirmationRequired,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Supabase auth is not configured for this build.")]
    NotConfigured,
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Auth API error: {0}")]
    Api(String),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

pub trait SessionPersistence: Clone + Send + Sync + 'static {
    fn load_session(&self) -> AuthResult<Option<AuthSession>>;
    fn save_session(&self, session: &AuthSession) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

/// Operations the workspace and the sign-in/sign-up pages rely on.
pub trait AuthService: Send + Sync + 'static {
    fn sign_in(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = AuthResult<AuthSession>> + Send;

    fn sign_up(
        &self,
        credentials: &SignUpCredentials,
    ) -> impl Future<Output = AuthResult<SignUpOutcome>> + Send;

    /// End the current session. Succeeds when no session exists.
    fn logout(&self) -> impl Future<Output = AuthResult<()>> + Send;
}

pub(crate) fn unix_timestamp_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| {
            i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_require_email_and_password() {
        let error = Credentials::new(" ", "secret").validate().unwrap_err();
        assert_eq!(error.to_string(), "Email is required");

        let error = Credentials::new("a@b.c", "").validate().unwrap_err();
        assert_eq!(error.to_string(), "Password is required");

        assert!(Credentials::new("a@b.c", "secret").validate().is_ok());
    }

    #[test]
    fn sign_up_rejects_mismatched_confirmation() {
        let error = SignUpCredentials::new("a@b.c", "secret", "secreT")
            .validate()
            .unwrap_err();
        assert_eq!(error.to_string(), "Passwords do not match");
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let rendered = format!(
            "{:?}",
            SignUpCredentials::new("a@b.c", "hunter2", "hunter2")
        );
        assert!(rendered.contains("a@b.c"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn session_debug_redacts_tokens() {
        let session = AuthSession {
            access_token: "secret-access-token".to_string(),
            refresh_token: "secret-refresh-token".to_string(),
            expires_at: 1_700_000_000,
            user: AuthUser {
                id: "user".to_string(),
                email: None,
            },
        };
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret-access-token"));
        assert!(!rendered.contains("secret-refresh-token"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn session_expiry_uses_skew() {
        let mut session = AuthSession {
            access_token: String::new(),
            refresh_token: String::new(),
            expires_at: unix_timestamp_now() + 30,
            user: AuthUser {
                id: "user".to_string(),
                email: None,
            },
        };
        assert!(session.is_expired());
        session.expires_at = unix_timestamp_now() + 3600;
        assert!(!session.is_expired());
    }
}
