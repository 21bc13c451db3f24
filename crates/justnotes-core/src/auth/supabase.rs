//! Password auth against a Supabase (GoTrue) project.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    unix_timestamp_now, AuthError, AuthResult, AuthService, AuthSession, AuthUser, Credentials,
    SessionPersistence, SignUpCredentials, SignUpOutcome,
};
use crate::util::{is_http_url, normalize_text_option, read_api_error};

const AUTH_PATH: &str = "/auth/v1";

#[derive(Clone)]
pub struct SupabaseAuthClient<S: SessionPersistence> {
    endpoint: String,
    anon_key: String,
    client: Client,
    store: S,
}

impl<S: SessionPersistence> SupabaseAuthClient<S> {
    pub fn new(url: &str, anon_key: &str, store: S) -> AuthResult<Self> {
        let anon_key = normalize_text_option(Some(anon_key.to_string())).ok_or(
            AuthError::InvalidConfiguration("Supabase anon key must not be empty"),
        )?;

        Ok(Self {
            endpoint: auth_endpoint(url)?,
            anon_key,
            client: Client::builder().build()?,
            store,
        })
    }

    /// The stored session, exchanged for a fresh one once it has expired.
    ///
    /// A refresh the service rejects signs the profile out locally.
    pub async fn current_session(&self) -> AuthResult<Option<AuthSession>> {
        let Some(stored) = self.store.load_session()? else {
            return Ok(None);
        };
        if !stored.is_expired() {
            return Ok(Some(stored));
        }

        let refreshed = self
            .grant("refresh_token", json!({ "refresh_token": stored.refresh_token }))
            .await
            .and_then(TokenResponse::into_session);
        match refreshed {
            Ok(Some(session)) => {
                self.store.save_session(&session)?;
                Ok(Some(session))
            }
            Ok(None) => {
                self.store.clear_session()?;
                Ok(None)
            }
            Err(error) => {
                tracing::warn!("Dropping expired session after failed refresh: {}", error);
                self.store.clear_session()?;
                Ok(None)
            }
        }
    }

    async fn grant(&self, grant_type: &str, body: Value) -> AuthResult<TokenResponse> {
        self.post(&format!("token?grant_type={grant_type}"), body)
            .await
    }

    async fn post(&self, path: &str, body: Value) -> AuthResult<TokenResponse> {
        let response = self
            .client
            .post(format!("{}/{path}", self.endpoint))
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(AuthError::Api(read_api_error(response).await))
        }
    }
}

impl<S: SessionPersistence> AuthService for SupabaseAuthClient<S> {
    async fn sign_in(&self, credentials: &Credentials) -> AuthResult<AuthSession> {
        credentials.validate()?;

        let session = self
            .grant("password", password_body(&credentials.email, &credentials.password))
            .await?
            .into_session()?
            .ok_or_else(|| AuthError::Api("Sign-in did not return a session".to_string()))?;
        self.store.save_session(&session)?;
        Ok(session)
    }

    async fn sign_up(&self, credentials: &SignUpCredentials) -> AuthResult<SignUpOutcome> {
        credentials.validate()?;

        let response = self
            .post(
                "signup",
                password_body(&credentials.email, &credentials.password),
            )
            .await?;
        match response.into_session()? {
            Some(session) => {
                self.store.save_session(&session)?;
                Ok(SignUpOutcome::SignedIn(session))
            }
            None => Ok(SignUpOutcome::ConfirmationRequired),
        }
    }

    async fn logout(&self) -> AuthResult<()> {
        let stored = self.store.load_session();
        // The local session is gone even when the service cannot be reached.
        self.store.clear_session()?;
        let Some(session) = stored? else {
            return Ok(());
        };

        let response = self
            .client
            .post(format!("{}/logout", self.endpoint))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;
        match response.status() {
            status if status.is_success() || status == StatusCode::UNAUTHORIZED => Ok(()),
            _ => Err(AuthError::Api(read_api_error(response).await)),
        }
    }
}

fn password_body(email: &str, password: &str) -> Value {
    json!({ "email": email.trim(), "password": password })
}

/// Base URL of the auth API for a project URL, with or without `/auth/v1`.
fn auth_endpoint(url: &str) -> AuthResult<String> {
    let url = normalize_text_option(Some(url.to_string()))
        .ok_or(AuthError::InvalidConfiguration("Supabase URL must not be empty"))?;
    if !is_http_url(&url) {
        return Err(AuthError::InvalidConfiguration(
            "Supabase URL must include http:// or https://",
        ));
    }

    let base = url.trim_end_matches('/');
    if base.ends_with(AUTH_PATH) {
        Ok(base.to_string())
    } else {
        Ok(format!("{base}{AUTH_PATH}"))
    }
}

/// Body of `/token` and `/signup` answers.
#[derive(Debug, Default, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<TokenUser>,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: String,
    email: Option<String>,
}

impl TokenResponse {
    /// `None` when the account exists but the session waits for email
    /// confirmation.
    fn into_session(self) -> AuthResult<Option<AuthSession>> {
        let Some(access_token) = self.access_token else {
            return Ok(None);
        };
        let expires_at = self
            .expires_at
            .or_else(|| {
                self.expires_in
                    .map(|seconds| unix_timestamp_now().saturating_add(seconds))
            });

        match (self.refresh_token, expires_at, self.user) {
            (Some(refresh_token), Some(expires_at), Some(user)) => Ok(Some(AuthSession {
                access_token,
                refresh_token,
                expires_at,
                user: AuthUser {
                    id: user.id,
                    email: user.email,
                },
            })),
            _ => Err(AuthError::Api(
                "Auth response is missing session fields".to_string(),
            )),
        }
    }
}
