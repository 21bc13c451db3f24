//! Per-profile auth with keychain-backed session persistence.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(not(test))]
use keyring::Entry;

use justnotes_core::auth::{
    AuthResult, AuthSession, Credentials, SessionPersistence, SignUpCredentials, SignUpOutcome,
    SupabaseAuthClient,
};
use justnotes_core::{AuthError, AuthService, ClientConfig};

use crate::error::CliError;

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "justnotes-cli";

#[derive(Clone)]
pub struct SessionStore {
    username: String,
}

impl SessionStore {
    pub fn new(profile_name: &str) -> Self {
        Self {
            username: format!("supabase_session:{profile_name}"),
        }
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(&self) -> AuthResult<Entry> {
        Entry::new(KEYRING_SERVICE_NAME, &self.username)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }
}

impl SessionPersistence for SessionStore {
    #[cfg(not(test))]
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        let entry = self.entry()?;
        match entry.get_password() {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        let guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        match guard.get(&self.username) {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    #[cfg(not(test))]
    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        let raw = serde_json::to_string(session)?;
        self.entry()?
            .set_password(&raw)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }

    #[cfg(test)]
    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        let raw = serde_json::to_string(session)?;
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard.insert(self.username.clone(), raw);
        Ok(())
    }

    #[cfg(not(test))]
    fn clear_session(&self) -> AuthResult<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn clear_session(&self) -> AuthResult<()> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard.remove(&self.username);
        Ok(())
    }
}

/// Auth for one CLI profile. Without Supabase settings every sign-in fails
/// with `NotConfigured` and logout only clears the stored session.
#[derive(Clone)]
pub struct ProfileAuth {
    store: Option<SessionStore>,
    client: Option<SupabaseAuthClient<SessionStore>>,
}

impl ProfileAuth {
    pub fn for_profile(profile_name: &str, config: &ClientConfig) -> Result<Self, CliError> {
        let store = SessionStore::new(profile_name);
        let client = match config.auth_settings()? {
            Some((url, anon_key)) => Some(SupabaseAuthClient::new(&url, &anon_key, store.clone())?),
            None => None,
        };
        Ok(Self {
            store: Some(store),
            client,
        })
    }

    /// Auth for the demo workspace: no backend and no stored session, so
    /// signing out of the demo never touches a real profile.
    pub const fn demo() -> Self {
        Self {
            store: None,
            client: None,
        }
    }

    pub const fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Stored session, refreshed when expired and a client is configured.
    pub async fn current_session(&self) -> AuthResult<Option<AuthSession>> {
        match (&self.client, &self.store) {
            (Some(client), _) => client.current_session().await,
            (None, Some(store)) => store.load_session(),
            (None, None) => Ok(None),
        }
    }

    fn client(&self) -> AuthResult<&SupabaseAuthClient<SessionStore>> {
        self.client.as_ref().ok_or(AuthError::NotConfigured)
    }
}

impl AuthService for ProfileAuth {
    async fn sign_in(&self, credentials: &Credentials) -> AuthResult<AuthSession> {
        self.client()?.sign_in(credentials).await
    }

    async fn sign_up(&self, credentials: &SignUpCredentials) -> AuthResult<SignUpOutcome> {
        self.client()?.sign_up(credentials).await
    }

    async fn logout(&self) -> AuthResult<()> {
        match (&self.client, &self.store) {
            (Some(client), _) => client.logout().await,
            (None, Some(store)) => store.clear_session(),
            (None, None) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use justnotes_core::auth::AuthUser;

    use super::*;

    fn session() -> AuthSession {
        AuthSession {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: i64::MAX,
            user: AuthUser {
                id: "user".to_string(),
                email: Some("user@example.com".to_string()),
            },
        }
    }

    #[test]
    fn session_store_is_scoped_by_profile() {
        let work = SessionStore::new("auth-test-work");
        let home = SessionStore::new("auth-test-home");

        work.save_session(&session()).unwrap();
        assert_eq!(work.load_session().unwrap(), Some(session()));
        assert_eq!(home.load_session().unwrap(), None);

        work.clear_session().unwrap();
        assert_eq!(work.load_session().unwrap(), None);
    }

    #[tokio::test]
    async fn unconfigured_profile_rejects_sign_in_and_clears_on_logout() {
        let auth = ProfileAuth::for_profile("auth-test-unconfigured", &ClientConfig::default())
            .unwrap();
        assert!(!auth.is_configured());

        let error = auth
            .sign_in(&Credentials::new("user@example.com", "secret"))
            .await
            .unwrap_err();
        assert!(matches!(error, AuthError::NotConfigured));

        SessionStore::new("auth-test-unconfigured")
            .save_session(&session())
            .unwrap();
        assert!(auth.current_session().await.unwrap().is_some());
        auth.logout().await.unwrap();
        assert!(auth.current_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn demo_auth_has_no_session_to_clear() {
        let real = SessionStore::new("auth-test-demo-neighbour");
        real.save_session(&session()).unwrap();

        let auth = ProfileAuth::demo();
        assert!(auth.current_session().await.unwrap().is_none());
        auth.logout().await.unwrap();

        assert_eq!(real.load_session().unwrap(), Some(session()));
    }

    #[test]
    fn partial_supabase_config_is_an_error() {
        let config = ClientConfig {
            supabase_url: Some("https://demo.supabase.co".to_string()),
            ..ClientConfig::default()
        };
        assert!(ProfileAuth::for_profile("auth-test-partial", &config).is_err());
    }
}
