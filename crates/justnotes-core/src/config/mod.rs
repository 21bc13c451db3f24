//! Client configuration shared by every front end.
//!
//! Values come from a JSON file, the environment, or both; environment
//! values win when `merge`d on top of file values.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::autosave::DEFAULT_QUIET_PERIOD;
use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

pub const ENV_API_URL: &str = "JUSTNOTES_API_URL";
pub const ENV_SUPABASE_URL: &str = "SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "SUPABASE_ANON_KEY";
pub const ENV_AUTOSAVE_MS: &str = "JUSTNOTES_AUTOSAVE_MS";

/// Public endpoints and tuning for a client. Never holds secrets.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_anon_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autosave_quiet_period_ms: Option<u64>,
}

impl ClientConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let autosave_quiet_period_ms = match normalize_text_option(lookup(ENV_AUTOSAVE_MS)) {
            Some(raw) => Some(raw.parse::<u64>().map_err(|_| {
                Error::Config(format!("{ENV_AUTOSAVE_MS} must be a whole number of milliseconds"))
            })?),
            None => None,
        };

        Ok(Self {
            api_base_url: normalize_text_option(lookup(ENV_API_URL)),
            supabase_url: normalize_text_option(lookup(ENV_SUPABASE_URL)),
            supabase_anon_key: normalize_text_option(lookup(ENV_SUPABASE_ANON_KEY)),
            autosave_quiet_period_ms,
        })
    }

    /// Overlay every value set in `other` on top of `self`.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            api_base_url: normalize_text_option(other.api_base_url)
                .or_else(|| normalize_text_option(self.api_base_url)),
            supabase_url: normalize_text_option(other.supabase_url)
                .or_else(|| normalize_text_option(self.supabase_url)),
            supabase_anon_key: normalize_text_option(other.supabase_anon_key)
                .or_else(|| normalize_text_option(self.supabase_anon_key)),
            autosave_quiet_period_ms: other
                .autosave_quiet_period_ms
                .or(self.autosave_quiet_period_ms),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("api_base_url", &self.api_base_url),
            ("supabase_url", &self.supabase_url),
        ] {
            if let Some(url) = normalize_text_option(value.clone()) {
                if !is_http_url(&url) {
                    return Err(Error::Config(format!(
                        "{field} must include http:// or https://"
                    )));
                }
            }
        }
        if self.autosave_quiet_period_ms == Some(0) {
            return Err(Error::Config(
                "autosave_quiet_period_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Configured note API base URL, failing when none is set.
    pub fn require_api_base_url(&self) -> Result<String> {
        normalize_text_option(self.api_base_url.clone()).ok_or_else(|| {
            Error::Config(format!(
                "No note API URL configured. Set {ENV_API_URL} or run `justnotes config init`."
            ))
        })
    }

    /// Supabase URL and anon key, when auth is configured.
    ///
    /// The two values only make sense together; setting just one is an error.
    pub fn auth_settings(&self) -> Result<Option<(String, String)>> {
        match (
            normalize_text_option(self.supabase_url.clone()),
            normalize_text_option(self.supabase_anon_key.clone()),
        ) {
            (Some(url), Some(anon_key)) => Ok(Some((url, anon_key))),
            (None, None) => Ok(None),
            (Some(_), None) => Err(Error::Config(format!(
                "supabase_url is set without an anon key ({ENV_SUPABASE_ANON_KEY})"
            ))),
            (None, Some(_)) => Err(Error::Config(format!(
                "supabase_anon_key is set without a URL ({ENV_SUPABASE_URL})"
            ))),
        }
    }

    pub fn autosave_quiet_period(&self) -> Duration {
        self.autosave_quiet_period_ms
            .map_or(DEFAULT_QUIET_PERIOD, Duration::from_millis)
    }
}
