//! Shared utility functions used across multiple modules.

use std::sync::{Mutex, MutexGuard, PoisonError};

use reqwest::{Response, StatusCode};
use serde::Deserialize;

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Check if a string starts with `http://` or `https://`.
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

/// Message for a failed API call, tagged with the HTTP status.
///
/// Prefers the message fields of a JSON error body and falls back to the
/// raw body, truncated.
pub(crate) fn api_error_message(status: StatusCode, body: &str) -> String {
    let described = serde_json::from_str::<ApiErrorBody>(body).ok().and_then(|payload| {
        payload
            .message
            .or(payload.msg)
            .or(payload.error_description)
            .or(payload.error)
    });
    let message = described.map_or_else(|| compact_text(body), |message| compact_text(&message));

    if message.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{message} ({})", status.as_u16())
    }
}

/// Consume a non-success response into [`api_error_message`].
pub(crate) async fn read_api_error(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    api_error_message(status, &body)
}

/// Current Unix timestamp in milliseconds.
pub fn unix_timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Lock a mutex, recovering the guard if a previous holder panicked.
///
/// Store state stays structurally valid across a panic because every
/// mutation is a single assignment under the lock.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
