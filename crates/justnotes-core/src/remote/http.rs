//! REST client for the hosted note service.

use std::fmt;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use super::NoteService;
use crate::models::{Note, NoteId, NotePatch};
use crate::util::{is_http_url, normalize_text_option, read_api_error};
use crate::{Error, Result};

#[derive(Clone)]
pub struct HttpNoteService {
    base_url: String,
    access_token: Option<String>,
    client: Client,
}

impl fmt::Debug for HttpNoteService {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("HttpNoteService")
            .field("base_url", &self.base_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

impl HttpNoteService {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url.into())?,
            access_token: None,
            client: Client::builder().build()?,
        })
    }

    /// Attach the bearer token of the signed-in user.
    #[must_use]
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = normalize_text_option(Some(access_token.into()));
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn notes_url(&self) -> String {
        format!("{}/notes", self.base_url)
    }

    fn note_url(&self, id: &NoteId) -> String {
        format!("{}/notes/{}", self.base_url, urlencoding::encode(id.as_str()))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("Accept", "application/json");
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        let response = self.authorize(request).send().await?;
        if response.status().is_success() {
            return Ok(response);
        }

        Err(Error::Api(read_api_error(response).await))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        Ok(response.json::<T>().await?)
    }
}

impl NoteService for HttpNoteService {
    async fn list(&self) -> Result<Vec<Note>> {
        self.send_json(self.client.get(self.notes_url())).await
    }

    async fn create(&self) -> Result<Note> {
        let payload = NotePatch::content("");
        self.send_json(self.client.post(self.notes_url()).json(&payload))
            .await
    }

    async fn update(&self, id: &NoteId, patch: &NotePatch) -> Result<Note> {
        self.send_json(self.client.patch(self.note_url(id)).json(patch))
            .await
    }

    async fn delete(&self, id: &NoteId) -> Result<()> {
        self.send(self.client.delete(self.note_url(id))).await?;
        Ok(())
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let base_url = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::Config("note service URL must not be empty".to_string()))?;
    if is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(Error::Config(
            "note service URL must include http:// or https://".to_string(),
        ))
    }
}
