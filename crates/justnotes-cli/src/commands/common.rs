use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use justnotes_core::events::spawn_observer;
use justnotes_core::{
    ClientConfig, HttpNoteService, Note, NoteId, NoteService, SyncController, TracingAnalytics,
};
use serde::Serialize;

use crate::auth::ProfileAuth;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

pub type HttpWorkspace = SyncController<HttpNoteService, ProfileAuth>;

const SHORT_ID_LEN: usize = 8;
const EMPTY_NOTE_LABEL: &str = "No content";

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: String,
    pub preview: String,
    pub content: String,
    pub ts: i64,
    pub relative_time: String,
}

/// Profile name and effective configuration (profile file, then env).
pub fn resolve_client_config(
    global_profile: Option<&str>,
) -> Result<(String, ClientConfig), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(global_profile);
    let from_profile = config
        .profile(&profile_name)
        .map(crate::config_profiles::CliProfile::client_config)
        .unwrap_or_default();
    let client_config = from_profile.merge(ClientConfig::from_env()?);
    client_config.validate()?;
    Ok((profile_name, client_config))
}

/// Build a controller against the configured note API and load the notes.
pub async fn open_workspace(global_profile: Option<&str>) -> Result<HttpWorkspace, CliError> {
    let (profile_name, config) = resolve_client_config(global_profile)?;
    let auth = ProfileAuth::for_profile(&profile_name, &config)?;

    let mut service = HttpNoteService::new(config.require_api_base_url()?)?;
    match auth.current_session().await? {
        Some(session) => service = service.with_access_token(session.access_token),
        None if auth.is_configured() => {
            tracing::warn!(
                "Profile '{}' is not signed in; requests are unauthenticated",
                profile_name
            );
        }
        None => {}
    }

    let controller = SyncController::new(service, auth)
        .with_quiet_period(config.autosave_quiet_period());
    enter_workspace(&controller).await?;
    Ok(controller)
}

pub async fn enter_workspace<S: NoteService>(
    controller: &SyncController<S, ProfileAuth>,
) -> Result<(), CliError> {
    spawn_observer(controller.events(), TracingAnalytics);
    if controller.enter_workspace().await {
        Ok(())
    } else {
        Err(operation_error(controller, "Failed to load notes"))
    }
}

/// Let armed autosaves fire, then report a failed save.
pub async fn settle<S: NoteService>(
    controller: &SyncController<S, ProfileAuth>,
) -> Result<(), CliError> {
    controller.wait_for_autosave().await;
    match controller.notes().last_error() {
        Some(message) => Err(CliError::Operation(message)),
        None => Ok(()),
    }
}

pub fn operation_error<S: NoteService>(
    controller: &SyncController<S, ProfileAuth>,
    fallback: &str,
) -> CliError {
    CliError::Operation(
        controller
            .notes()
            .last_error()
            .unwrap_or_else(|| fallback.to_string()),
    )
}

/// Resolve an exact id or a unique id prefix against `notes`.
pub fn resolve_note_id(note_query: &str, notes: &[Note]) -> Result<NoteId, CliError> {
    let note_query = normalize_note_identifier(note_query)?;
    if let Some(note) = notes.iter().find(|note| note.id.as_str() == note_query) {
        return Ok(note.id.clone());
    }

    let matching = notes
        .iter()
        .filter(|note| note.id.as_str().starts_with(&note_query))
        .collect::<Vec<_>>();

    match matching.as_slice() {
        [] => Err(CliError::NoteNotFound(note_query)),
        [note] => Ok(note.id.clone()),
        _ => {
            let options = matching
                .iter()
                .take(3)
                .map(|note| note.id.short(13))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousNoteId(format!(
                "ID prefix '{note_query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn format_note_lines(notes: &[Note]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    notes
        .iter()
        .map(|note| format_note_line(note, now_ms))
        .collect()
}

pub fn format_note_line(note: &Note, now_ms: i64) -> String {
    let short_id = note.id.short(SHORT_ID_LEN);
    let preview = note_label(note, 40);
    let relative_time = format_relative_time(note.ts, now_ms);
    format!("{short_id:<8}  {preview:<40}  {relative_time}")
}

pub fn note_label(note: &Note, max_chars: usize) -> String {
    if note.is_empty() {
        EMPTY_NOTE_LABEL.to_string()
    } else {
        note.preview(max_chars)
    }
}

pub fn note_to_list_item(note: &Note) -> NoteListItem {
    let now_ms = Utc::now().timestamp_millis();
    NoteListItem {
        id: note.id.to_string(),
        preview: note.preview(80),
        content: note.content.clone(),
        ts: note.ts,
        relative_time: format_relative_time(note.ts, now_ms),
    }
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

/// Content from arguments, else piped stdin.
pub fn content_from_args_or_stdin(content_parts: &[String]) -> Result<Option<String>, CliError> {
    if let Some(content) = normalize_content(&content_parts.join(" ")) {
        return Ok(Some(content));
    }
    read_piped_stdin()
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn normalize_note_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyNoteId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn capture_editor_input_with_initial(
    initial_content: &str,
) -> Result<Option<String>, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_note_file_path();
    std::fs::write(&temp_file, initial_content)?;

    let launch_result = launch_editor(&editor, &temp_file);
    let note_content = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(normalize_content(&note_content))
}

pub fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    let mut parts = editor.split_whitespace();
    let Some(program) = parts.next() else {
        return Err(CliError::EditorFailed("empty EDITOR command".into()));
    };

    let status = Command::new(program).args(parts).arg(file_path).status()?;
    if status.success() {
        Ok(())
    } else {
        Err(CliError::EditorFailed(format!(
            "`{editor}` exited with status {status}"
        )))
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

pub fn create_temp_note_file_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("justnotes-note-{}-{now}.txt", std::process::id()))
}
