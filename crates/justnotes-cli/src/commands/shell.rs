//! Interactive workspace: one line per intent.

use std::io::Write;

use chrono::Utc;
use justnotes_core::{AutosaveState, MemoryNoteService, Note, NoteService, SyncController};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::auth::ProfileAuth;
use crate::commands::common::{
    enter_workspace, format_note_line, note_label, open_workspace, resolve_client_config,
    resolve_note_id,
};
use crate::error::CliError;

const HELP: &str = "\
Commands:
  list               list notes
  select <id>        edit a note (id or unique prefix)
  type <text>        replace the draft of the selected note
  append <text>      add a line to the draft
  show               print the draft
  new                create a note and select it
  delete <id>        ask to delete a note
  confirm | cancel   answer a pending delete
  status             selection, pending saves and errors
  logout             sign out and leave
  help               this text
  quit               wait for pending saves and leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    List,
    Select(String),
    Type(String),
    Append(String),
    Show,
    New,
    Delete(String),
    Confirm,
    Cancel,
    Status,
    Logout,
    Help,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShellFlow {
    Continue,
    Quit,
    LoggedOut,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_shell_command(line: &str) -> Result<Option<ShellCommand>, String> {
    let line = line.trim_start();
    if line.trim().is_empty() {
        return Ok(None);
    }

    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim_end_matches(['\r', '\n']);
    let argument = |usage: &str| {
        let value = rest.trim();
        if value.is_empty() {
            Err(format!("Usage: {usage}"))
        } else {
            Ok(value.to_string())
        }
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "list" | "ls" => ShellCommand::List,
        "select" | "open" => ShellCommand::Select(argument("select <id>")?),
        "type" => ShellCommand::Type(rest.to_string()),
        "append" => ShellCommand::Append(rest.to_string()),
        "show" => ShellCommand::Show,
        "new" => ShellCommand::New,
        "delete" | "rm" => ShellCommand::Delete(argument("delete <id>")?),
        "confirm" | "yes" => ShellCommand::Confirm,
        "cancel" | "no" => ShellCommand::Cancel,
        "status" => ShellCommand::Status,
        "logout" => ShellCommand::Logout,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        other => return Err(format!("Unknown command '{other}'. Type `help`.")),
    };
    Ok(Some(command))
}

pub async fn run_shell(demo: bool, global_profile: Option<&str>) -> Result<(), CliError> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();

    if demo {
        let (_, config) = resolve_client_config(global_profile)?;
        let controller = SyncController::new(demo_service(), ProfileAuth::demo())
            .with_quiet_period(config.autosave_quiet_period());
        enter_workspace(&controller).await?;
        run_repl(&controller, stdin, &mut stdout).await
    } else {
        let controller = open_workspace(global_profile).await?;
        run_repl(&controller, stdin, &mut stdout).await
    }
}

fn demo_service() -> MemoryNoteService {
    let now = Utc::now().timestamp_millis();
    MemoryNoteService::with_notes(vec![
        Note::new(
            "demo-welcome",
            "Welcome to justnotes\nEdits are saved a moment after you stop typing.",
            now - 5 * 60_000,
        ),
        Note::new("demo-groceries", "Groceries: eggs, coffee, bread", now - 3 * 3_600_000),
    ])
}

pub async fn run_repl<S, R, W>(
    controller: &SyncController<S, ProfileAuth>,
    input: R,
    output: &mut W,
) -> Result<(), CliError>
where
    S: NoteService,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(output, "justnotes shell. Type `help` for commands.")?;
    let mut lines = input.lines();

    loop {
        write!(output, "{}", prompt(controller))?;
        output.flush()?;
        let Some(line) = lines.next_line().await? else {
            writeln!(output)?;
            break;
        };

        match parse_shell_command(&line) {
            Ok(None) => {}
            Ok(Some(command)) => match execute(controller, command, output).await? {
                ShellFlow::Continue => {}
                ShellFlow::Quit => break,
                // Leaving after logout does not wait for armed saves.
                ShellFlow::LoggedOut => return Ok(()),
            },
            Err(message) => writeln!(output, "{message}")?,
        }
    }

    let pending = controller.autosave().pending_count();
    if pending > 0 {
        writeln!(output, "Waiting for {pending} pending save(s)...")?;
    }
    controller.wait_for_autosave().await;
    Ok(())
}

fn prompt<S: NoteService>(controller: &SyncController<S, ProfileAuth>) -> String {
    match controller.board().selected_note_id() {
        Some(id) => {
            let marker = if controller.autosave().state(&id) == AutosaveState::Pending {
                "*"
            } else {
                ""
            };
            format!("justnotes:{}{marker}> ", id.short(8))
        }
        None => "justnotes> ".to_string(),
    }
}

async fn execute<S, W>(
    controller: &SyncController<S, ProfileAuth>,
    command: ShellCommand,
    output: &mut W,
) -> Result<ShellFlow, CliError>
where
    S: NoteService,
    W: Write,
{
    match command {
        ShellCommand::List => {
            let snapshot = controller.snapshot();
            if !snapshot.has_notes() {
                writeln!(output, "No notes yet. Type `new` to create one.")?;
            }
            let now_ms = Utc::now().timestamp_millis();
            for note in &snapshot.notes {
                let marker = if snapshot.board.is_selected(&note.id) {
                    ">"
                } else {
                    " "
                };
                writeln!(output, "{marker} {}", format_note_line(note, now_ms))?;
            }
        }
        ShellCommand::Select(query) => {
            match resolve_note_id(&query, &controller.notes().notes()) {
                Ok(id) if controller.select_by_id(&id) => {
                    writeln!(output, "Editing {}", id.short(8))?;
                    write_draft(output, &controller.board().content())?;
                }
                Ok(_) => writeln!(output, "Notes are still loading.")?,
                Err(error) => writeln!(output, "{error}")?,
            }
        }
        ShellCommand::Type(text) => {
            if !controller.edit(text) {
                writeln!(output, "Select a note first (`select <id>` or `new`).")?;
            }
        }
        ShellCommand::Append(text) => {
            let draft = controller.board().content();
            let updated = if draft.is_empty() {
                text
            } else {
                format!("{draft}\n{text}")
            };
            if !controller.edit(updated) {
                writeln!(output, "Select a note first (`select <id>` or `new`).")?;
            }
        }
        ShellCommand::Show => {
            if controller.board().selected_note_id().is_some() {
                write_draft(output, &controller.board().content())?;
            } else {
                writeln!(output, "No note selected.")?;
            }
        }
        ShellCommand::New => match controller.create().await {
            Some(note) => writeln!(output, "Created {}. Start typing with `type`.", note.id.short(8))?,
            None => writeln!(output, "{}", failure(controller, "Could not create a note."))?,
        },
        ShellCommand::Delete(query) => {
            let notes = controller.notes().notes();
            match resolve_note_id(&query, &notes) {
                Ok(id) if controller.request_delete_by_id(&id) => {
                    let label = notes
                        .iter()
                        .find(|note| note.id == id)
                        .map(|note| note_label(note, 40))
                        .unwrap_or_default();
                    writeln!(
                        output,
                        "Delete {} \"{label}\"? Type `confirm` or `cancel`.",
                        id.short(8)
                    )?;
                }
                Ok(_) => writeln!(output, "Notes are still loading.")?,
                Err(error) => writeln!(output, "{error}")?,
            }
        }
        ShellCommand::Confirm => {
            let Some(id) = controller.board().note_id_to_delete() else {
                writeln!(output, "Nothing to delete.")?;
                return Ok(ShellFlow::Continue);
            };
            if controller.confirm_delete().await {
                writeln!(output, "Deleted {}.", id.short(8))?;
            } else {
                writeln!(output, "{}", failure(controller, "Could not delete the note."))?;
            }
        }
        ShellCommand::Cancel => {
            controller.cancel_delete();
        }
        ShellCommand::Status => write_status(controller, output)?,
        ShellCommand::Logout => {
            let route = controller.logout().await;
            tracing::debug!("Leaving workspace for {:?}", route);
            writeln!(output, "Signed out.")?;
            return Ok(ShellFlow::LoggedOut);
        }
        ShellCommand::Help => writeln!(output, "{HELP}")?,
        ShellCommand::Quit => return Ok(ShellFlow::Quit),
    }
    Ok(ShellFlow::Continue)
}

fn write_draft<W: Write>(output: &mut W, draft: &str) -> std::io::Result<()> {
    if draft.is_empty() {
        writeln!(output, "(empty)")
    } else {
        writeln!(output, "{draft}")
    }
}

fn write_status<S: NoteService, W: Write>(
    controller: &SyncController<S, ProfileAuth>,
    output: &mut W,
) -> std::io::Result<()> {
    let snapshot = controller.snapshot();
    let selected = snapshot
        .board
        .selected_note_id
        .as_ref()
        .map_or_else(|| "none".to_string(), |id| id.short(8));
    let pending_delete = snapshot
        .board
        .note_id_to_delete
        .as_ref()
        .map_or_else(|| "none".to_string(), |id| id.short(8));

    writeln!(output, "notes:          {}", snapshot.notes.len())?;
    writeln!(output, "selected:       {selected}")?;
    writeln!(output, "pending delete: {pending_delete}")?;
    writeln!(
        output,
        "pending saves:  {}",
        controller.autosave().pending_count()
    )?;
    writeln!(
        output,
        "busy:           loading={} creating={} deleting={}",
        snapshot.loading.is_loading, snapshot.loading.is_creating, snapshot.loading.is_deleting
    )?;
    if let Some(error) = controller.notes().last_error() {
        writeln!(output, "last error:     {error}")?;
    }
    Ok(())
}

fn failure<S: NoteService>(controller: &SyncController<S, ProfileAuth>, fallback: &str) -> String {
    let message = controller
        .notes()
        .last_error()
        .unwrap_or_else(|| fallback.to_string());
    controller.notes().clear_error();
    message
}
