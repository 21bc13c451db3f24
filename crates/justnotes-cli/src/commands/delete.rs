use std::io::{self, BufRead, Write};

use crate::commands::common::{note_label, open_workspace, operation_error, resolve_note_id};
use crate::error::CliError;

pub async fn run_delete(id: &str, yes: bool, global_profile: Option<&str>) -> Result<(), CliError> {
    let workspace = open_workspace(global_profile).await?;
    let notes = workspace.notes().notes();
    let note_id = resolve_note_id(id, &notes)?;
    workspace.request_delete_by_id(&note_id);

    if !yes {
        let label = notes
            .iter()
            .find(|note| note.id == note_id)
            .map(|note| note_label(note, 40))
            .unwrap_or_default();
        if !confirm(&format!("Delete note {} \"{label}\"?", note_id.short(8)))? {
            workspace.cancel_delete();
            println!("Cancelled");
            return Ok(());
        }
    }

    if !workspace.confirm_delete().await {
        return Err(operation_error(&workspace, "Failed to delete note"));
    }
    println!("{note_id}");
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool, CliError> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_affirmative(&answer))
}

pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
