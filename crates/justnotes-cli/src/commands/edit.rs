use crate::commands::common::{
    capture_editor_input_with_initial, content_from_args_or_stdin, open_workspace,
    resolve_note_id, settle,
};
use crate::error::CliError;

pub async fn run_edit(
    id: &str,
    content_parts: &[String],
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let workspace = open_workspace(global_profile).await?;
    let note_id = resolve_note_id(id, &workspace.notes().notes())?;
    workspace.select_by_id(&note_id);
    let current = workspace.board().content();

    let edited_content = match content_from_args_or_stdin(content_parts)? {
        Some(content) => content,
        None => capture_editor_input_with_initial(&current)?.ok_or(CliError::EmptyEditedContent)?,
    };

    if edited_content == current {
        println!("{note_id}");
        return Ok(());
    }

    workspace.edit(edited_content);
    settle(&workspace).await?;
    println!("{note_id}");
    Ok(())
}
