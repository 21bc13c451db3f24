use crate::commands::common::{
    content_from_args_or_stdin, open_workspace, operation_error, settle,
};
use crate::error::CliError;

/// Create a note and, when content was given, type it into the new note.
pub async fn run_new(content_parts: &[String], global_profile: Option<&str>) -> Result<(), CliError> {
    let content = content_from_args_or_stdin(content_parts)?;
    let workspace = open_workspace(global_profile).await?;

    let note = workspace
        .create()
        .await
        .ok_or_else(|| operation_error(&workspace, "Failed to create note"))?;
    if let Some(content) = content {
        workspace.edit(content);
        settle(&workspace).await?;
    }

    println!("{}", note.id);
    Ok(())
}
