//! The `help` module.

use super::Command;
use crate::Context;
use crate::NovaError;

pub fn list() -> Vec<Command> {
    vec![help()]
}

/// Show the available commands
#[poise::command(prefix_command, slash_command, track_edits)]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> Result<(), NovaError> {
    let bottom = format!(
        "Prefix commands use `{}`, or mention me.",
        ctx.data().prefix
    );
    let config = poise::builtins::HelpConfiguration {
        extra_text_at_bottom: &bottom,
        ephemeral: true,
        ..Default::default()
    };
    poise::builtins::help(ctx, command.as_deref(), config).await?;
    Ok(())
}
