//! The `admin` module: owner-only maintenance commands.

use itertools::Itertools;
use tracing::instrument;

use super::Command;
use crate::sync::SyncOutcome;
use crate::Context;
use crate::NovaError;

pub fn list() -> Vec<Command> {
    vec![sync(), extensions()]
}

/// Push the slash commands to discord again.
#[instrument(skip(ctx))]
#[poise::command(prefix_command, slash_command, owners_only, hide_in_help)]
pub async fn sync(ctx: Context<'_>) -> Result<(), NovaError> {
    ctx.defer_ephemeral().await?;

    let reply = match ctx.data().sync.resync().await {
        SyncOutcome::Synced(count) => format!("Synced {count} commands."),
        SyncOutcome::AlreadySynced => "Already synced.".to_string(),
        SyncOutcome::GaveUp { attempts } => {
            format!("Still rate limited after {attempts} attempts, try again later.")
        }
        SyncOutcome::Failed(error) => format!("Sync failed: {error}"),
    };
    ctx.say(reply).await?;

    Ok(())
}

/// List the extensions loaded at startup.
#[instrument(skip(ctx))]
#[poise::command(prefix_command, slash_command, owners_only, hide_in_help)]
pub async fn extensions(ctx: Context<'_>) -> Result<(), NovaError> {
    let record = &ctx.data().extensions;

    let reply = if record.is_empty() {
        "No extensions found.".to_string()
    } else {
        record
            .iter()
            .map(|(id, loaded)| {
                let mark = if *loaded { "✓" } else { "✗" };
                format!("{mark} `{id}`")
            })
            .join("\n")
    };
    ctx.say(reply).await?;

    Ok(())
}
