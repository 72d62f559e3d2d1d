//! Implements the `stats` command.
//!
//! The bot responds with an embed describing the current session.

use poise::CreateReply;
use serenity::CreateEmbed;
use tracing::instrument;

use super::Command;
use crate::lib;
use crate::serenity;
use crate::Context;
use crate::NovaError;

pub fn list() -> Vec<Command> {
    vec![stats()]
}

/// Show what the bot is up to
#[instrument(skip(ctx))]
#[poise::command(prefix_command, slash_command, user_cooldown = 5)]
pub async fn stats(ctx: Context<'_>) -> Result<(), NovaError> {
    let data = ctx.data();
    let cache = &ctx.serenity_context().cache;

    let uptime = lib::format_duration(&data.session.uptime());
    let started = data.session.started_at().format("%Y-%m-%d %H:%M UTC");
    let extensions = format!(
        "{} loaded, {} failed",
        data.extensions.succeeded(),
        data.extensions.failed()
    );

    let embed = CreateEmbed::default()
        .title("Stats")
        .field("Guilds", cache.guild_count().to_string(), true)
        .field("Users", cache.user_count().to_string(), true)
        .field("Shards", data.session.shard_count().to_string(), true)
        .field("Uptime", uptime, true)
        .field("Started", started.to_string(), true)
        .field("Extensions", extensions, true);

    ctx.send(CreateReply::default().embed(embed)).await?;

    Ok(())
}
