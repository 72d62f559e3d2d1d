//! The `general` module: small commands everybody can use.

use tracing::instrument;

use super::Command;
use crate::lib;
use crate::serenity;
use crate::Context;
use crate::NovaError;

pub fn list() -> Vec<Command> {
    vec![ping(), uptime(), invite()]
}

/// Shows the gateway latency.
#[instrument(skip(ctx))]
#[poise::command(prefix_command, slash_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), NovaError> {
    let latency = ctx.ping().await;
    ctx.say(format!("Pong! `{}ms`", latency.as_millis()))
        .await?;
    Ok(())
}

/// How long the bot has been running.
#[instrument(skip(ctx))]
#[poise::command(prefix_command, slash_command)]
pub async fn uptime(ctx: Context<'_>) -> Result<(), NovaError> {
    let uptime = lib::format_duration(&ctx.data().session.uptime());
    ctx.say(format!("Up for `{uptime}`")).await?;
    Ok(())
}

/// Get a link to add the bot to your server.
#[instrument(skip(ctx))]
#[poise::command(prefix_command, slash_command)]
pub async fn invite(ctx: Context<'_>) -> Result<(), NovaError> {
    let app_id = ctx.data().session.application_id();
    let url = lib::invite_url(app_id, serenity::Permissions::ADMINISTRATOR);
    ctx.say(format!("<{url}>")).await?;
    Ok(())
}
