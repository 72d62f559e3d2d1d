//! Setup for [poise::Framework]

use tracing::instrument;

use crate::commands::Command;
use crate::lib;
use crate::lifecycle::GuildSummary;
use crate::lifecycle::LifecycleEvent;
use crate::lifecycle::ReadySummary;
use crate::serenity;
use crate::Data;
use crate::NovaError;

/// Convenient type alias, only this [poise::Framework] type is used.
pub(super) type Framework = poise::Framework<Data, NovaError>;

/// Construct a [poise::Framework] around already prepared [Data].
pub(super) fn framework(commands: Vec<Command>, data: Data) -> Framework {
    poise::Framework::builder()
        .options(framework_options(commands))
        .setup(move |_ctx, _rdy, _fw| Box::pin(async move { Ok(data) }))
        .build()
}

/// Intents we wish to use.
/// See https://discord.com/developers/docs/topics/gateway#gateway-intents
pub(super) fn intents() -> serenity::GatewayIntents {
    serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MEMBERS
}

/// Configure options for the [Framework]
fn framework_options(commands: Vec<Command>) -> poise::FrameworkOptions<Data, NovaError> {
    poise::FrameworkOptions {
        commands,
        prefix_options: poise::PrefixFrameworkOptions {
            stripped_dynamic_prefix: Some(|ctx, msg, data| {
                Box::pin(async move {
                    let bot_id = ctx.cache.current_user().id;
                    Ok(split_prefix(&msg.content, &data.prefix, bot_id))
                })
            }),
            case_insensitive_commands: true,
            ..Default::default()
        },
        // Never ping everyone, roles or the replied user.
        allowed_mentions: Some(
            serenity::CreateAllowedMentions::new()
                .all_users(true)
                .all_roles(false)
                .everyone(false)
                .replied_user(false),
        ),
        // Handle framework errors
        on_error: |e| crate::log::handle_framework_error(e),
        // Translate gateway events into lifecycle events
        event_handler: |ctx, event, fw, data| Box::pin(event_handler(ctx, event, fw, data)),
        // Log when commands start
        pre_command: |ctx| {
            Box::pin(async move {
                let cmd_name = &ctx.command().name;
                let user = &ctx.author().name;
                tracing::info!("Started '{cmd_name}' command from {user}.")
            })
        },
        // Log when finishing commands
        post_command: |ctx| {
            Box::pin(async move {
                let cmd_name = &ctx.command().name;
                let user = &ctx.author().name;
                tracing::info!("Finished '{cmd_name}' command from {user}.")
            })
        },
        ..Default::default()
    }
}

/// Split `content` into the prefix it starts with and the rest.
/// The prefix is either `prefix` (any case) or a mention of `bot_id`.
/// Whitespace between the prefix and the command is dropped.
pub fn split_prefix<'a>(
    content: &'a str,
    prefix: &str,
    bot_id: serenity::UserId,
) -> Option<(&'a str, &'a str)> {
    let text_prefix = content
        .get(..prefix.len())
        .filter(|head| !prefix.is_empty() && head.eq_ignore_ascii_case(prefix));

    let matched = text_prefix.or_else(|| {
        [format!("<@{bot_id}>"), format!("<@!{bot_id}>")]
            .iter()
            .find(|mention| content.starts_with(mention.as_str()))
            .map(|mention| &content[..mention.len()])
    })?;

    let rest = content[matched.len()..].trim_start();
    if rest.is_empty() {
        None
    } else {
        Some((matched, rest))
    }
}

/// Dispatches the events the bot cares about to the lifecycle hooks.
#[instrument(level = "debug", skip_all, fields(event = event.snake_case_name()))]
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    framework: poise::FrameworkContext<'_, Data, NovaError>,
    data: &Data,
) -> Result<(), NovaError> {
    let shard_id = ctx.shard_id.0;

    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            data.hooks.dispatch(&LifecycleEvent::ShardReady { shard_id });

            let total = data_about_bot.shard.as_ref().map_or(1, |shard| shard.total);
            if data.shards.shard_ready(shard_id, total).await {
                data.session.set_shard_count(total);

                let latency = framework
                    .shard_manager
                    .runners
                    .lock()
                    .await
                    .get(&ctx.shard_id)
                    .and_then(|runner| runner.latency);

                let summary = ReadySummary {
                    user: data_about_bot.user.tag(),
                    user_id: data_about_bot.user.id.get(),
                    guilds: ctx.cache.guild_count(),
                    users: ctx.cache.user_count(),
                    shard_count: total,
                    latency,
                    invite: lib::invite_url(
                        data.session.application_id(),
                        serenity::Permissions::ADMINISTRATOR,
                    ),
                };
                data.hooks.dispatch(&LifecycleEvent::Ready(summary));
                data.ready.mark_ready();
            }
        }
        serenity::FullEvent::Resume { .. } => {
            data.hooks
                .dispatch(&LifecycleEvent::ShardResumed { shard_id });
        }
        serenity::FullEvent::GuildCreate {
            guild,
            is_new: Some(true),
        } => {
            let summary = GuildSummary {
                name: Some(guild.name.clone()),
                id: guild.id.get(),
                member_count: Some(guild.member_count),
            };
            data.hooks.dispatch(&LifecycleEvent::GuildJoined(summary));
        }
        // An unavailable guild is an outage, not a removal.
        serenity::FullEvent::GuildDelete { incomplete, full } if !incomplete.unavailable => {
            let summary = GuildSummary {
                name: full.as_ref().map(|g| g.name.clone()),
                id: incomplete.id.get(),
                member_count: full.as_ref().map(|g| g.member_count),
            };
            data.hooks.dispatch(&LifecycleEvent::GuildRemoved(summary));
        }
        _ => {}
    }

    Ok(())
}
