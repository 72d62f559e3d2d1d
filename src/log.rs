//! Logging functionality and error reporting.
//! The logging library of choice is [tracing].

use poise::BoxFuture;
use poise::CreateReply;
use poise::FrameworkError;
use tracing::debug;
use tracing::error;
use tracing::level_filters::LevelFilter;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};

use crate::error::UserError;
use crate::Config;
use crate::Context;
use crate::Data;
use crate::NovaError;

/// The name of this crate, used to set filter target.
const THIS_CRATE: &str = env!("CARGO_CRATE_NAME");

/// Setup format layers, tracing subscribers, and installs tracing.
/// Every entry is a single line: timestamp, level, target, message.
pub(super) fn install_tracing(config: &Config) -> Option<WorkerGuard> {
    // Uses local time.
    let timer = fmt::time::ChronoLocal::rfc_3339();

    // Set which traces are tracked.
    // By default, all INFO traces and above are shown.
    let target = if config.console_debug() {
        Targets::new()
            .with_default(LevelFilter::INFO)
            .with_target(THIS_CRATE, LevelFilter::DEBUG)
    } else {
        Targets::new().with_default(LevelFilter::INFO)
    };

    // Compose the layer that prints traces to stdout.
    // Debug mode adds source locations.
    let console_layer = fmt::layer()
        .with_ansi(true)
        .with_file(config.console_debug())
        .with_level(true)
        .with_line_number(config.console_debug())
        .with_target(true)
        .with_timer(timer.clone())
        .compact()
        .with_filter(target.clone());

    // Compose the layer that writes logs and get a guard for the writer.
    let (log_layer, guard) = if config.logs_enabled() {
        // Get the directory to store logs.
        let dir = config.log_dir();

        // Put file logs in `log_dir` directory as "{THIS_CRATE}.log.{DATE}", rotated daily.
        let prefix_format = format!("{THIS_CRATE}.log");
        let appender = tracing_appender::rolling::daily(dir, prefix_format);

        // Create the writer and writer guard.
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let layer = fmt::layer()
            .with_ansi(false)
            .with_file(config.console_debug())
            .with_level(true)
            .with_line_number(config.console_debug())
            .with_target(true)
            .with_timer(timer)
            .with_writer(writer)
            .compact()
            .with_filter(target);

        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    // Add all the layers and initialize them.
    tracing_subscriber::registry()
        .with(console_layer)
        .with(log_layer)
        .init();

    guard
}

/// Routes framework errors.
///
/// Mistakes by the command user get an ephemeral explanation and a debug log.
/// Failures of the bot itself are logged as errors and the user is told something broke.
pub fn handle_framework_error(err: FrameworkError<Data, NovaError>) -> BoxFuture<()> {
    Box::pin(async move {
        match err {
            FrameworkError::Setup { error, .. } => error!("Framework setup failed: {error}"),
            FrameworkError::EventHandler { error, event, .. } => {
                let event = event.snake_case_name();
                error!("Error while handling {event} event: {error}")
            }

            // The `help` argument and owner-only `admin` commands.
            FrameworkError::ArgumentParse {
                error, input, ctx, ..
            } => {
                let mistake = UserError::BadArgs { input };
                Response::builder()
                    .ctx(&ctx)
                    .reply(mistake.to_string())
                    .source(mistake)
                    .add_info(error.to_string())
                    .build()
                    .send()
                    .await;
            }
            FrameworkError::NotAnOwner { ctx, .. } => user_error(&ctx, UserError::NotOwner).await,
            FrameworkError::CooldownHit {
                remaining_cooldown,
                ctx,
                ..
            } => user_error(&ctx, UserError::OnCooldown { remaining_cooldown }).await,
            FrameworkError::Command {
                error: NovaError::UserError(mistake),
                ctx,
                ..
            } => user_error(&ctx, mistake).await,

            FrameworkError::Command { error, ctx, .. } => {
                bot_error(&ctx, "Something went wrong...", error).await
            }
            FrameworkError::CommandPanic { payload, ctx, .. } => {
                let error = NovaError::Panic { payload };
                bot_error(&ctx, "Something went horribly wrong...", error).await
            }
            // Discord still has the previous registry, usually right after a sync.
            FrameworkError::CommandStructureMismatch {
                description, ctx, ..
            } => {
                let error = NovaError::CommandStructureMismatch {
                    description: description.to_string(),
                };
                let reply = "My commands were just updated, try again in a minute.";
                bot_error(&Context::Application(ctx), reply, error).await
            }

            FrameworkError::UnknownCommand { msg_content, .. } => {
                debug!("Unknown prefix command: {msg_content}")
            }
            FrameworkError::UnknownInteraction { interaction, .. } => {
                warn!("Received unknown interaction: {}", interaction.data.name)
            }
            FrameworkError::DynamicPrefix { error, .. } => {
                error!("Failed to resolve prefix: {error}")
            }
            other => error!("Unhandled framework error: {other}"),
        }
    })
}

/// Reply to a mistake made by the user of a command.
async fn user_error(ctx: &Context<'_>, error: UserError) {
    Response::builder()
        .ctx(ctx)
        .reply(error.to_string())
        .source(error)
        .build()
        .send()
        .await;
}

/// Report a failure of the bot itself.
async fn bot_error(ctx: &Context<'_>, reply: &str, error: NovaError) {
    Response::builder()
        .ctx(ctx)
        .reply(reply)
        .source(error)
        .is_error(true)
        .build()
        .send()
        .await;
}

/// Sends an ephemeral reply to the [Context] author.
async fn ephemeral_reply(ctx: &Context<'_>, content: impl Into<String>) {
    let reply = CreateReply::default().ephemeral(true).content(content);
    if let Err(e) = ctx.send(reply).await {
        error!("Failed to send ephemeral reply. {e}")
    };
}

/// Helper function to create debug information from [Context]
fn debug_info(ctx: &Context) -> String {
    let user = &ctx.author().name;
    let cmd = &ctx.command().name;
    let user_input = ctx.invocation_string();
    format!("{user} tried to use {cmd} with {user_input}.")
}

/// Structured response to errors.
/// Always logs as at least [debug level](tracing::debug), but is upgraded to
/// [error level](tracing::error) if `is_error` is set.
#[derive(bon::Builder)]
#[builder(on(String, into))]
struct Response<'a> {
    /// The context of the response
    ctx: &'a Context<'a>,
    /// The reason for this reply, usually the error causing the response.
    #[builder(into)]
    source: NovaError,
    /// Optional ephemeral reply to user.
    reply: Option<String>,
    /// Additional information to log
    add_info: Option<String>,
    /// Set to `true` to log as error.
    #[builder(default = false)]
    is_error: bool,
}

impl Response<'_> {
    /// Execute the response
    async fn send(&self) {
        let ctx = self.ctx;

        let log_message = {
            let source = &self.source;
            let add_info = self
                .add_info
                .as_ref()
                // Map `None` to "" otherwise format it to be appended to another string.
                .map_or("".to_string(), |s| format!("| {s}"));
            format!("{source} {add_info}")
        };
        if self.is_error {
            let dbg_info = debug_info(ctx);
            error!("{log_message} ({dbg_info})");
        } else {
            debug!("{log_message}");
        }

        // Send ephemeral reply if there is one.
        if let Some(ref reply) = self.reply {
            ephemeral_reply(ctx, reply).await;
        }
    }
}
