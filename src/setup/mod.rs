//! Bootstraps the bot and owns it until shutdown.
//!
//! Startup is strictly ordered:
//! 1. Log in over HTTP to validate the token and learn the application id.
//! 2. Load extensions, then build the client with their commands.
//! 3. Start presence rotation (it idles until every shard is ready).
//! 4. Push the command registry, if enabled.
//! 5. Connect every shard and run until stopped.
//!
//! Ctrl-C ends the run at any step, setup included.
//! Whatever happens, the connection is closed once before returning.

mod config;
mod framework;
mod teardown;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::commands;
use crate::data::ReadySignal;
use crate::data::SessionInfo;
use crate::error::StartupError;
use crate::extensions;
use crate::lifecycle::LifecycleHooks;
use crate::lifecycle::LogHook;
use crate::lifecycle::ShardTracker;
use crate::presence::PresenceCycle;
use crate::presence::PresenceRotator;
use crate::presence::PresenceSink;
use crate::presence::ShardPresence;
use crate::serenity;
use crate::sync::CommandSync;
use crate::sync::HttpRegistry;
use crate::sync::RetryPolicy;
use crate::Data;
use crate::NovaError;

pub use config::Config;
use teardown::Teardown;

/// Run the bot until it is stopped or fails to start.
pub async fn run(config: Config) {
    info!("Starting bot...");
    let mut bootstrap = Bootstrap::new(config);

    // Ctrl-C during login or a rate limited sync skips the rest of setup.
    let setup = teardown::unless_interrupted(bootstrap.client(), teardown::interrupted()).await;

    match setup {
        None => info!("Setup interrupted"),
        Some(Ok(mut client)) => {
            let teardown = Teardown::new(client.shard_manager.clone());
            let interrupt = teardown.close_on_interrupt();

            if let Err(e) = client.start_autosharded().await {
                report_startup_failure(e.into());
            }

            if !teardown.is_closed() {
                teardown.close().await;
            }
            interrupt.abort();
        }
        Some(Err(e)) => report_startup_failure(e),
    }

    bootstrap.stop_rotator();
    info!("Bot shutdown complete");
}

/// Log why the bot couldn't run.
fn report_startup_failure(error: NovaError) {
    let error = match error {
        NovaError::Serenity(e) => NovaError::Startup(e.into()),
        other => other,
    };

    match error {
        NovaError::Startup(StartupError::Fatal(e)) => {
            error!(severity = "critical", "Fatal startup error: {e:?}")
        }
        other => error!(severity = "critical", "{other}"),
    }
}

/// Startup state that outlives the client.
struct Bootstrap {
    #[allow(clippy::missing_docs_in_private_items)]
    config: Config,
    /// Shared with the event handler, which fires it.
    ready: ReadySignal,
    /// The presence rotation task, once started.
    rotator: Option<JoinHandle<()>>,
}

impl Bootstrap {
    fn new(config: Config) -> Self {
        Self {
            config,
            ready: ReadySignal::new(),
            rotator: None,
        }
    }

    /// Log in, run the setup phase and construct a [serenity::Client] ready to connect.
    async fn client(&mut self) -> Result<serenity::Client, NovaError> {
        // Get discord token from config file
        let token = self.config.token()?.to_string();
        let (http, application_id) = login(&token).await?;

        info!("Running setup...");

        let report =
            extensions::load_extensions(self.config.extensions_dir(), &commands::catalog());

        let app_commands = poise::builtins::create_application_commands(&report.commands);
        let registry = HttpRegistry::new(http, app_commands, self.config.dev_guild());
        let sync = Arc::new(CommandSync::new(registry, RetryPolicy::default()));

        let mut hooks = LifecycleHooks::default();
        hooks.register(LogHook);

        let data = Data {
            session: Arc::new(SessionInfo::new(application_id)),
            extensions: report.record,
            sync: sync.clone(),
            prefix: self.config.prefix().to_string(),
            hooks,
            ready: self.ready.clone(),
            shards: ShardTracker::default(),
        };

        let client = serenity::ClientBuilder::new(&token, framework::intents())
            .framework(framework::framework(report.commands, data))
            .await?;

        self.start_rotator(ShardPresence::new(client.shard_manager.clone()));

        if self.config.auto_sync() {
            sync.sync().await;
        }

        info!("Setup completed");
        Ok(client)
    }

    /// Spawn presence rotation unless it is already running.
    fn start_rotator<S: PresenceSink + 'static>(&mut self, sink: S) {
        if self.rotator.as_ref().is_some_and(|task| !task.is_finished()) {
            debug!("Presence rotation already running.");
            return;
        }

        let Some(cycle) = PresenceCycle::new(self.config.activities().to_vec()) else {
            warn!("No presences configured, rotation disabled.");
            return;
        };

        let rotator = PresenceRotator::new(
            cycle,
            sink,
            self.config.presence_status(),
            self.config.presence_interval(),
            self.config.presence_backoff(),
        );
        self.rotator = Some(rotator.spawn(self.ready.clone()));
    }

    fn stop_rotator(&mut self) {
        if let Some(task) = self.rotator.take() {
            task.abort();
        }
    }
}

/// Validate the token and fetch the application id.
async fn login(token: &str) -> Result<(Arc<serenity::Http>, serenity::ApplicationId), StartupError> {
    let http = Arc::new(serenity::Http::new(token));
    let info = http.get_current_application_info().await?;
    http.set_application_id(info.id);
    info!("Logged in as {} ({})", info.name, info.id);
    Ok((http, info.id))
}
