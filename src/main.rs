//! A sharded discord bot: loads extensions, rotates its presence and keeps
//! its slash commands in sync.

mod commands;
mod data;
mod error;
mod extensions;
#[allow(special_module_name)]
mod lib;
mod lifecycle;
mod log;
mod presence;
mod setup;
mod sync;

pub use poise::serenity_prelude as serenity;

use data::Data;
use error::NovaError;
use setup::Config;

/// Convenient type alias for [poise::Context].
type Context<'a> = poise::Context<'a, Data, NovaError>;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Tracing isn't installed until the config is known.
    let config = match Config::read() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return;
        }
    };

    // Keep the guard alive so file logs are flushed on exit.
    let _guard = log::install_tracing(&config);

    setup::run(config).await;
}
