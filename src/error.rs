//! Error types used throughout the bot.

use std::time::Duration;

use thiserror::Error;

use crate::serenity;

/// The crate-wide error type, also used as the framework error.
#[derive(Error, Debug)]
pub enum NovaError {
    #[error(transparent)]
    Serenity(#[from] serenity::prelude::SerenityError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    UserError(#[from] UserError),

    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error("Command panicked: {}", payload.as_deref().unwrap_or("<no payload>"))]
    Panic { payload: Option<String> },

    #[error("Command structure mismatch: {description}")]
    CommandStructureMismatch { description: String },
}

/// Problems reading `config.toml`.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error("Missing config file. {action_msg}")]
    MissingConfig { action_msg: String },
}

/// Failure of a call that went over the network.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The backend asked us to slow down.
    #[error("Rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("No live shards to send to")]
    NotConnected,

    #[error("{0}")]
    Other(String),
}

impl From<serenity::prelude::SerenityError> for TransportError {
    fn from(error: serenity::prelude::SerenityError) -> Self {
        match error {
            serenity::prelude::SerenityError::Http(http_error) => TransportError::from_status(
                http_error.status_code().map(|status| status.as_u16()),
                http_error.to_string(),
            ),
            other => TransportError::Other(other.to_string()),
        }
    }
}

impl TransportError {
    /// Classify a failed HTTP call by its status code.
    /// Discord's error body carries no retry delay, so rate limits never have one.
    fn from_status(status: Option<u16>, message: String) -> Self {
        match status {
            Some(TOO_MANY_REQUESTS) => TransportError::RateLimited { retry_after: None },
            Some(status) => TransportError::Http { status, message },
            None => TransportError::Other(message),
        }
    }
}

/// HTTP status of a rate limited request.
const TOO_MANY_REQUESTS: u16 = 429;

/// HTTP status of a request with a bad token.
const UNAUTHORIZED: u16 = 401;

/// Why a single extension failed to load.
#[derive(Error, Debug)]
pub enum ExtensionError {
    #[error("Could not read manifest: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed manifest: {reason}")]
    Manifest { reason: String },

    #[error("No extension module named '{name}'")]
    UnknownModule { name: String },

    #[error("Module '{module}' has no command named '{command}'")]
    UnknownCommand { module: String, command: String },
}

/// Failures that end the process during startup.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Invalid token! Please check config.toml")]
    LoginFailure,

    #[error("Missing privileged intents. Enable them in the Discord Developer Portal")]
    PrivilegedIntentsRequired,

    #[error("Fatal startup error: {0}")]
    Fatal(serenity::prelude::SerenityError),
}

impl From<serenity::prelude::SerenityError> for StartupError {
    fn from(error: serenity::prelude::SerenityError) -> Self {
        use serenity::GatewayError;

        match error {
            serenity::prelude::SerenityError::Gateway(GatewayError::InvalidAuthentication) => {
                StartupError::LoginFailure
            }
            serenity::prelude::SerenityError::Gateway(
                GatewayError::DisallowedGatewayIntents | GatewayError::InvalidGatewayIntents,
            ) => StartupError::PrivilegedIntentsRequired,
            serenity::prelude::SerenityError::Http(ref http_error)
                if is_unauthorized(http_error.status_code().map(|status| status.as_u16())) =>
            {
                StartupError::LoginFailure
            }
            other => StartupError::Fatal(other),
        }
    }
}

/// A rejected token shows up as a 401 on the first HTTP call.
fn is_unauthorized(status: Option<u16>) -> bool {
    status == Some(UNAUTHORIZED)
}

/// Errors that are shown to the user of a command.
#[derive(Error, Debug)]
pub enum UserError {
    #[error("Could not understand '{}'.", input.as_deref().unwrap_or(""))]
    BadArgs { input: Option<String> },

    #[error("Slow down! Try again in {:.1}s.", remaining_cooldown.as_secs_f32())]
    OnCooldown { remaining_cooldown: Duration },

    #[error("Only bot owners can use this command.")]
    NotOwner,
}
