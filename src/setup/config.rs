//! Configuration for running this bot.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use serenity::GuildId;

use crate::error::ConfigError;
use crate::presence::ActivityKind;
use crate::presence::PresenceDescriptor;
use crate::presence::Status;
use crate::serenity;

/// The path to the config file
pub const CONFIG_PATH: &str = "config.toml";

/// Settings read from [CONFIG_PATH] that modify bot behavior.
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Token needed to use a bot account.
    discord_token: String,

    /// See [BotConfig]
    bot: BotConfig,

    /// See [PresenceConfig]
    presence: PresenceConfig,

    /// See [LoggingConfig]
    logging: LoggingConfig,

    /// Useful developer specific configs.
    dev_utils: DevConfig,
}

impl Config {
    /// Tries to read [CONFIG_PATH] to extract a [Config].
    pub fn read() -> Result<Config, ConfigError> {
        Config::read_from(Path::new(CONFIG_PATH))
    }

    /// Tries to read `path` to extract a [Config].
    /// If a file doesn't exists, create the default config file and returns error.
    /// If a file exists but is empty, re-write the default values and return error.
    /// If a file exists but is incomplete, show error and don't change files.
    /// If a file exists and is complete, read file to create a config.
    /// If file existance is indeterminent (e.g. missing permissions), return error.
    pub fn read_from(path: &Path) -> Result<Config, ConfigError> {
        let file = std::fs::read_to_string(path);
        let shown = path.display();

        match file {
            // Config file found
            Ok(content) => {
                // Write default values to file if it's empty.
                if content.trim().is_empty() {
                    write_file(path, Config::default())?;
                    Err(ConfigError::InvalidConfig {
                        reason: format!("Empty config file! Rewriting {shown} ..."),
                    })
                } else {
                    Config::parse(&content)
                }
            }
            // File not found or other filesystem error
            Err(file_error) => {
                match file_error.kind() {
                    // If file doesn't exist, create default config file.
                    std::io::ErrorKind::NotFound => {
                        let action = format!("Creating {shown}...");
                        write_file(path, Config::default())?;
                        Err(ConfigError::MissingConfig { action_msg: action })
                    }
                    _ => Err(ConfigError::IoError(file_error)),
                }
            }
        }
    }

    /// Deserialize a config, describing the offending key on failure.
    fn parse(content: &str) -> Result<Config, ConfigError> {
        let to_toml = toml::Deserializer::new(content);
        let result: Result<Config, _> = serde_path_to_error::deserialize(to_toml);

        result.map_err(|error| ConfigError::InvalidConfig {
            reason: error.to_string(),
        })
    }

    /// Basic sanity check for if a token was given.
    pub fn token(&self) -> Result<&str, ConfigError> {
        let default_token = Config::default().discord_token;
        let given_token = self.discord_token.trim();

        let is_empty = given_token.is_empty();
        let contains_default = given_token.contains(&default_token);

        if !is_empty && !contains_default {
            Ok(given_token)
        } else {
            Err(ConfigError::InvalidConfig {
                reason: "Missing discord token".to_string(),
            })
        }
    }

    /// The text prefix for prefix commands.
    pub fn prefix(&self) -> &str {
        &self.bot.prefix
    }

    /// Directory scanned for extension manifests.
    pub fn extensions_dir(&self) -> &Path {
        Path::new(&self.bot.extensions_dir)
    }

    /// Push the command registry to discord during startup.
    pub fn auto_sync(&self) -> bool {
        self.bot.auto_sync
    }

    /// The presences cycled by the rotator, in order.
    pub fn activities(&self) -> &[PresenceDescriptor] {
        &self.presence.activities
    }

    /// Replace the presences to cycle through.
    #[cfg(test)]
    pub fn with_activities(mut self, activities: Vec<PresenceDescriptor>) -> Self {
        self.presence.activities = activities;
        self
    }

    /// Time between presence changes.
    pub fn presence_interval(&self) -> Duration {
        Duration::from_secs(self.presence.interval_secs.max(1))
    }

    /// Online status shown alongside the presence.
    pub fn presence_status(&self) -> Status {
        self.presence.status
    }

    /// Backoff used when a rate limit gives no delay.
    pub fn presence_backoff(&self) -> Duration {
        Duration::from_secs(self.presence.rate_limit_backoff_secs)
    }

    /// Getter for log_dir.
    pub fn log_dir(&self) -> &str {
        &self.logging.log_dir
    }

    /// Is debug mode enabled for console logs
    pub fn console_debug(&self) -> bool {
        self.logging.console_debug
    }

    /// Is file logging enabled.
    pub fn logs_enabled(&self) -> bool {
        self.logging.logs_enabled
    }

    pub fn dev_guild(&self) -> Option<GuildId> {
        self.dev_utils.dev_guild
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: "put_token_here".to_string(),

            bot: BotConfig {
                prefix: "n!".to_string(),
                extensions_dir: "extensions".to_string(),
                auto_sync: true,
            },

            presence: PresenceConfig {
                interval_secs: 15 * 60,
                status: Status::Dnd,
                rate_limit_backoff_secs: 60,
                activities: vec![
                    PresenceDescriptor::new(ActivityKind::Watching, "n!help | n!invite"),
                    PresenceDescriptor::new(ActivityKind::Playing, "Developed by ArkDevLabs"),
                    PresenceDescriptor::new(ActivityKind::Playing, "Join our support server!"),
                    PresenceDescriptor::new(ActivityKind::Playing, "Use n!stats to see my stats"),
                ],
            },

            logging: LoggingConfig {
                console_debug: false,
                logs_enabled: true,
                log_dir: "logs".to_string(),
            },

            dev_utils: DevConfig { dev_guild: None },
        }
    }
}

/// Core bot behavior.
#[derive(Debug, Serialize, Deserialize)]
struct BotConfig {
    /// Prefix for text commands, matched case-insensitively.
    prefix: String,
    /// Directory holding extension manifests.
    extensions_dir: String,
    /// Sync slash commands on startup.
    auto_sync: bool,
}

/// Rotating presence settings.
#[derive(Debug, Serialize, Deserialize)]
struct PresenceConfig {
    /// Seconds between presence changes.
    interval_secs: u64,
    /// Online status to display.
    status: Status,
    /// Fallback wait when rate limited without a delay.
    rate_limit_backoff_secs: u64,
    /// Presences to cycle through.
    activities: Vec<PresenceDescriptor>,
}

/// Configs for
#[derive(Debug, Serialize, Deserialize)]
struct LoggingConfig {
    /// Print debug traces to console?
    console_debug: bool,
    /// Enable writing to log file?
    logs_enabled: bool,
    /// Directory to store log files
    log_dir: String,
}

/// Optional configs to enable developer-specific behavior.
#[derive(Debug, Serialize, Deserialize)]
struct DevConfig {
    /// Optional guild to automatically update commands quickly.
    #[serde(serialize_with = "serialize_opt", deserialize_with = "deserialize_opt")]
    dev_guild: Option<GuildId>,
}

/// Write the given config to `path`.
fn write_file(path: &Path, config: Config) -> Result<(), ConfigError> {
    use std::fs::write;

    let content = toml::to_string_pretty(&config).expect("config serialization can't fail");
    write(path, content).map_err(ConfigError::IoError)
}

fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<GuildId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserializer.deserialize_str(OptVisitor)
}

fn serialize_opt<T, S>(val: &Option<T>, ser: S) -> Result<S::Ok, S::Error>
where
    T: serde::Serialize,
    S: serde::Serializer,
{
    match val {
        Some(v) => v.serialize(ser),
        None => ser.serialize_str(""),
    }
}

struct OptVisitor;

impl<'de> serde::de::Visitor<'de> for OptVisitor {
    type Value = Option<GuildId>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a valid guild id")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        match v {
            "" => Ok(None),
            _ => {
                let num: u64 = v.parse().map_err(|_| E::custom("not u64"))?;
                Ok(Some(GuildId::new(num)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_survives_toml() {
        let content = toml::to_string_pretty(&Config::default()).unwrap();
        let config = Config::parse(&content).unwrap();

        assert_eq!(config.prefix(), "n!");
        assert!(config.auto_sync());
        assert_eq!(config.activities().len(), 4);
        assert_eq!(config.presence_interval(), Duration::from_secs(900));
        assert_eq!(config.dev_guild(), None);
    }

    #[test]
    fn default_token_is_rejected() {
        assert!(Config::default().token().is_err());

        let config = Config {
            discord_token: "  abc.def.ghi ".to_string(),
            ..Default::default()
        };
        assert_eq!(config.token().unwrap(), "abc.def.ghi");
    }

    #[test]
    fn incomplete_config_names_the_missing_key() {
        let error = Config::parse("discord_token = \"x\"").unwrap_err();
        let ConfigError::InvalidConfig { reason } = error else {
            panic!("expected invalid config");
        };
        assert!(reason.contains("bot"), "{reason}");
    }

    #[test]
    fn missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let error = Config::read_from(&path).unwrap_err();
        assert!(matches!(error, ConfigError::MissingConfig { .. }));

        // The written defaults parse, but still need a real token.
        let config = Config::read_from(&path).unwrap();
        assert!(config.token().is_err());
    }

    #[test]
    fn dev_guild_parses_from_string() {
        let mut content = toml::to_string_pretty(&Config::default()).unwrap();
        content = content.replace("dev_guild = \"\"", "dev_guild = \"1234\"");
        let config = Config::parse(&content).unwrap();
        assert_eq!(config.dev_guild(), Some(GuildId::new(1234)));
    }
}
