use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resolution::dispatcher::DEFAULT_RESULT_BUFFER;
use crate::resolution::similarity::{DEFAULT_MIN_FUZZY_LEN, DEFAULT_SIMILARITY_THRESHOLD};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub slack: SlackConfig,
    pub matching: MatchingConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SlackConfig {
    pub app_token: SecretString,
    pub bot_token: SecretString,
    pub bot_user_id: Option<String>,
    pub help_channel: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchingConfig {
    pub similarity_threshold: f64,
    pub min_fuzzy_len: usize,
    pub result_buffer: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            min_fuzzy_len: DEFAULT_MIN_FUZZY_LEN,
            result_buffer: DEFAULT_RESULT_BUFFER,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub slack_app_token: Option<String>,
    pub slack_bot_token: Option<String>,
    pub slack_bot_user_id: Option<String>,
    pub similarity_threshold: Option<f64>,
    pub min_fuzzy_len: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://tagbot.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            slack: SlackConfig {
                app_token: String::new().into(),
                bot_token: String::new().into(),
                bot_user_id: None,
                help_channel: None,
            },
            matching: MatchingConfig::default(),
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    /// Defaults, then the TOML file, then `TAGBOT_*` variables, then `options.overrides`.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        match resolve_config_path(options.config_path.as_deref()) {
            Some(path) => config.apply_patch(read_patch(&path)?),
            None if options.require_file => {
                return Err(ConfigError::MissingConfigFile(
                    options.config_path.unwrap_or_else(|| PathBuf::from("tagbot.toml")),
                ));
            }
            None => {}
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        let database = patch.database.unwrap_or_default();
        merge(&mut self.database.url, database.url);
        merge(&mut self.database.max_connections, database.max_connections);
        merge(&mut self.database.timeout_secs, database.timeout_secs);

        let slack = patch.slack.unwrap_or_default();
        merge(&mut self.slack.app_token, slack.app_token.map(SecretString::from));
        merge(&mut self.slack.bot_token, slack.bot_token.map(SecretString::from));
        merge(&mut self.slack.bot_user_id, slack.bot_user_id.map(Some));
        merge(&mut self.slack.help_channel, slack.help_channel.map(Some));

        let matching = patch.matching.unwrap_or_default();
        merge(&mut self.matching.similarity_threshold, matching.similarity_threshold);
        merge(&mut self.matching.min_fuzzy_len, matching.min_fuzzy_len);
        merge(&mut self.matching.result_buffer, matching.result_buffer);

        let server = patch.server.unwrap_or_default();
        merge(&mut self.server.bind_address, server.bind_address);
        merge(&mut self.server.health_check_port, server.health_check_port);
        merge(&mut self.server.graceful_shutdown_secs, server.graceful_shutdown_secs);

        let logging = patch.logging.unwrap_or_default();
        merge(&mut self.logging.level, logging.level);
        merge(&mut self.logging.format, logging.format);
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        merge(&mut self.database.url, read_env("TAGBOT_DATABASE_URL"));
        merge(
            &mut self.database.max_connections,
            env_override("TAGBOT_DATABASE_MAX_CONNECTIONS")?,
        );
        merge(&mut self.database.timeout_secs, env_override("TAGBOT_DATABASE_TIMEOUT_SECS")?);

        let app_token = read_env("TAGBOT_SLACK_APP_TOKEN");
        merge(&mut self.slack.app_token, app_token.map(SecretString::from));
        let bot_token = read_env("TAGBOT_SLACK_BOT_TOKEN");
        merge(&mut self.slack.bot_token, bot_token.map(SecretString::from));
        merge(&mut self.slack.bot_user_id, read_env("TAGBOT_SLACK_BOT_USER_ID").map(Some));
        merge(&mut self.slack.help_channel, read_env("TAGBOT_SLACK_HELP_CHANNEL").map(Some));

        merge(
            &mut self.matching.similarity_threshold,
            env_override("TAGBOT_MATCHING_SIMILARITY_THRESHOLD")?,
        );
        merge(&mut self.matching.min_fuzzy_len, env_override("TAGBOT_MATCHING_MIN_FUZZY_LEN")?);
        merge(&mut self.matching.result_buffer, env_override("TAGBOT_MATCHING_RESULT_BUFFER")?);

        merge(&mut self.server.bind_address, read_env("TAGBOT_SERVER_BIND_ADDRESS"));
        merge(
            &mut self.server.health_check_port,
            env_override("TAGBOT_SERVER_HEALTH_CHECK_PORT")?,
        );
        merge(
            &mut self.server.graceful_shutdown_secs,
            env_override("TAGBOT_SERVER_GRACEFUL_SHUTDOWN_SECS")?,
        );

        // The short `TAGBOT_LOG_*` spellings are accepted as aliases.
        merge(
            &mut self.logging.level,
            read_env("TAGBOT_LOGGING_LEVEL").or_else(|| read_env("TAGBOT_LOG_LEVEL")),
        );
        if let Some(format) =
            read_env("TAGBOT_LOGGING_FORMAT").or_else(|| read_env("TAGBOT_LOG_FORMAT"))
        {
            self.logging.format = format.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        merge(&mut self.database.url, overrides.database_url);
        merge(&mut self.logging.level, overrides.log_level);
        merge(&mut self.slack.app_token, overrides.slack_app_token.map(SecretString::from));
        merge(&mut self.slack.bot_token, overrides.slack_bot_token.map(SecretString::from));
        merge(&mut self.slack.bot_user_id, overrides.slack_bot_user_id.map(Some));
        merge(&mut self.matching.similarity_threshold, overrides.similarity_threshold);
        merge(&mut self.matching.min_fuzzy_len, overrides.min_fuzzy_len);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.database.url.trim();
        require(
            url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:",
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)",
        )?;
        require(self.database.max_connections > 0, "database.max_connections must be at least 1")?;
        require(
            (1..=300).contains(&self.database.timeout_secs),
            "database.timeout_secs must be in range 1..=300",
        )?;

        validate_token(
            "slack.app_token",
            &self.slack.app_token,
            "xapp-",
            "xoxb-",
            "Basic Information > App-Level Tokens",
        )?;
        validate_token(
            "slack.bot_token",
            &self.slack.bot_token,
            "xoxb-",
            "xapp-",
            "OAuth & Permissions",
        )?;
        require(
            !self.slack.bot_user_id.as_deref().is_some_and(|id| id.trim().is_empty()),
            "slack.bot_user_id must not be blank when set",
        )?;

        let threshold = self.matching.similarity_threshold;
        require(
            threshold > 0.0 && threshold <= 1.0,
            "matching.similarity_threshold must be in range (0, 1]",
        )?;
        require(self.matching.min_fuzzy_len > 0, "matching.min_fuzzy_len must be at least 1")?;
        require(self.matching.result_buffer > 0, "matching.result_buffer must be at least 1")?;

        require(self.server.health_check_port > 0, "server.health_check_port must not be 0")?;
        require(
            self.server.graceful_shutdown_secs > 0,
            "server.graceful_shutdown_secs must be at least 1",
        )?;

        require(
            matches!(
                self.logging.level.trim().to_ascii_lowercase().as_str(),
                "trace" | "debug" | "info" | "warn" | "error"
            ),
            "logging.level must be one of trace|debug|info|warn|error",
        )
    }
}

fn merge<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn require(condition: bool, message: &str) -> Result<(), ConfigError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::Validation(message.to_string()))
    }
}

/// Slack tokens are typed by prefix; swapping the app and bot token is the usual mistake.
fn validate_token(
    key: &str,
    token: &SecretString,
    prefix: &str,
    other_prefix: &str,
    settings_page: &str,
) -> Result<(), ConfigError> {
    let token = token.expose_secret();
    if token.is_empty() {
        return Err(ConfigError::Validation(format!(
            "{key} is required. Find it at https://api.slack.com/apps > Your App > {settings_page}"
        )));
    }
    if token.starts_with(prefix) {
        return Ok(());
    }

    let hint = if token.starts_with(other_prefix) {
        format!(" (got a `{other_prefix}` token; the app and bot tokens look swapped)")
    } else {
        String::new()
    };
    Err(ConfigError::Validation(format!("{key} must start with `{prefix}`{hint}")))
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    match explicit_path {
        Some(path) => path.exists().then(|| path.to_path_buf()),
        None => [PathBuf::from("tagbot.toml"), PathBuf::from("config/tagbot.toml")]
            .into_iter()
            .find(|path| path.exists()),
    }
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    toml::from_str::<ConfigPatch>(&interpolate_env_vars(&raw)?)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Replaces every `${VAR}` with the value of `VAR`; unset variables are an error.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find("${") {
        output.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let close = after.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let var = &after[..close];
        let value = env::var(var)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.to_string() })?;
        output.push_str(&value);
        rest = &after[close + 1..];
    }
    output.push_str(rest);

    Ok(output)
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_override<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    read_env(key)
        .map(|value| {
            value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
                key: key.to_string(),
                value,
            })
        })
        .transpose()
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    slack: Option<SlackPatch>,
    matching: Option<MatchingPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SlackPatch {
    app_token: Option<String>,
    bot_token: Option<String>,
    bot_user_id: Option<String>,
    help_channel: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MatchingPatch {
    similarity_threshold: Option<f64>,
    min_fuzzy_len: Option<usize>,
    result_buffer: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
