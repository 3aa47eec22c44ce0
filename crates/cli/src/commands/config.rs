use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use tagbot_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let fields: Vec<(&str, &[&str], String)> = vec![
        ("database.url", &["TAGBOT_DATABASE_URL"], config.database.url.clone()),
        (
            "database.max_connections",
            &["TAGBOT_DATABASE_MAX_CONNECTIONS"],
            config.database.max_connections.to_string(),
        ),
        (
            "database.timeout_secs",
            &["TAGBOT_DATABASE_TIMEOUT_SECS"],
            config.database.timeout_secs.to_string(),
        ),
        (
            "slack.app_token",
            &["TAGBOT_SLACK_APP_TOKEN"],
            redact_token(config.slack.app_token.expose_secret()),
        ),
        (
            "slack.bot_token",
            &["TAGBOT_SLACK_BOT_TOKEN"],
            redact_token(config.slack.bot_token.expose_secret()),
        ),
        (
            "slack.bot_user_id",
            &["TAGBOT_SLACK_BOT_USER_ID"],
            config.slack.bot_user_id.clone().unwrap_or_else(|| "<unset>".to_string()),
        ),
        (
            "slack.help_channel",
            &["TAGBOT_SLACK_HELP_CHANNEL"],
            config.slack.help_channel.clone().unwrap_or_else(|| "<unset>".to_string()),
        ),
        (
            "matching.similarity_threshold",
            &["TAGBOT_MATCHING_SIMILARITY_THRESHOLD"],
            config.matching.similarity_threshold.to_string(),
        ),
        (
            "matching.min_fuzzy_len",
            &["TAGBOT_MATCHING_MIN_FUZZY_LEN"],
            config.matching.min_fuzzy_len.to_string(),
        ),
        (
            "matching.result_buffer",
            &["TAGBOT_MATCHING_RESULT_BUFFER"],
            config.matching.result_buffer.to_string(),
        ),
        ("server.bind_address", &["TAGBOT_SERVER_BIND_ADDRESS"], config.server.bind_address.clone()),
        (
            "server.health_check_port",
            &["TAGBOT_SERVER_HEALTH_CHECK_PORT"],
            config.server.health_check_port.to_string(),
        ),
        (
            "server.graceful_shutdown_secs",
            &["TAGBOT_SERVER_GRACEFUL_SHUTDOWN_SECS"],
            config.server.graceful_shutdown_secs.to_string(),
        ),
        (
            "logging.level",
            &["TAGBOT_LOGGING_LEVEL", "TAGBOT_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        (
            "logging.format",
            &["TAGBOT_LOGGING_FORMAT", "TAGBOT_LOG_FORMAT"],
            format!("{:?}", config.logging.format),
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, env_keys, value) in fields {
        let source =
            field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key_path, &value, source));
    }

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("tagbot.toml"), PathBuf::from("config/tagbot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
