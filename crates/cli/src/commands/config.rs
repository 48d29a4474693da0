use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use switchboard_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_key: &str| {
        field_source(key_path, Some(env_key), config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let collaborative_intents =
        config.routing.collaborative_intents.iter().cloned().collect::<Vec<_>>().join(",");
    let specialties = if config.handoff.specialties.is_empty() {
        "<none>".to_string()
    } else {
        config.handoff.specialties.keys().cloned().collect::<Vec<_>>().join(",")
    };

    let entries: Vec<(&str, String, &str)> = vec![
        ("database.url", config.database.url.clone(), "SWITCHBOARD_DATABASE_URL"),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            "SWITCHBOARD_DATABASE_MAX_CONNECTIONS",
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            "SWITCHBOARD_DATABASE_TIMEOUT_SECS",
        ),
        (
            "routing.collaborative_intents",
            collaborative_intents,
            "SWITCHBOARD_ROUTING_COLLABORATIVE_INTENTS",
        ),
        (
            "routing.announce_coming_soon",
            config.routing.announce_coming_soon.to_string(),
            "SWITCHBOARD_ROUTING_ANNOUNCE_COMING_SOON",
        ),
        (
            "orchestration.default_strategy",
            config.orchestration.default_strategy.as_str().to_string(),
            "SWITCHBOARD_ORCHESTRATION_DEFAULT_STRATEGY",
        ),
        (
            "orchestration.step_timeout_ms",
            config.orchestration.step_timeout_ms.to_string(),
            "SWITCHBOARD_ORCHESTRATION_STEP_TIMEOUT_MS",
        ),
        (
            "orchestration.estimated_step_ms",
            config.orchestration.estimated_step_ms.to_string(),
            "SWITCHBOARD_ORCHESTRATION_ESTIMATED_STEP_MS",
        ),
        (
            "handoff.history_limit",
            config.handoff.history_limit.to_string(),
            "SWITCHBOARD_HANDOFF_HISTORY_LIMIT",
        ),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            "SWITCHBOARD_SERVER_BIND_ADDRESS",
        ),
        (
            "server.health_check_port",
            config.server.health_check_port.to_string(),
            "SWITCHBOARD_SERVER_HEALTH_CHECK_PORT",
        ),
        ("logging.level", config.logging.level.clone(), "SWITCHBOARD_LOGGING_LEVEL"),
        ("logging.format", format!("{:?}", config.logging.format), "SWITCHBOARD_LOGGING_FORMAT"),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, value, env_key) in entries {
        lines.push(render_line(key_path, &value, source(key_path, env_key)));
    }
    let specialties_source = field_source(
        "handoff.specialties",
        None,
        config_file_doc.as_ref(),
        config_file_path.as_deref(),
    );
    lines.push(render_line("handoff.specialties", &specialties, specialties_source));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("switchboard.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/switchboard.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
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
