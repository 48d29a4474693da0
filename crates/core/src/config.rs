use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::orchestration::ExecutionStrategy;

pub const DEFAULT_COLLABORATIVE_INTENTS: &[&str] =
    &["complex-analysis", "multi-step", "research-and-create", "analyze-and-publish"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub routing: RoutingConfig,
    pub orchestration: OrchestrationConfig,
    pub handoff: HandoffConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutingConfig {
    /// Intent types that justify a multi-agent plan when several agents match.
    pub collaborative_intents: BTreeSet<String>,
    /// Route to a matching coming-soon agent instead of foundation.
    pub announce_coming_soon: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrchestrationConfig {
    pub default_strategy: ExecutionStrategy,
    /// Per-step budget in milliseconds. Zero disables the timeout.
    pub step_timeout_ms: u64,
    pub estimated_step_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandoffConfig {
    pub history_limit: u32,
    /// Extra `agent id -> specialty` entries layered over the built-in table.
    pub specialties: BTreeMap<String, String>,
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
    pub default_strategy: Option<ExecutionStrategy>,
    pub step_timeout_ms: Option<u64>,
    pub announce_coming_soon: Option<bool>,
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

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            collaborative_intents: DEFAULT_COLLABORATIVE_INTENTS
                .iter()
                .map(|intent| (*intent).to_owned())
                .collect(),
            announce_coming_soon: false,
        }
    }
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            default_strategy: ExecutionStrategy::Sequential,
            step_timeout_ms: 0,
            estimated_step_ms: 2_000,
        }
    }
}

impl OrchestrationConfig {
    pub fn step_timeout(&self) -> Option<Duration> {
        (self.step_timeout_ms > 0).then(|| Duration::from_millis(self.step_timeout_ms))
    }

    pub fn estimated_step(&self) -> Duration {
        Duration::from_millis(self.estimated_step_ms)
    }
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self { history_limit: 50, specialties: BTreeMap::new() }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://switchboard.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            routing: RoutingConfig::default(),
            orchestration: OrchestrationConfig::default(),
            handoff: HandoffConfig::default(),
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
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
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("switchboard.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(routing) = patch.routing {
            if let Some(intents) = routing.collaborative_intents {
                self.routing.collaborative_intents = intents.into_iter().collect();
            }
            if let Some(announce) = routing.announce_coming_soon {
                self.routing.announce_coming_soon = announce;
            }
        }

        if let Some(orchestration) = patch.orchestration {
            if let Some(strategy) = orchestration.default_strategy {
                self.orchestration.default_strategy = strategy;
            }
            if let Some(step_timeout_ms) = orchestration.step_timeout_ms {
                self.orchestration.step_timeout_ms = step_timeout_ms;
            }
            if let Some(estimated_step_ms) = orchestration.estimated_step_ms {
                self.orchestration.estimated_step_ms = estimated_step_ms;
            }
        }

        if let Some(handoff) = patch.handoff {
            if let Some(history_limit) = handoff.history_limit {
                self.handoff.history_limit = history_limit;
            }
            if let Some(specialties) = handoff.specialties {
                self.handoff.specialties.extend(specialties);
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SWITCHBOARD_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("SWITCHBOARD_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("SWITCHBOARD_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("SWITCHBOARD_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("SWITCHBOARD_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SWITCHBOARD_ROUTING_COLLABORATIVE_INTENTS") {
            self.routing.collaborative_intents = value
                .split(',')
                .map(str::trim)
                .filter(|intent| !intent.is_empty())
                .map(str::to_owned)
                .collect();
        }
        if let Some(value) = read_env("SWITCHBOARD_ROUTING_ANNOUNCE_COMING_SOON") {
            self.routing.announce_coming_soon =
                parse_bool("SWITCHBOARD_ROUTING_ANNOUNCE_COMING_SOON", &value)?;
        }

        if let Some(value) = read_env("SWITCHBOARD_ORCHESTRATION_DEFAULT_STRATEGY") {
            self.orchestration.default_strategy = ExecutionStrategy::parse(&value).ok_or_else(
                || ConfigError::InvalidEnvOverride {
                    key: "SWITCHBOARD_ORCHESTRATION_DEFAULT_STRATEGY".to_string(),
                    value: value.clone(),
                },
            )?;
        }
        if let Some(value) = read_env("SWITCHBOARD_ORCHESTRATION_STEP_TIMEOUT_MS") {
            self.orchestration.step_timeout_ms =
                parse_u64("SWITCHBOARD_ORCHESTRATION_STEP_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = read_env("SWITCHBOARD_ORCHESTRATION_ESTIMATED_STEP_MS") {
            self.orchestration.estimated_step_ms =
                parse_u64("SWITCHBOARD_ORCHESTRATION_ESTIMATED_STEP_MS", &value)?;
        }

        if let Some(value) = read_env("SWITCHBOARD_HANDOFF_HISTORY_LIMIT") {
            self.handoff.history_limit = parse_u32("SWITCHBOARD_HANDOFF_HISTORY_LIMIT", &value)?;
        }

        if let Some(value) = read_env("SWITCHBOARD_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SWITCHBOARD_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port =
                parse_u16("SWITCHBOARD_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("SWITCHBOARD_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("SWITCHBOARD_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("SWITCHBOARD_LOGGING_LEVEL").or_else(|| read_env("SWITCHBOARD_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SWITCHBOARD_LOGGING_FORMAT").or_else(|| read_env("SWITCHBOARD_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(strategy) = overrides.default_strategy {
            self.orchestration.default_strategy = strategy;
        }
        if let Some(step_timeout_ms) = overrides.step_timeout_ms {
            self.orchestration.step_timeout_ms = step_timeout_ms;
        }
        if let Some(announce) = overrides.announce_coming_soon {
            self.routing.announce_coming_soon = announce;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_routing(&self.routing)?;
        validate_orchestration(&self.orchestration)?;
        validate_handoff(&self.handoff)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("switchboard.toml"), PathBuf::from("config/switchboard.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_routing(routing: &RoutingConfig) -> Result<(), ConfigError> {
    if routing.collaborative_intents.iter().any(|intent| intent.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "routing.collaborative_intents must not contain empty intent types".to_string(),
        ));
    }

    Ok(())
}

fn validate_orchestration(orchestration: &OrchestrationConfig) -> Result<(), ConfigError> {
    if orchestration.estimated_step_ms == 0 {
        return Err(ConfigError::Validation(
            "orchestration.estimated_step_ms must be greater than zero".to_string(),
        ));
    }

    if orchestration.step_timeout_ms > 600_000 {
        return Err(ConfigError::Validation(
            "orchestration.step_timeout_ms must be in range 0..=600000 (0 disables it)"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_handoff(handoff: &HandoffConfig) -> Result<(), ConfigError> {
    if handoff.history_limit == 0 || handoff.history_limit > 1_000 {
        return Err(ConfigError::Validation(
            "handoff.history_limit must be in range 1..=1000".to_string(),
        ));
    }

    if let Some((agent_id, _)) = handoff
        .specialties
        .iter()
        .find(|(agent_id, specialty)| agent_id.trim().is_empty() || specialty.trim().is_empty())
    {
        return Err(ConfigError::Validation(format!(
            "handoff.specialties entry `{agent_id}` must have a non-empty agent id and specialty"
        )));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    routing: Option<RoutingPatch>,
    orchestration: Option<OrchestrationPatch>,
    handoff: Option<HandoffPatch>,
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
struct RoutingPatch {
    collaborative_intents: Option<Vec<String>>,
    announce_coming_soon: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct OrchestrationPatch {
    default_strategy: Option<ExecutionStrategy>,
    step_timeout_ms: Option<u64>,
    estimated_step_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct HandoffPatch {
    history_limit: Option<u32>,
    specialties: Option<BTreeMap<String, String>>,
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

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
    use crate::domain::orchestration::ExecutionStrategy;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_match_routing_contract() -> Result<(), String> {
        let config = AppConfig::default();

        ensure(config.routing.collaborative_intents.len() == 4, "four collaborative intents")?;
        ensure(
            config.routing.collaborative_intents.contains("analyze-and-publish"),
            "analyze-and-publish should be collaborative",
        )?;
        ensure(!config.routing.announce_coming_soon, "coming-soon routing is opt-in")?;
        ensure(
            config.orchestration.default_strategy == ExecutionStrategy::Sequential,
            "sequential is the default strategy",
        )?;
        ensure(config.orchestration.step_timeout().is_none(), "no step timeout by default")?;
        ensure(
            config.orchestration.estimated_step() == Duration::from_secs(2),
            "two seconds per step estimate",
        )?;
        ensure(config.handoff.history_limit == 50, "history limit defaults to 50")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_SWITCHBOARD_DB", "sqlite://interpolated.db");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("switchboard.toml");
            fs::write(
                &path,
                r#"
[database]
url = "${TEST_SWITCHBOARD_DB}"

[handoff]
history_limit = 20

[handoff.specialties]
"billing-agent" = "invoices and refunds"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://interpolated.db",
                "database url should be interpolated from environment",
            )?;
            ensure(config.handoff.history_limit == 20, "history limit should come from file")?;
            ensure(
                config.handoff.specialties.get("billing-agent").map(String::as_str)
                    == Some("invoices and refunds"),
                "specialty entries should be loaded from file",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_SWITCHBOARD_DB"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SWITCHBOARD_LOG_LEVEL", "warn");
        env::set_var("SWITCHBOARD_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["SWITCHBOARD_LOG_LEVEL", "SWITCHBOARD_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SWITCHBOARD_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("SWITCHBOARD_ORCHESTRATION_DEFAULT_STRATEGY", "parallel");
        env::set_var("SWITCHBOARD_ROUTING_COLLABORATIVE_INTENTS", "multi-step, triage");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("switchboard.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[orchestration]
default_strategy = "hybrid"
step_timeout_ms = 1500

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.orchestration.default_strategy == ExecutionStrategy::Parallel,
                "env strategy should win over file",
            )?;
            ensure(
                config.orchestration.step_timeout() == Some(Duration::from_millis(1500)),
                "file step timeout should survive when env is silent",
            )?;
            ensure(
                config.routing.collaborative_intents.contains("triage")
                    && config.routing.collaborative_intents.len() == 2,
                "env collaborative intents should replace defaults",
            )?;
            Ok(())
        })();

        clear_vars(&[
            "SWITCHBOARD_DATABASE_URL",
            "SWITCHBOARD_ORCHESTRATION_DEFAULT_STRATEGY",
            "SWITCHBOARD_ROUTING_COLLABORATIVE_INTENTS",
        ]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SWITCHBOARD_HANDOFF_HISTORY_LIMIT", "0");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("handoff.history_limit")
            );
            ensure(has_message, "validation failure should mention handoff.history_limit")
        })();

        clear_vars(&["SWITCHBOARD_HANDOFF_HISTORY_LIMIT"]);
        result
    }

    #[test]
    fn invalid_strategy_env_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SWITCHBOARD_ORCHESTRATION_DEFAULT_STRATEGY", "round-robin");

        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::InvalidEnvOverride { key, .. }) => ensure(
                key == "SWITCHBOARD_ORCHESTRATION_DEFAULT_STRATEGY",
                "error should name the strategy variable",
            ),
            Err(other) => Err(format!("unexpected error: {other}")),
            Ok(_) => Err("unknown strategy should be rejected".to_string()),
        };

        clear_vars(&["SWITCHBOARD_ORCHESTRATION_DEFAULT_STRATEGY"]);
        result
    }
}
