use std::path::{Path, PathBuf};
use std::time::Duration;

use config::Config;
use serde::Deserialize;

use crate::ai_backend::BackendKind;
use crate::constants::{
    APP_NAME, DEFAULT_CONFIG_CONTENT, DEFAULT_ECHO_PREFIX, DEFAULT_EXECUTABLE,
    DEFAULT_REPLY_DELAY_MS, DEFAULT_VERBOSITY, ENV_PREFIX,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub verbosity: Option<String>,
    pub backend: BackendKind,
    pub cli: CliSettings,
    pub chat: ChatSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CliSettings {
    pub executable: PathBuf,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatSettings {
    pub reply_delay_ms: u64,
    pub echo_prefix: String,
}

impl CliSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl ChatSettings {
    pub fn reply_delay(&self) -> Duration {
        Duration::from_millis(self.reply_delay_ms)
    }
}

impl Settings {
    /// Loads settings from the per-user config file, writing a default one on first run.
    pub fn new() -> Result<Self, config::ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        if !config_path.exists() {
            std::fs::write(&config_path, DEFAULT_CONFIG_CONTENT).ok();
        }

        Self::load(&config_path)
    }

    /// `<config_dir>/cli-chat/config.toml`, or `./config.toml` when there is no config dir.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|mut path| {
                path.push(APP_NAME);
                path.push("config.toml");
                path
            })
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    pub fn load(config_path: &Path) -> Result<Self, config::ConfigError> {
        Self::load_with_env(config_path, Self::environment())
    }

    /// `CLI_CHAT_` prefix, `__` between nested keys: `CLI_CHAT_CLI__MODEL` sets `cli.model`.
    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn load_with_env(
        config_path: &Path,
        environment: config::Environment,
    ) -> Result<Self, config::ConfigError> {
        let settings = Config::builder()
            .add_source(config::File::from(config_path).required(false))
            .add_source(environment)
            .set_default("verbosity", DEFAULT_VERBOSITY)?
            .set_default("backend", "echo")?
            .set_default("cli.executable", DEFAULT_EXECUTABLE)?
            .set_default("chat.reply_delay_ms", DEFAULT_REPLY_DELAY_MS as i64)?
            .set_default("chat.echo_prefix", DEFAULT_ECHO_PREFIX)?
            .build()?;

        settings.try_deserialize()
    }
}
