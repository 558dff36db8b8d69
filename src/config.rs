use chrono::TimeDelta;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::fs_util::default_state_dir;

/// Top-level configuration loaded from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReflexConfig {
    pub react: ReactConfig,
    pub bot: BotConfig,
    pub storage: StorageConfig,
}

/// Tuning for the term store, matcher and throttle.
#[derive(Debug, Clone, Deserialize)]
pub struct ReactConfig {
    /// Maximum number of taught responses.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_throttle_cooldown_secs")]
    pub throttle_cooldown_secs: u64,
    #[serde(default = "default_load_timeout_ms")]
    pub load_timeout_ms: u64,
    #[serde(default = "default_reaction_delay_ms")]
    pub reaction_delay_ms: u64,
}

impl Default for ReactConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            throttle_cooldown_secs: default_throttle_cooldown_secs(),
            load_timeout_ms: default_load_timeout_ms(),
            reaction_delay_ms: default_reaction_delay_ms(),
        }
    }
}

impl ReactConfig {
    pub fn cooldown(&self) -> TimeDelta {
        i64::try_from(self.throttle_cooldown_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn reaction_delay(&self) -> Duration {
        Duration::from_millis(self.reaction_delay_ms)
    }
}

fn default_capacity() -> usize {
    200
}
fn default_throttle_cooldown_secs() -> u64 {
    300
}
fn default_load_timeout_ms() -> u64 {
    10_000
}
fn default_reaction_delay_ms() -> u64 {
    3_000
}

/// Chat-facing settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Name the bot answers to in the mention prefix.
    #[serde(default = "default_bot_name")]
    pub name: String,
    pub nats_url: Option<String>,
    #[serde(default = "default_inbound_subject")]
    pub inbound_subject: String,
    #[serde(default = "default_outbound_subject")]
    pub outbound_subject: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            nats_url: None,
            inbound_subject: default_inbound_subject(),
            outbound_subject: default_outbound_subject(),
        }
    }
}

fn default_bot_name() -> String {
    "reflex".into()
}
fn default_inbound_subject() -> String {
    "reflex.in".into()
}
fn default_outbound_subject() -> String {
    "reflex.out".into()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// Directory for brain blobs. Defaults to `~/.reflex/brain`.
    pub dir: Option<String>,
}

impl StorageConfig {
    pub fn brain_dir(&self) -> PathBuf {
        match &self.dir {
            Some(dir) => PathBuf::from(dir),
            None => default_state_dir().join("brain"),
        }
    }
}

/// Load configuration from file or use defaults, then apply environment
/// overrides.
///
/// Search order:
/// 1. `REFLEX_CONFIG` env var
/// 2. `~/.reflex/config.toml`
/// 3. Zero-config defaults (no file needed)
pub fn load() -> anyhow::Result<ReflexConfig> {
    let path = config_path();

    let mut config = if path.exists() {
        let config = load_from(&path)?;
        info!("loaded config from {}", path.display());
        config
    } else {
        info!("no config file found, using zero-config defaults");
        ReflexConfig::default()
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate(&config)?;
    Ok(config)
}

/// Parse a TOML config file without environment overrides.
pub fn load_from(path: &Path) -> anyhow::Result<ReflexConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    toml::from_str(&content).map_err(|e| anyhow::anyhow!("invalid config at {}: {e}", path.display()))
}

fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("REFLEX_CONFIG") {
        return PathBuf::from(path);
    }
    default_state_dir().join("config.toml")
}

/// Apply `REFLEX_*` overrides using `lookup` to read variables.
pub fn apply_env_overrides(
    config: &mut ReflexConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(value) = lookup("REFLEX_STORE_SIZE") {
        config.react.capacity = parse_var("REFLEX_STORE_SIZE", &value)?;
    }
    if let Some(value) = lookup("REFLEX_THROTTLE_COOLDOWN") {
        config.react.throttle_cooldown_secs = parse_var("REFLEX_THROTTLE_COOLDOWN", &value)?;
    }
    if let Some(value) = lookup("REFLEX_LOAD_TIMEOUT_MS") {
        config.react.load_timeout_ms = parse_var("REFLEX_LOAD_TIMEOUT_MS", &value)?;
    }
    if let Some(value) = lookup("REFLEX_REACTION_DELAY_MS") {
        config.react.reaction_delay_ms = parse_var("REFLEX_REACTION_DELAY_MS", &value)?;
    }
    if let Some(value) = lookup("REFLEX_BOT_NAME") {
        config.bot.name = value;
    }
    if let Some(value) = lookup("REFLEX_NATS_URL") {
        config.bot.nats_url = Some(value);
    }
    if let Some(value) = lookup("REFLEX_STATE_DIR") {
        config.storage.dir = Some(value);
    }
    Ok(())
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid {name}={value:?}: {e}"))
}

/// Validate the config and return clear error messages.
pub fn validate(config: &ReflexConfig) -> anyhow::Result<()> {
    if config.react.capacity == 0 {
        anyhow::bail!("react.capacity must be > 0");
    }

    if config.bot.name.trim().is_empty() {
        anyhow::bail!("bot.name must not be empty");
    }

    if config.bot.inbound_subject == config.bot.outbound_subject {
        anyhow::bail!(
            "bot.inbound_subject and bot.outbound_subject must differ (both '{}')",
            config.bot.inbound_subject
        );
    }

    Ok(())
}
