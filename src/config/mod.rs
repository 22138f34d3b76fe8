use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

const CONFIG_FILENAME: &str = "config.toml";
const CONFIG_DIR: &str = ".arenabot";

fn default_base_url() -> String {
    "https://moltarena.crosstoken.io/api".to_string()
}

fn default_roster_file() -> String {
    "accounts.json".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_max_battle_wait_secs() -> u64 {
    600
}

fn default_cycle_interval_secs() -> u64 {
    300
}

fn default_account_delay_secs() -> [u64; 2] {
    [2, 5]
}

fn default_error_cooldown_secs() -> u64 {
    30
}

fn default_rounds() -> u32 {
    5
}

/// All knobs the bot recognizes. Everything has a default; the config file
/// is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_roster_file")]
    pub roster_file: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_battle_wait_secs")]
    pub max_battle_wait_secs: u64,
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,
    /// Uniform jitter range between accounts, `[low, high]` seconds.
    #[serde(default = "default_account_delay_secs")]
    pub account_delay_secs: [u64; 2],
    #[serde(default = "default_error_cooldown_secs")]
    pub error_cooldown_secs: u64,
    #[serde(default = "default_rounds")]
    pub rounds: u32,
    #[serde(default)]
    pub challenge_mode: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            roster_file: default_roster_file(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            poll_interval_secs: default_poll_interval_secs(),
            max_battle_wait_secs: default_max_battle_wait_secs(),
            cycle_interval_secs: default_cycle_interval_secs(),
            account_delay_secs: default_account_delay_secs(),
            error_cooldown_secs: default_error_cooldown_secs(),
            rounds: default_rounds(),
            challenge_mode: false,
        }
    }
}

impl BotConfig {
    /// Search upward from `start` for a `.arenabot/config.toml` file and
    /// load it. Returns the default config if no file is found.
    pub fn load(start: &Path) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = Self::find_config_file(start) {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let config: BotConfig = toml::from_str(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            Ok((config, Some(path)))
        } else {
            Ok((BotConfig::default(), None))
        }
    }

    fn find_config_file(start: &Path) -> Option<PathBuf> {
        let mut dir = start.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_DIR).join(CONFIG_FILENAME);
            if candidate.is_file() {
                return Some(candidate);
            }
            if !dir.pop() {
                return None;
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn max_battle_wait(&self) -> Duration {
        Duration::from_secs(self.max_battle_wait_secs)
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    pub fn error_cooldown(&self) -> Duration {
        Duration::from_secs(self.error_cooldown_secs)
    }

    pub fn mode_label(&self) -> &'static str {
        if self.challenge_mode {
            "challenge"
        } else {
            "auto match"
        }
    }
}
