use anyhow::{bail, Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::constants::{capture, inference, worker};

pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const SEARCH_VAR: &str = "GOOGLE_SEARCH";
pub const NINJA_VAR: &str = "NINJA_MODE_DEFAULT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set; add it to .env or the environment")]
    ConfigurationMissing(&'static str),
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub indicator: IndicatorConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CaptureConfig {
    #[serde(default = "default_folder")]
    pub folder: PathBuf,
    #[serde(default = "default_cooldown")]
    pub cooldown_ms: u64,
    #[serde(default = "default_stability_delay")]
    pub stability_delay_ms: u64,
    #[serde(default = "default_hotkey")]
    pub hotkey: String,
    #[serde(default = "default_mouse_button")]
    pub mouse_button: u8,
    #[serde(default)]
    pub delete_after_processing: bool,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_folder() -> PathBuf {
    PathBuf::from(capture::DEFAULT_FOLDER)
}

fn default_cooldown() -> u64 {
    capture::DEFAULT_COOLDOWN_MS
}

fn default_stability_delay() -> u64 {
    capture::DEFAULT_STABILITY_DELAY_MS
}

fn default_hotkey() -> String {
    capture::DEFAULT_HOTKEY.to_string()
}

fn default_mouse_button() -> u8 {
    capture::DEFAULT_MOUSE_BUTTON
}

fn default_queue_capacity() -> usize {
    worker::MAX_PENDING_CAPTURES
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            folder: default_folder(),
            cooldown_ms: default_cooldown(),
            stability_delay_ms: default_stability_delay(),
            hotkey: default_hotkey(),
            mouse_button: default_mouse_button(),
            delete_after_processing: false,
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl CaptureConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn stability_delay(&self) -> Duration {
        Duration::from_millis(self.stability_delay_ms)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_model")]
    pub name: String,
    #[serde(default)]
    pub search_grounding: bool,
    /// Replaces the built-in instruction prompt when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

fn default_model() -> String {
    inference::DEFAULT_MODEL.to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            name: default_model(),
            search_grounding: false,
            prompt: None,
        }
    }
}

impl ModelConfig {
    pub fn prompt(&self) -> &str {
        self.prompt.as_deref().unwrap_or(inference::PROMPT)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct IndicatorConfig {
    #[serde(default)]
    pub ninja_mode: bool,
}

/// `true`, `1`, `t`, `y`, `yes` (any case) are true; everything else is false.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "t" | "y" | "yes"
    )
}

impl Config {
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home.join(".tarca"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("settings.yaml"))
    }

    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            let config = Self::from_yaml(&contents)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            info!("Created default config at: {}", config_path.display());
            Ok(config)
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(contents)
            .context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `GOOGLE_SEARCH` and `NINJA_MODE_DEFAULT` on top of the file settings.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(SEARCH_VAR) {
            self.model.search_grounding = parse_flag(&value);
        }
        if let Some(value) = lookup(NINJA_VAR) {
            self.indicator.ninja_mode = parse_flag(&value);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.capture.cooldown_ms == 0 {
            bail!("cooldown_ms must be greater than 0");
        }
        if self.capture.cooldown_ms > 60_000 {
            bail!("cooldown_ms must be <= 60000 (60 seconds)");
        }

        if self.capture.stability_delay_ms > 10_000 {
            bail!("stability_delay_ms must be <= 10000 (10 seconds)");
        }

        if self.capture.folder.as_os_str().is_empty() {
            bail!("capture folder cannot be empty");
        }

        if self.capture.hotkey.trim().is_empty() {
            bail!("capture hotkey cannot be empty");
        }

        if self.capture.queue_capacity == 0 {
            bail!("queue_capacity must be greater than 0");
        }

        if self.model.name.trim().is_empty() {
            bail!("model name cannot be empty");
        }

        if self.model.prompt.as_deref().is_some_and(|p| p.trim().is_empty()) {
            bail!("model prompt override cannot be blank");
        }

        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        let config_dir = Self::config_dir()?;
        fs::create_dir_all(&config_dir)
            .context("Failed to create config directory")?;

        let config_path = Self::config_path()?;
        let yaml = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs::write(&config_path, yaml)
            .context("Failed to write config file")?;

        Ok(())
    }
}

/// Pre-issued API credential, passed through untouched.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("api_key", &"<redacted>").finish()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(API_KEY_VAR) {
            Some(key) if !key.trim().is_empty() => Ok(Credentials {
                api_key: key.trim().to_string(),
            }),
            _ => Err(ConfigError::ConfigurationMissing(API_KEY_VAR)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.capture.folder, PathBuf::from("capturas"));
        assert_eq!(config.capture.cooldown(), Duration::from_secs(2));
        assert_eq!(config.capture.stability_delay(), Duration::from_millis(500));
        assert_eq!(config.capture.hotkey, "F2");
        assert!(!config.capture.delete_after_processing);
        assert_eq!(config.model.name, "gemini-2.5-flash");
        assert_eq!(config.model.prompt(), inference::PROMPT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config = Config::from_yaml("capture:\n  cooldown_ms: 750\nindicator:\n  ninja_mode: true\n")
            .unwrap();
        assert_eq!(config.capture.cooldown_ms, 750);
        assert_eq!(config.capture.stability_delay_ms, 500);
        assert!(config.indicator.ninja_mode);
        assert!(!config.model.search_grounding);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(Config::from_yaml("capture:\n  cooldown_ms: 0\n").is_err());
        assert!(Config::from_yaml("capture:\n  stability_delay_ms: 20000\n").is_err());
        assert!(Config::from_yaml("capture:\n  queue_capacity: 0\n").is_err());
        assert!(Config::from_yaml("model:\n  name: ''\n").is_err());
        assert!(Config::from_yaml("model:\n  prompt: '  '\n").is_err());
    }

    #[test]
    fn test_parse_flag() {
        for value in ["true", "TRUE", "1", "t", "Y", "yes", " yes "] {
            assert!(parse_flag(value), "{value} should be true");
        }
        for value in ["false", "0", "no", "", "on"] {
            assert!(!parse_flag(value), "{value} should be false");
        }
    }

    #[test]
    fn test_env_overrides_file_settings() {
        let mut config = Config::from_yaml("model:\n  search_grounding: true\n").unwrap();
        config.apply_env(env(&[(SEARCH_VAR, "false"), (NINJA_VAR, "yes")]));
        assert!(!config.model.search_grounding);
        assert!(config.indicator.ninja_mode);
    }

    #[test]
    fn test_env_absent_keeps_file_settings() {
        let mut config = Config::from_yaml("indicator:\n  ninja_mode: true\n").unwrap();
        config.apply_env(env(&[]));
        assert!(config.indicator.ninja_mode);
    }

    #[test]
    fn test_missing_credential() {
        assert!(matches!(
            Credentials::from_lookup(env(&[])),
            Err(ConfigError::ConfigurationMissing(API_KEY_VAR))
        ));
        assert!(Credentials::from_lookup(env(&[(API_KEY_VAR, "  ")])).is_err());

        let credentials = Credentials::from_lookup(env(&[(API_KEY_VAR, "abc123")])).unwrap();
        assert_eq!(credentials.api_key, "abc123");
        assert!(!format!("{:?}", credentials).contains("abc123"));
    }
}
