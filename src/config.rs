// File: ./src/config.rs
// Handles configuration loading, saving, and defaults.
use crate::context::AppContext;
use crate::storage::LocalStorage;
use anyhow::{Error, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

fn default_retention_days() -> i64 {
    30
}
fn default_time() -> String {
    "09:00".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}
fn default_fallback_model() -> String {
    "gemini-pro".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_concurrency() -> usize {
    4
}
fn default_temperature() -> f32 {
    0.3
}
fn default_top_k() -> u32 {
    40
}
fn default_top_p() -> f32 {
    0.95
}
fn default_max_output_tokens() -> u32 {
    1024
}

fn default_event_duration() -> u32 {
    60
}
fn default_duplicate_window() -> u32 {
    1
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct RemoteConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_fallback_model")]
    pub fallback_model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Only ask the remote service about messages the local extractor found an event in.
    #[serde(default)]
    pub selective: bool,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            base_url: default_base_url(),
            model: default_model(),
            fallback_model: default_fallback_model(),
            timeout_secs: 30,
            selective: false,
            concurrency: 4,
            temperature: 0.3,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
        }
    }
}

impl RemoteConfig {
    /// The configured key, or the `GEMINI_API_KEY` environment variable when none is set.
    pub fn resolved_api_key(&self) -> Option<String> {
        if !self.api_key.trim().is_empty() {
            return Some(self.api_key.trim().to_string());
        }
        std::env::var(API_KEY_ENV)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct CalendarConfig {
    #[serde(default = "default_event_duration")]
    pub event_duration_mins: u32,
    #[serde(default = "default_duplicate_window")]
    pub duplicate_window_mins: u32,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            event_duration_mins: 60,
            duplicate_window_mins: 1,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Config {
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    #[serde(default = "default_time")]
    pub default_time: String, // Format "HH:MM"
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retention_days: 30,
            default_time: "09:00".to_string(),
            log_file: None,
            remote: RemoteConfig::default(),
            calendar: CalendarConfig::default(),
        }
    }
}

impl Config {
    /// Reads `config.toml` from the context's config directory.
    pub fn load(ctx: &dyn AppContext) -> Result<Self> {
        let path = ctx.get_config_file_path()?;
        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found"));
        }
        let contents = fs::read_to_string(&path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;
        toml::from_str(&contents).map_err(|e| {
            anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e)
        })
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(ctx: &dyn AppContext) -> Result<Self> {
        match Self::load(ctx) {
            Ok(config) => Ok(config),
            Err(e) if Self::is_missing_config_error(&e) => {
                log::debug!("No config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// True when `err` means there was no config file to read.
    pub fn is_missing_config_error(err: &Error) -> bool {
        if err.to_string().contains("Config file not found") {
            return true;
        }

        err.chain().any(|cause| {
            cause
                .downcast_ref::<std::io::Error>()
                .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
        })
    }

    pub fn save(&self, ctx: &dyn AppContext) -> Result<()> {
        let path = ctx.get_config_file_path()?;
        LocalStorage::with_lock(&path, || {
            let toml_str = toml::to_string_pretty(self)?;
            LocalStorage::atomic_write(&path, toml_str)?;
            Ok(())
        })?;
        Ok(())
    }

    /// The normalizer's fallback time. An unreadable value falls back to 09:00.
    pub fn fallback_time(&self) -> NaiveTime {
        NaiveTime::parse_from_str(self.default_time.trim(), "%H:%M").unwrap_or_else(|_| {
            log::warn!(
                "Invalid default_time '{}' in config, using 09:00",
                self.default_time
            );
            NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TestContext;

    #[test]
    fn test_partial_file_uses_defaults_for_missing_keys() {
        let config: Config = toml::from_str(
            r#"
retention_days = 14

[remote]
enabled = true
model = "gemini-2.0-flash"
"#,
        )
        .unwrap();
        assert_eq!(config.retention_days, 14);
        assert_eq!(config.default_time, "09:00");
        assert!(config.remote.enabled);
        assert_eq!(config.remote.model, "gemini-2.0-flash");
        assert_eq!(config.remote.fallback_model, "gemini-pro");
        assert_eq!(config.remote.concurrency, 4);
        assert_eq!(config.calendar, CalendarConfig::default());
    }

    #[test]
    fn test_missing_file_and_roundtrip() {
        let ctx = TestContext::new();
        let err = Config::load(&ctx).unwrap_err();
        assert!(Config::is_missing_config_error(&err));
        assert_eq!(Config::load_or_default(&ctx).unwrap(), Config::default());

        let mut config = Config::default();
        config.default_time = "18:30".to_string();
        config.calendar.event_duration_mins = 90;
        config.save(&ctx).unwrap();

        let loaded = Config::load(&ctx).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.fallback_time(), NaiveTime::from_hms_opt(18, 30, 0).unwrap());
    }

    #[test]
    fn test_syntax_error_names_the_file() {
        let ctx = TestContext::new();
        let path = ctx.get_config_file_path().unwrap();
        fs::write(&path, "retention_days = [").unwrap();
        let err = Config::load(&ctx).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
        assert!(!Config::is_missing_config_error(&err));
    }
}
