use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const TOOLCHAT_DIR: &str = ".toolchat";

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. You can tell jokes about the weather.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
        }
    }
}

impl RetryConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: f64,
    pub system_prompt: String,
    pub max_tool_calls: usize,
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            provider: None,
            api_key: String::new(),
            base_url: None,
            model: None,
            temperature: 1.0,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tool_calls: 10,
            retry: RetryConfig::default(),
        }
    }
}

pub fn get_toolchat_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(TOOLCHAT_DIR)
}

pub fn get_config_path() -> PathBuf {
    get_toolchat_dir().join("config.toml")
}

impl Config {
    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            load_config(path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Config::default())
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", path.display()))?;

    if config.max_tool_calls == 0 {
        anyhow::bail!(
            "Invalid config in {}: max_tool_calls must be at least 1",
            path.display()
        );
    }

    Ok(config)
}

pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let content =
        toml::to_string_pretty(config).with_context(|| "Failed to serialize config to TOML")?;

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load_or_default(&tmp.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.max_tool_calls, 10);
        assert_eq!(config.system_prompt, DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            "provider = \"ollama\"\nmodel = \"llama3.2\"\n\n[retry]\nmax_retries = 1\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.provider.as_deref(), Some("ollama"));
        assert_eq!(config.model.as_deref(), Some("llama3.2"));
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.retry.initial_backoff_ms, 500);
        assert_eq!(config.max_tool_calls, 10);
    }

    #[test]
    fn zero_tool_calls_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "max_tool_calls = 0\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn malformed_file_reports_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "provider = [").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn save_then_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("config.toml");
        let config = Config {
            provider: Some("gemini".into()),
            max_tool_calls: 4,
            ..Config::default()
        };
        save_config(&config, &path).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);
    }
}
