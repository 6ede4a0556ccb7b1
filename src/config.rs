use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::bot::store::DEFAULT_CAPACITY;
use crate::generation::{GatewaySettings, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};

/// Config file used when none is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "codelaunch.json";

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("failed to read config file '{}': {source}", .path.display())]
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    #[error("failed to parse config file '{}': {source}", .path.display())]
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    #[error("config validation error: {0}")]
    Validation(String),
}

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    telegram_bot_token: String,
    /// Anthropic API key for code generation
    #[serde(default)]
    anthropic_api_key: String,
    model: Option<String>,
    max_tokens: Option<u32>,
    generation_timeout_secs: Option<u64>,
    /// Max chats kept in memory.
    session_capacity: Option<usize>,
    /// Directory for logs. Defaults to current directory.
    data_dir: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    /// Checked on the first generation call, not at startup.
    pub anthropic_api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub generation_timeout: Duration,
    pub session_capacity: usize,
    /// Directory for state files (logs).
    pub data_dir: PathBuf,
}

impl Config {
    /// Load from an optional JSON file, then apply process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Like [`Config::load`] with an injectable environment.
    ///
    /// Overrides: `TELEGRAM_BOT_TOKEN`, `ANTHROPIC_API_KEY`, `CODELAUNCH_MODEL`,
    /// `CODELAUNCH_DATA_DIR`. Empty variables are ignored.
    pub fn load_with_env<F>(path: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match path {
            Some(path) => {
                let config_path = path.to_path_buf();
                let content = std::fs::read_to_string(&config_path)
                    .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
                serde_json::from_str(&content)
                    .map_err(|e| ConfigError::ParseJson { path: config_path, source: e })?
            }
            None => ConfigFile::default(),
        };

        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let telegram_bot_token = env("TELEGRAM_BOT_TOKEN").unwrap_or(file.telegram_bot_token);
        if telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token is required (config file or TELEGRAM_BOT_TOKEN)".into(),
            ));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into(),
            ));
        }

        let anthropic_api_key = env("ANTHROPIC_API_KEY")
            .or(Some(file.anthropic_api_key))
            .filter(|k| !k.is_empty());

        let max_tokens = file.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
        if max_tokens == 0 {
            return Err(ConfigError::Validation("max_tokens must be positive".into()));
        }
        let timeout_secs = file.generation_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::Validation("generation_timeout_secs must be positive".into()));
        }
        let session_capacity = file.session_capacity.unwrap_or(DEFAULT_CAPACITY);
        if session_capacity == 0 {
            return Err(ConfigError::Validation("session_capacity must be positive".into()));
        }

        let data_dir = env("CODELAUNCH_DATA_DIR")
            .or(file.data_dir)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            telegram_bot_token,
            anthropic_api_key,
            model: env("CODELAUNCH_MODEL")
                .or(file.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens,
            generation_timeout: Duration::from_secs(timeout_secs),
            session_capacity,
            data_dir,
        })
    }

    pub fn gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            api_key: self.anthropic_api_key.clone(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            timeout: self.generation_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_valid_config() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdefGHIjklMNOpqrsTUVwxyz",
            "anthropic_api_key": "sk-test",
            "session_capacity": 50
        }"#);
        let config = Config::load_with_env(Some(file.path()), no_env).expect("should load valid config");
        assert_eq!(config.anthropic_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.session_capacity, 50);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.generation_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_env_only() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("TELEGRAM_BOT_TOKEN", "42:secret"),
            ("CODELAUNCH_MODEL", "claude-test"),
        ]);
        let config = Config::load_with_env(None, |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.telegram_bot_token, "42:secret");
        assert_eq!(config.model, "claude-test");
        assert!(config.anthropic_api_key.is_none());
    }

    #[test]
    fn test_env_overrides_file() {
        let file = write_config(r#"{ "telegram_bot_token": "1:file", "anthropic_api_key": "file-key" }"#);
        let config = Config::load_with_env(Some(file.path()), |k| match k {
            "ANTHROPIC_API_KEY" => Some("env-key".to_string()),
            "TELEGRAM_BOT_TOKEN" => Some("  ".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.anthropic_api_key.as_deref(), Some("env-key"));
        // Blank variables do not override.
        assert_eq!(config.telegram_bot_token, "1:file");
    }

    #[test]
    fn test_missing_token_fails_fast() {
        let err = assert_err(Config::load_with_env(None, no_env));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("telegram_bot_token"));
    }

    #[test]
    fn test_invalid_token_format_no_colon() {
        let file = write_config(r#"{ "telegram_bot_token": "invalid_token_no_colon" }"#);
        let err = assert_err(Config::load_with_env(Some(file.path()), no_env));
        assert!(err.to_string().contains("invalid"));
    }

    #[test]
    fn test_invalid_token_format_non_numeric_id() {
        let file = write_config(r#"{ "telegram_bot_token": "notanumber:ABCdef" }"#);
        let err = assert_err(Config::load_with_env(Some(file.path()), no_env));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let file = write_config(r#"{ "telegram_bot_token": "1:abc", "session_capacity": 0 }"#);
        let err = assert_err(Config::load_with_env(Some(file.path()), no_env));
        assert!(err.to_string().contains("session_capacity"));
    }

    #[test]
    fn test_file_not_found() {
        let err = assert_err(Config::load_with_env(Some(Path::new("/nonexistent/path/config.json")), no_env));
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_config("{ invalid json }");
        let err = assert_err(Config::load_with_env(Some(file.path()), no_env));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }
}
