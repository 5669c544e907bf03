//! Configuration
//!
//! Settings are read from a JSON5 file (`$DMPILOT_CONFIG_PATH`, or
//! `<config dir>/dmpilot/dmpilot.json5`). Every section is optional and
//! falls back to defaults; a missing file yields the default settings.
//! A few environment variables override file values after loading.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ai::ProviderConfig;
use crate::autoreply::{SchedulerSettings, DEFAULT_TICK_INTERVAL};
use crate::channels::DEFAULT_SEND_DELAY;
use crate::logging::LoggingConfig;

/// Environment variable pointing at the config file
pub const CONFIG_PATH_ENV: &str = "DMPILOT_CONFIG_PATH";

const CONFIG_FILE_NAME: &str = "dmpilot.json5";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

/// Auto-reply loop settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoReplySection {
    /// Seconds between ticks; also the per-account poll cooldown
    pub tick_interval_secs: u64,
    /// Start the loop when the server starts
    pub start_on_boot: bool,
}

impl Default for AutoReplySection {
    fn default() -> Self {
        Self {
            tick_interval_secs: DEFAULT_TICK_INTERVAL.as_secs(),
            start_on_boot: true,
        }
    }
}

/// Messaging gateway (session bridge) settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewaySection {
    /// Base URL of the session bridge
    pub base_url: String,
    /// Bearer token for the bridge
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Pause after every delivered reply, per account
    pub send_delay_secs: u64,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8700".to_string(),
            api_key: None,
            send_delay_secs: DEFAULT_SEND_DELAY.as_secs(),
            timeout_secs: crate::channels::bridge::DEFAULT_BRIDGE_TIMEOUT_SECS,
        }
    }
}

/// Flat-file storage locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSection {
    /// Template store file
    pub templates_path: PathBuf,
    /// Account store file
    pub accounts_path: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            templates_path: PathBuf::from("data/templates.json"),
            accounts_path: PathBuf::from("data/accounts.json"),
        }
    }
}

/// HTTP control surface settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSection {
    /// Bind address
    pub bind: String,
    /// Listen port
    pub port: u16,
}

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8000;

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Root settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub auto_reply: AutoReplySection,
    pub gateway: GatewaySection,
    pub ai: ProviderConfig,
    pub storage: StorageSection,
    pub server: ServerSection,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Scheduler timing derived from the auto-reply section
    pub fn scheduler(&self) -> SchedulerSettings {
        SchedulerSettings::with_tick_interval(Duration::from_secs(self.auto_reply.tick_interval_secs))
    }

    /// Post-send delay for the paced gateway
    pub fn send_delay(&self) -> Duration {
        Duration::from_secs(self.gateway.send_delay_secs)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("GROQ_API_KEY").filter(|v| !v.trim().is_empty()) {
            self.ai.api_key = Some(key);
        }
        if let Some(bind) = lookup("DMPILOT_BIND").filter(|v| !v.trim().is_empty()) {
            self.server.bind = bind;
        }
        if let Some(port) = lookup("DMPILOT_PORT") {
            self.server.port = port.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "DMPILOT_PORT".to_string(),
                message: format!("\"{port}\" is not a valid port"),
            })?;
        }
        if let Some(level) = lookup("DMPILOT_LOG").filter(|v| !v.trim().is_empty()) {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Check values that have no sensible interpretation
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auto_reply.tick_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "autoReply.tickIntervalSecs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.gateway.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "gateway.timeoutSecs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.storage.templates_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                key: "storage.templatesPath".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.storage.accounts_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                key: "storage.accountsPath".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Settings as JSON with secrets masked
    pub fn redacted(&self) -> serde_json::Value {
        let mut copy = self.clone();
        if copy.ai.api_key.is_some() {
            copy.ai.api_key = Some("[REDACTED]".to_string());
        }
        if copy.gateway.api_key.is_some() {
            copy.gateway.api_key = Some("[REDACTED]".to_string());
        }
        serde_json::to_value(copy).unwrap_or(serde_json::Value::Null)
    }
}

/// Resolve the config file path.
pub fn get_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    match dirs::config_dir() {
        Some(dir) => dir.join("dmpilot").join(CONFIG_FILE_NAME),
        None => PathBuf::from(CONFIG_FILE_NAME),
    }
}

/// Load settings from the default path, apply env overrides and validate.
pub fn load_config() -> Result<Settings, ConfigError> {
    let mut settings = load_config_from(&get_config_path())?;
    settings.apply_env_overrides()?;
    settings.validate()?;
    Ok(settings)
}

/// Load settings from `path` without env overrides.
///
/// A missing or blank file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Settings, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Settings::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    parse_config(&raw).map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

fn parse_config(raw: &str) -> Result<Settings, String> {
    if raw.trim().is_empty() {
        return Ok(Settings::default());
    }
    json5::from_str(raw).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogFormat;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.auto_reply.tick_interval_secs, 60);
        assert!(settings.auto_reply.start_on_boot);
        assert_eq!(settings.gateway.send_delay_secs, 30);
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.storage.templates_path, PathBuf::from("data/templates.json"));
        assert_eq!(settings.storage.accounts_path, PathBuf::from("data/accounts.json"));
        assert_eq!(settings.logging.format, LogFormat::Text);
        assert_eq!(settings.scheduler().tick_interval, Duration::from_secs(60));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_parse_json5_partial() {
        let raw = r#"
        {
          // comments and trailing commas are fine
          autoReply: { tickIntervalSecs: 15 },
          gateway: { baseUrl: "http://bridge:9000", sendDelaySecs: 0, },
          ai: { model: "mixtral-8x7b-32768", timeoutSecs: 20 },
          logging: { format: "json" },
        }
        "#;
        let settings = parse_config(raw).unwrap();
        assert_eq!(settings.auto_reply.tick_interval_secs, 15);
        assert!(settings.auto_reply.start_on_boot);
        assert_eq!(settings.gateway.base_url, "http://bridge:9000");
        assert_eq!(settings.send_delay(), Duration::ZERO);
        assert_eq!(settings.gateway.timeout_secs, 30);
        assert_eq!(settings.ai.model, "mixtral-8x7b-32768");
        assert_eq!(settings.ai.timeout_seconds, 20);
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(settings.server.port, 8000);
    }

    #[test]
    fn test_parse_blank_is_default() {
        assert_eq!(parse_config("  \n").unwrap(), Settings::default());
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let settings = load_config_from(&dir.path().join("absent.json5")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json5");
        std::fs::write(&path, "{ autoReply: ").unwrap();
        assert!(matches!(load_config_from(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("GROQ_API_KEY", "gsk-env"),
            ("DMPILOT_BIND", "0.0.0.0"),
            ("DMPILOT_PORT", "9100"),
            ("DMPILOT_LOG", "debug"),
        ]);
        let mut settings = Settings::default();
        settings
            .apply_overrides_from(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(settings.ai.api_key.as_deref(), Some("gsk-env"));
        assert_eq!(settings.server.bind, "0.0.0.0");
        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn test_env_override_bad_port() {
        let mut settings = Settings::default();
        let err = settings
            .apply_overrides_from(|k| (k == "DMPILOT_PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("DMPILOT_PORT"));
    }

    #[test]
    fn test_validate_rejects_zero_tick() {
        let mut settings = Settings::default();
        settings.auto_reply.tick_interval_secs = 0;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Invalid { key, .. }) if key == "autoReply.tickIntervalSecs"
        ));
    }

    #[test]
    fn test_validate_rejects_empty_accounts_path() {
        let mut settings = Settings::default();
        settings.storage.accounts_path = PathBuf::new();
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Invalid { key, .. }) if key == "storage.accountsPath"
        ));
    }

    #[test]
    fn test_redacted_masks_keys() {
        let mut settings = Settings::default();
        settings.ai.api_key = Some("gsk-secret".to_string());
        let value = settings.redacted();
        assert_eq!(value["ai"]["apiKey"], "[REDACTED]");
        assert!(value["gateway"].get("apiKey").is_none());
        assert_eq!(value["server"]["port"], 8000);
    }
}
