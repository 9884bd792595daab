// src/settings.rs
//
// Persistent settings, stored as TOML in the user's config directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::io::serial::DEFAULT_BAUD_RATE;
use crate::protocol::assembler::DEFAULT_RETRY_LIMIT;
use crate::protocol::{AssemblerConfig, RetryPolicy, TimeAxisMode, ValidationMode};

const APP_DIR: &str = "kbtinfo";
const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// Serial port the tester is attached to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_description: Option<String>,
    /// Connect to `port` without prompting.
    #[serde(default)]
    pub auto_connect: bool,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default)]
    pub validation: ValidationMode,
    #[serde(default)]
    pub retry_policy: RetryPolicy,
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u8,
    #[serde(default)]
    pub time_axis: TimeAxisMode,
    /// Sleep between empty transport polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Directory for log files; no file logging when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,
    #[serde(default)]
    pub output: OutputFormat,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}
fn default_retry_limit() -> u8 {
    DEFAULT_RETRY_LIMIT
}
fn default_poll_interval_ms() -> u64 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: None,
            port_description: None,
            auto_connect: false,
            baud_rate: default_baud_rate(),
            validation: ValidationMode::default(),
            retry_policy: RetryPolicy::default(),
            retry_limit: default_retry_limit(),
            time_axis: TimeAxisMode::default(),
            poll_interval_ms: default_poll_interval_ms(),
            log_dir: None,
            output: OutputFormat::default(),
        }
    }
}

impl Settings {
    pub fn assembler_config(&self) -> AssemblerConfig {
        AssemblerConfig {
            validation: self.validation,
            retry_policy: self.retry_policy,
            retry_limit: self.retry_limit,
            time_axis: self.time_axis,
        }
    }

    /// Port to open without asking, if any.
    pub fn auto_connect_port(&self) -> Option<&str> {
        if self.auto_connect {
            self.port.as_deref()
        } else {
            None
        }
    }
}

/// `<config dir>/kbtinfo/settings.toml`
pub fn default_settings_path() -> Result<PathBuf, String> {
    let config_dir =
        dirs::config_dir().ok_or_else(|| "Failed to get config dir".to_string())?;
    Ok(config_dir.join(APP_DIR).join(SETTINGS_FILE))
}

/// Load settings, or defaults when the file does not exist yet.
pub fn load_settings(path: &Path) -> Result<Settings, String> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content =
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read settings: {}", e))?;
    toml::from_str(&content).map_err(|e| format!("Failed to parse settings: {}", e))
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config dir: {}", e))?;
    }
    let content = toml::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {}", e))?;
    std::fs::write(path, content).map_err(|e| format!("Failed to write settings: {}", e))?;
    tlog!("[settings] Saved {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("kbtinfo-settings-{}-{}", name, std::process::id()))
            .join(SETTINGS_FILE)
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let settings = load_settings(&temp_path("missing")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.baud_rate, 115_200);
        assert_eq!(settings.retry_limit, 3);
        assert_eq!(settings.validation, ValidationMode::Strict);
        assert_eq!(settings.retry_policy, RetryPolicy::PrefixAware);
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("roundtrip");
        let settings = Settings {
            port: Some("/dev/ttyUSB0".to_string()),
            port_description: Some("CP2102".to_string()),
            auto_connect: true,
            validation: ValidationMode::Permissive,
            time_axis: TimeAxisMode::FixedStep,
            output: OutputFormat::Json,
            ..Default::default()
        };
        save_settings(&path, &settings).unwrap();
        assert_eq!(load_settings(&path).unwrap(), settings);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_partial_file() {
        let settings: Settings = toml::from_str(
            r#"
port = "COM4"
retry_policy = "every_poll"
time_axis = "fixed_step"
"#,
        )
        .unwrap();
        assert_eq!(settings.port.as_deref(), Some("COM4"));
        assert_eq!(settings.retry_policy, RetryPolicy::EveryPoll);
        assert_eq!(settings.time_axis, TimeAxisMode::FixedStep);
        assert_eq!(settings.poll_interval_ms, 10);
        assert!(!settings.auto_connect);
    }

    #[test]
    fn test_invalid_file() {
        let path = temp_path("invalid");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "validation = \"lenient\"").unwrap();
        let err = load_settings(&path).unwrap_err();
        assert!(err.starts_with("Failed to parse settings"));
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_auto_connect_port() {
        let mut settings = Settings {
            port: Some("COM4".to_string()),
            ..Default::default()
        };
        assert_eq!(settings.auto_connect_port(), None);
        settings.auto_connect = true;
        assert_eq!(settings.auto_connect_port(), Some("COM4"));
    }

    #[test]
    fn test_assembler_config() {
        let settings = Settings {
            retry_limit: 5,
            ..Default::default()
        };
        let config = settings.assembler_config();
        assert_eq!(config.retry_limit, 5);
        assert_eq!(config.validation, ValidationMode::Strict);
    }
}
