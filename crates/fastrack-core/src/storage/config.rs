//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Default fast length and the quick-pick presets
//! - Tick period of the live tracker
//! - Completion notification settings and wording
//!
//! Configuration is stored at `<data dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::data_dir;
use crate::error::{ConfigError, ValidationError};
use crate::fasting::{check_hours, DEFAULT_HOURS, PRESET_HOURS};

/// Fasting timer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FastingConfig {
    #[serde(default = "default_hours")]
    pub default_hours: u32,
    #[serde(default = "default_presets")]
    pub presets: Vec<u32>,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_title")]
    pub title: String,
    /// `{hours}` is replaced with the fast length.
    #[serde(default = "default_body")]
    pub body: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fasting: FastingConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

fn default_hours() -> u32 {
    DEFAULT_HOURS
}
fn default_presets() -> Vec<u32> {
    PRESET_HOURS.to_vec()
}
fn default_tick_interval_ms() -> u64 {
    1000
}
fn default_true() -> bool {
    true
}
fn default_title() -> String {
    "Fast Complete!".into()
}
fn default_body() -> String {
    "Great job! You've completed your {hours}-hour fast. Time to break your fast!".into()
}

impl Default for FastingConfig {
    fn default() -> Self {
        Self {
            default_hours: default_hours(),
            presets: default_presets(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title: default_title(),
            body: default_body(),
        }
    }
}

impl NotificationsConfig {
    /// Notification body for a fast of `hours`.
    pub fn body_for(&self, hours: u32) -> String {
        self.body.replace("{hours}", &hours.to_string())
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => {
                    let n = value
                        .parse::<u64>()
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                    serde_json::Value::Number(n.into())
                }
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let cfg: Config =
                    toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default configuration");
            Self::default()
        })
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// or fails validation.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save.
    ///
    /// # Errors
    ///
    /// Same as [`Config::apply`], plus failures writing the file.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Reject values the tracker cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid_hours = |key: &str, e: ValidationError| ConfigError::InvalidValue {
            key: key.into(),
            message: match e {
                ValidationError::InvalidValue { message, .. } => message,
                other => other.to_string(),
            },
        };
        check_hours(self.fasting.default_hours)
            .map_err(|e| invalid_hours("fasting.default_hours", e))?;
        for &hours in &self.fasting.presets {
            check_hours(hours).map_err(|e| invalid_hours("fasting.presets", e))?;
        }
        if self.fasting.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "fasting.tick_interval_ms".into(),
                message: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.fasting.tick_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.fasting.default_hours, 16);
        assert_eq!(parsed.fasting.presets, vec![12, 14, 16, 18, 20, 24]);
        assert!(parsed.notifications.enabled);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[fasting]\ndefault_hours = 20\n").unwrap();
        assert_eq!(parsed.fasting.default_hours, 20);
        assert_eq!(parsed.fasting.tick_interval_ms, 1000);
        assert_eq!(parsed.notifications.title, "Fast Complete!");
    }

    #[test]
    fn body_template_fills_hours() {
        let cfg = Config::default();
        assert_eq!(
            cfg.notifications.body_for(16),
            "Great job! You've completed your 16-hour fast. Time to break your fast!"
        );
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("fasting.default_hours").as_deref(), Some("16"));
        assert_eq!(cfg.get("notifications.enabled").as_deref(), Some("true"));
        assert_eq!(cfg.get("notifications.title").as_deref(), Some("Fast Complete!"));
        assert!(cfg.get("fasting.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn apply_updates_typed_values() {
        let mut cfg = Config::default();
        cfg.apply("fasting.default_hours", "18").unwrap();
        cfg.apply("notifications.enabled", "false").unwrap();
        cfg.apply("fasting.presets", "[13, 15]").unwrap();
        cfg.apply("notifications.title", "Done").unwrap();
        assert_eq!(cfg.fasting.default_hours, 18);
        assert!(!cfg.notifications.enabled);
        assert_eq!(cfg.fasting.presets, vec![13, 15]);
        assert_eq!(cfg.notifications.title, "Done");
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.apply("fasting.nonexistent", "1").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(_)));
    }

    #[test]
    fn apply_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.apply("notifications.enabled", "maybe").is_err());
        assert!(cfg.apply("fasting.default_hours", "-4").is_err());
        assert!(cfg.notifications.enabled);
    }

    #[test]
    fn apply_rejects_oversized_hours() {
        let mut cfg = Config::default();
        let err = cfg.apply("fasting.default_hours", "4294967295").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert!(cfg.apply("fasting.presets", "[16, 9000]").is_err());
        assert_eq!(cfg.fasting.default_hours, 16);
        assert_eq!(cfg.fasting.presets, vec![12, 14, 16, 18, 20, 24]);

        cfg.apply("fasting.default_hours", "8760").unwrap();
        assert_eq!(cfg.fasting.default_hours, 8760);
    }

    #[test]
    fn apply_rejects_zero_default() {
        let mut cfg = Config::default();
        let err = cfg.apply("fasting.default_hours", "0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert_eq!(cfg.fasting.default_hours, 16);
    }
}
