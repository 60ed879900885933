//! Configuration loading and management

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::actions::{default_keybinds, Keybind, KeybindTable};
use crate::keys::{KeyCode, Modifier, SpecialKeys, TriggerKeys};
use crate::monitor::MonitorSettings;

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "KEYBIND_DAEMON_CONFIG";

/// Errors reading the config file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings read from `config.json`; every field is optional
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileSettings {
    /// Modifiers held to activate keybinds; excluded from chords
    pub trigger_keys: Vec<Modifier>,
    /// Minimum milliseconds between re-resolving on key release
    pub debounce_ms: u64,
    /// Whether releasing shift is debounced like other releases
    pub shift_release_settles: bool,
    /// Dual-purpose keys that bypass chord tracking
    pub special_keys: Vec<KeyCode>,
    pub keybinds: Vec<Keybind>,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            trigger_keys: Vec::new(),
            debounce_ms: 100,
            shift_release_settles: false,
            special_keys: vec![KeyCode::GLOBE],
            keybinds: default_keybinds(),
        }
    }
}

impl FileSettings {
    /// Parse settings from JSON text
    pub fn from_json(text: &str, path: &Path) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Read settings from `path`, or defaults if it does not exist
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_json(&text, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_owned(),
                source,
            }),
        }
    }
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Path of the JSON settings file (may not exist)
    pub config_path: PathBuf,

    pub settings: FileSettings,
}

impl Config {
    /// Load configuration from environment, config file and defaults
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("keybind-daemon");

        let config_path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("config.json"));

        let settings = FileSettings::read(&config_path)?;

        Ok(Self {
            data_dir,
            config_path,
            settings,
        })
    }

    /// Settings for the keybind monitor
    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            triggers: TriggerKeys::new(self.settings.trigger_keys.iter().copied()),
            specials: SpecialKeys::new(self.settings.special_keys.iter().copied()),
            settle_threshold: Duration::from_millis(self.settings.debounce_ms),
            shift_release_settles: self.settings.shift_release_settles,
        }
    }

    /// Resolver built from the configured keybinds
    pub fn keybind_table(&self) -> KeybindTable {
        KeybindTable::new(self.settings.keybinds.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::WindowDirection;

    fn parse(text: &str) -> Result<FileSettings, ConfigError> {
        FileSettings::from_json(text, Path::new("config.json"))
    }

    fn config(settings: FileSettings) -> Config {
        Config {
            data_dir: PathBuf::from("/tmp/keybind-daemon"),
            config_path: PathBuf::from("/tmp/keybind-daemon/config.json"),
            settings,
        }
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let settings = parse("{}").unwrap();
        assert_eq!(settings, FileSettings::default());
        assert_eq!(settings.debounce_ms, 100);
        assert_eq!(settings.special_keys, vec![KeyCode::GLOBE]);
    }

    #[test]
    fn test_full_file() {
        let settings = parse(
            r#"{
                "trigger_keys": ["fn"],
                "debounce_ms": 80,
                "shift_release_settles": true,
                "special_keys": [179, "caps_lock"],
                "keybinds": [{ "keys": ["right"], "action": "right_half" }]
            }"#,
        )
        .unwrap();

        let config = config(settings);
        let monitor = config.monitor_settings();
        assert!(monitor.triggers.contains(Modifier::Function));
        assert!(monitor.specials.contains(KeyCode::CAPS_LOCK));
        assert_eq!(monitor.settle_threshold, Duration::from_millis(80));
        assert!(monitor.shift_release_settles);
        assert_eq!(config.keybind_table().len(), 1);
        assert_eq!(config.settings.keybinds[0].action, WindowDirection::RightHalf);
    }

    #[test]
    fn test_unknown_key_name_rejected() {
        let err = parse(r#"{ "keybinds": [{ "keys": ["hyper"], "action": "maximize" }] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.json"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(parse(r#"{ "debounce": 50 }"#).is_err());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("keybind-daemon-missing-config.json");
        let settings = FileSettings::read(&path).unwrap();
        assert_eq!(settings, FileSettings::default());
    }

    #[test]
    fn test_read_from_disk() {
        let path = std::env::temp_dir().join(format!("keybind-daemon-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "debounce_ms": 250 }"#).unwrap();
        let settings = FileSettings::read(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(settings.debounce_ms, 250);
    }

    #[test]
    fn test_default_table_matches_default_keybinds() {
        let config = config(FileSettings::default());
        assert_eq!(config.keybind_table().len(), default_keybinds().len());
        assert!(config.monitor_settings().specials.contains(KeyCode::GLOBE));
    }
}
