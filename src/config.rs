// Configuration save/restore functionality

use crate::history::{DEFAULT_HEIGHT, DEFAULT_SLOTS, HistorySettings, MAX_HEIGHT, MAX_SLOTS};
use crate::monitor::MonitorSettings;
use crate::rate::{MAX_INTERVAL_SECS, MAX_SMOOTHING_STEPS};
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = "netload";
const CONFIG_FILE: &str = "config.json";

/// Unit the throughput is shown in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayUnit {
    #[default]
    Bits,
    Bytes,
}

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Seconds between counter reads
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Display sub-steps per interval
    #[serde(default = "default_smoothing")]
    pub smoothing_steps: u32,

    /// Interface to start on; None = first non-loopback
    #[serde(default)]
    pub interface: Option<String>,

    /// Never switch away from the starting interface
    #[serde(default)]
    pub keep_interface: bool,

    #[serde(default)]
    pub display_unit: DisplayUnit,

    /// Highlight threshold in kilo-units of `display_unit`; 0 disables
    #[serde(default)]
    pub alarm_threshold: Option<u64>,

    #[serde(default = "default_show_interface_name")]
    pub show_interface_name: bool,

    /// Preferred stats backend
    #[serde(default)]
    pub stats_backend: Option<String>,

    /// Preferred interface enumerator
    #[serde(default)]
    pub enumerator_backend: Option<String>,

    #[serde(default = "default_history_slots")]
    pub history_slots: usize,

    #[serde(default = "default_history_height")]
    pub history_height: u64,
}

fn default_interval() -> u64 {
    1
}

fn default_smoothing() -> u32 {
    1
}

fn default_show_interface_name() -> bool {
    true
}

fn default_history_slots() -> usize {
    DEFAULT_SLOTS
}

fn default_history_height() -> u64 {
    DEFAULT_HEIGHT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            smoothing_steps: default_smoothing(),
            interface: None,
            keep_interface: false,
            display_unit: DisplayUnit::Bits,
            alarm_threshold: None,
            show_interface_name: true,
            stats_backend: None,
            enumerator_backend: None,
            history_slots: DEFAULT_SLOTS,
            history_height: DEFAULT_HEIGHT,
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Cannot determine the config directory")?;
        Ok(config_dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load configuration from disk; a missing file means defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("Config file {:?} not found, using defaults", path);
            return Ok(Config::default());
        }

        let contents =
            fs::read_to_string(path).context(format!("Failed to read config file: {:?}", path))?;

        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .context(format!("Failed to create config directory: {:?}", dir))?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents).context(format!("Failed to write config file: {:?}", path))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            (1..=MAX_INTERVAL_SECS).contains(&self.interval_secs),
            "update interval must be between 1 and {} seconds",
            MAX_INTERVAL_SECS
        );
        ensure!(
            (1..=MAX_SMOOTHING_STEPS).contains(&self.smoothing_steps),
            "smoothing steps must be between 1 and {}",
            MAX_SMOOTHING_STEPS
        );
        ensure!(
            (1..=MAX_SLOTS).contains(&self.history_slots),
            "history needs between 1 and {} slots",
            MAX_SLOTS
        );
        ensure!(
            (2..=MAX_HEIGHT).contains(&self.history_height),
            "history height must be between 2 and {}",
            MAX_HEIGHT
        );
        Ok(())
    }

    /// Alarm threshold converted to bytes/sec
    pub fn alarm_bytes_per_sec(&self) -> Option<u64> {
        let kilo = self.alarm_threshold.filter(|&k| k > 0)?;
        Some(match self.display_unit {
            DisplayUnit::Bytes => kilo * 1000,
            DisplayUnit::Bits => kilo * 1000 / 8,
        })
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            interval_secs: self.interval_secs,
            smoothing_steps: self.smoothing_steps,
            history: HistorySettings::new(self.history_slots, self.history_height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = Config {
            interface: Some("eth0".to_string()),
            display_unit: DisplayUnit::Bytes,
            alarm_threshold: Some(500),
            stats_backend: Some("netdev".to_string()),
            ..Config::default()
        };

        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"display_unit\": \"bytes\""));

        let deserialized: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{ "smoothing_steps": 4 }"#).unwrap();

        assert_eq!(config.smoothing_steps, 4);
        assert_eq!(config.interval_secs, 1);
        assert!(config.show_interface_name);
        assert_eq!(config.history_slots, 16);
        assert_eq!(config.history_height, 21);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("netload").join("config.json");

        let config = Config {
            keep_interface: true,
            ..Config::default()
        };
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());

        let config = Config {
            interval_secs: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            history_height: 1,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_upper_bounds() {
        let config = Config {
            interval_secs: MAX_INTERVAL_SECS,
            smoothing_steps: MAX_SMOOTHING_STEPS,
            history_slots: MAX_SLOTS,
            history_height: MAX_HEIGHT,
            ..Config::default()
        };
        assert!(config.validate().is_ok());

        for config in [
            Config {
                interval_secs: u64::MAX / 100,
                ..Config::default()
            },
            Config {
                smoothing_steps: MAX_SMOOTHING_STEPS + 1,
                ..Config::default()
            },
            Config {
                history_slots: 65536,
                ..Config::default()
            },
            Config {
                history_height: MAX_HEIGHT + 1,
                ..Config::default()
            },
        ] {
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn test_alarm_threshold_conversion() {
        let mut config = Config {
            alarm_threshold: Some(80),
            ..Config::default()
        };
        assert_eq!(config.alarm_bytes_per_sec(), Some(10_000));

        config.display_unit = DisplayUnit::Bytes;
        assert_eq!(config.alarm_bytes_per_sec(), Some(80_000));

        config.alarm_threshold = Some(0);
        assert_eq!(config.alarm_bytes_per_sec(), None);
    }
}
