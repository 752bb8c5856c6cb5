//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/dayscore/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/dayscore/` (~/.config/dayscore/)
//! - Data: `$XDG_DATA_HOME/dayscore/` (~/.local/share/dayscore/)
//! - State/Logs: `$XDG_STATE_HOME/dayscore/` (~/.local/state/dayscore/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Goal evaluation configuration
    #[serde(default)]
    pub goals: GoalsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Upper bound for every day-count window (about ten years).
pub const MAX_HISTORY_DAYS: u32 = 3660;

/// Goal evaluation thresholds and history windows
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct GoalsConfig {
    /// Ratio of target at which a minimum goal turns to `warning`
    #[serde(default = "default_warning_ratio_minimum")]
    pub warning_ratio_minimum: f64,

    /// Ratio of target above which an open maximum goal fails outright
    #[serde(default = "default_warning_ratio_maximum")]
    pub warning_ratio_maximum: f64,

    /// Weight of neutral time in the productivity score (0 = productive share only)
    #[serde(default)]
    pub neutral_weight: f64,

    /// Session length counted by work-session goals that do not set one
    #[serde(default = "default_min_session_minutes")]
    pub default_min_session_minutes: u32,

    /// Days a streak walk covers, counting the day it ends on
    #[serde(default = "default_streak_lookback_days")]
    pub streak_lookback_days: u32,

    /// Days covered by the calendar heatmap
    #[serde(default = "default_heatmap_days")]
    pub heatmap_days: u32,

    /// Maximum number of past days frozen by one backfill run
    #[serde(default = "default_backfill_max_days")]
    pub backfill_max_days: u32,
}

impl Default for GoalsConfig {
    fn default() -> Self {
        Self {
            warning_ratio_minimum: default_warning_ratio_minimum(),
            warning_ratio_maximum: default_warning_ratio_maximum(),
            neutral_weight: 0.0,
            default_min_session_minutes: default_min_session_minutes(),
            streak_lookback_days: default_streak_lookback_days(),
            heatmap_days: default_heatmap_days(),
            backfill_max_days: default_backfill_max_days(),
        }
    }
}

impl GoalsConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if !(self.warning_ratio_minimum > 0.0 && self.warning_ratio_minimum <= 1.0) {
            return Err(Error::Config(
                "goals.warning_ratio_minimum must be in (0, 1]".to_string(),
            ));
        }
        if !(self.warning_ratio_maximum >= 1.0) {
            return Err(Error::Config(
                "goals.warning_ratio_maximum must be at least 1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.neutral_weight) {
            return Err(Error::Config(
                "goals.neutral_weight must be between 0 and 1".to_string(),
            ));
        }
        if self.default_min_session_minutes == 0 {
            return Err(Error::Config(
                "goals.default_min_session_minutes must be at least 1".to_string(),
            ));
        }
        for (name, days) in [
            ("streak_lookback_days", self.streak_lookback_days),
            ("heatmap_days", self.heatmap_days),
            ("backfill_max_days", self.backfill_max_days),
        ] {
            if !(1..=MAX_HISTORY_DAYS).contains(&days) {
                return Err(Error::Config(format!(
                    "goals.{} must be between 1 and {}",
                    name, MAX_HISTORY_DAYS
                )));
            }
        }
        Ok(())
    }
}

fn default_warning_ratio_minimum() -> f64 {
    0.8
}

fn default_warning_ratio_maximum() -> f64 {
    1.2
}

fn default_min_session_minutes() -> u32 {
    25
}

fn default_streak_lookback_days() -> u32 {
    365
}

fn default_heatmap_days() -> u32 {
    30
}

fn default_backfill_max_days() -> u32 {
    90
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.goals.validate()?;
        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/dayscore/config.toml` (~/.config/dayscore/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("dayscore").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    ///
    /// `$XDG_DATA_HOME/dayscore/` (~/.local/share/dayscore/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("dayscore")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/dayscore/` (~/.local/state/dayscore/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("dayscore")
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/dayscore/data.db` (~/.local/share/dayscore/data.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("data.db")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// For the CLI, which wants stable path behavior before any component reads them.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.goals.warning_ratio_minimum, 0.8);
        assert_eq!(config.goals.warning_ratio_maximum, 1.2);
        assert_eq!(config.goals.neutral_weight, 0.0);
        assert_eq!(config.goals.default_min_session_minutes, 25);
        assert_eq!(config.goals.streak_lookback_days, 365);
        assert_eq!(config.goals.heatmap_days, 30);
        assert!(config.goals.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[goals]
warning_ratio_minimum = 0.9
neutral_weight = 0.5
heatmap_days = 60

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.goals.warning_ratio_minimum, 0.9);
        assert_eq!(config.goals.warning_ratio_maximum, 1.2);
        assert_eq!(config.goals.neutral_weight, 0.5);
        assert_eq!(config.goals.heatmap_days, 60);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.max_files, 5);
    }

    #[test]
    fn test_goals_config_validation() {
        let config = GoalsConfig {
            warning_ratio_minimum: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = GoalsConfig {
            warning_ratio_maximum: 0.9,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = GoalsConfig {
            neutral_weight: 2.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_day_windows_are_bounded() {
        let out_of_range = [
            GoalsConfig {
                streak_lookback_days: u32::MAX,
                ..Default::default()
            },
            GoalsConfig {
                heatmap_days: MAX_HISTORY_DAYS + 1,
                ..Default::default()
            },
            GoalsConfig {
                backfill_max_days: 1_000_000,
                ..Default::default()
            },
            GoalsConfig {
                heatmap_days: 0,
                ..Default::default()
            },
        ];
        for config in out_of_range {
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("must be between 1 and 3660"));
        }

        let config = GoalsConfig {
            streak_lookback_days: MAX_HISTORY_DAYS,
            heatmap_days: 1,
            backfill_max_days: MAX_HISTORY_DAYS,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_rejects_invalid_thresholds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[goals]\nwarning_ratio_minimum = 0.0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
