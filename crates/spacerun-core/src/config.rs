//! Configuration loading and typed config structures for Space Run.
//!
//! The canonical configuration lives in `spacerun-config.yaml` next to the
//! binary. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads and validates the file.
//! Every field has a default matching the reference pacing, so an empty
//! file (or no file at all) yields a playable session.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use spacerun_types::SpawnPoint;

/// Environment variable that overrides `storage.path`.
pub const STORAGE_PATH_ENV: &str = "SPACERUN_STORAGE_PATH";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is not usable.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level session configuration.
///
/// Mirrors the structure of `spacerun-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SessionConfig {
    /// Spawn pacing parameters.
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Intro and end-panel timing.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Where the object factory places new entities.
    #[serde(default)]
    pub spawn: SpawnConfig,

    /// Settings persistence.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Headless engine run bounds.
    #[serde(default)]
    pub engine: EngineConfig,
}

impl SessionConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `SPACERUN_STORAGE_PATH` overrides `storage.path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides using an arbitrary variable lookup.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup(STORAGE_PATH_ENV) {
            self.storage.path = PathBuf::from(val);
        }
    }

    /// Check that every value is usable by the session.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero spawn interval, a zero
    /// reward threshold, or a roll denominator below 2.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pacing.spawn_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                reason: "pacing.spawn_interval_ms must be at least 1".to_owned(),
            });
        }
        if self.pacing.reward_force_threshold == 0 {
            return Err(ConfigError::Invalid {
                reason: "pacing.reward_force_threshold must be at least 1".to_owned(),
            });
        }
        if self.pacing.reward_roll_denominator < 2 {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "pacing.reward_roll_denominator must be at least 2, got {}",
                    self.pacing.reward_roll_denominator
                ),
            });
        }
        Ok(())
    }
}

/// Spawn pacing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PacingConfig {
    /// Real-time milliseconds between spawn ticks.
    #[serde(default = "default_spawn_interval_ms")]
    pub spawn_interval_ms: u64,

    /// Streak value that is never reached: once `threshold - 1` obstacles
    /// have spawned in a row, the next decision is a forced reward.
    #[serde(default = "default_reward_force_threshold")]
    pub reward_force_threshold: u32,

    /// A reward is rolled with probability `1 / reward_roll_denominator`.
    #[serde(default = "default_reward_roll_denominator")]
    pub reward_roll_denominator: u32,

    /// Seed for reproducible spawn sequences. Entropy-seeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl PacingConfig {
    /// The spawn interval as a [`Duration`].
    pub const fn spawn_interval(&self) -> Duration {
        Duration::from_millis(self.spawn_interval_ms)
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            spawn_interval_ms: default_spawn_interval_ms(),
            reward_force_threshold: default_reward_force_threshold(),
            reward_roll_denominator: default_reward_roll_denominator(),
            seed: None,
        }
    }
}

/// Intro and end-panel timing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimingConfig {
    /// Length of the intro before the game starts, in milliseconds.
    #[serde(default = "default_start_animation_ms")]
    pub start_animation_ms: u64,

    /// Delay between the player's death and the end panel reveal.
    #[serde(default = "default_end_reveal_delay_ms")]
    pub end_reveal_delay_ms: u64,
}

impl TimingConfig {
    /// The intro length as a [`Duration`].
    pub const fn start_animation(&self) -> Duration {
        Duration::from_millis(self.start_animation_ms)
    }

    /// The end panel delay as a [`Duration`].
    pub const fn end_reveal_delay(&self) -> Duration {
        Duration::from_millis(self.end_reveal_delay_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            start_animation_ms: default_start_animation_ms(),
            end_reveal_delay_ms: default_end_reveal_delay_ms(),
        }
    }
}

/// Spawn placement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct SpawnConfig {
    /// Position handed to the object factory with every decision.
    #[serde(default)]
    pub point: SpawnPoint,
}

/// Settings persistence.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// JSON file holding the high score and sound preference.
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Headless engine run bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Simulated death after this many milliseconds of play (0 = wait for
    /// Ctrl-C).
    #[serde(default)]
    pub max_run_ms: u64,
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_spawn_interval_ms() -> u64 {
    1500
}

const fn default_reward_force_threshold() -> u32 {
    crate::scheduler::REWARD_FORCE_THRESHOLD
}

const fn default_reward_roll_denominator() -> u32 {
    crate::scheduler::REWARD_ROLL_DENOMINATOR
}

const fn default_start_animation_ms() -> u64 {
    1000
}

const fn default_end_reveal_delay_ms() -> u64 {
    500
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("spacerun-settings.json")
}

fn default_log_level() -> String {
    String::from("info")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_reference_pacing() {
        let config = SessionConfig::default();
        assert_eq!(config.pacing.reward_force_threshold, 5);
        assert_eq!(config.pacing.reward_roll_denominator, 6);
        assert_eq!(config.pacing.spawn_interval_ms, 1500);
        assert_eq!(config.timing.end_reveal_delay_ms, 500);
        assert!(config.pacing.seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
pacing:
  spawn_interval_ms: 900
  reward_force_threshold: 4
  reward_roll_denominator: 8
  seed: 7

timing:
  start_animation_ms: 250
  end_reveal_delay_ms: 100

spawn:
  point:
    x: 6.5
    y: -1.0

storage:
  path: "/tmp/spacerun.json"

logging:
  level: "debug"
  format: json

engine:
  max_run_ms: 30000
"#;
        let mut config: SessionConfig = serde_yml::from_str(yaml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.pacing.spawn_interval(), Duration::from_millis(900));
        assert_eq!(config.pacing.reward_force_threshold, 4);
        assert_eq!(config.pacing.reward_roll_denominator, 8);
        assert_eq!(config.pacing.seed, Some(7));
        assert_eq!(config.timing.start_animation(), Duration::from_millis(250));
        assert_eq!(config.timing.end_reveal_delay(), Duration::from_millis(100));
        assert_eq!(config.spawn.point, SpawnPoint { x: 6.5, y: -1.0 });
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.engine.max_run_ms, 30000);

        config.apply_overrides_from(|_| None);
        assert_eq!(config.storage.path, PathBuf::from("/tmp/spacerun.json"));
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let config = SessionConfig::parse("pacing:\n  spawn_interval_ms: 200\n").unwrap();
        assert_eq!(config.pacing.spawn_interval_ms, 200);
        assert_eq!(config.pacing.reward_force_threshold, 5);
        assert_eq!(config.timing, TimingConfig::default());
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn zero_spawn_interval_is_rejected() {
        let result = SessionConfig::parse("pacing:\n  spawn_interval_ms: 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn degenerate_roll_denominator_is_rejected() {
        let result = SessionConfig::parse("pacing:\n  reward_roll_denominator: 1\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let result = SessionConfig::parse("pacing:\n  reward_force_threshold: 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn malformed_yaml_is_a_yaml_error() {
        let result = SessionConfig::parse("pacing: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn storage_path_override() {
        let mut config = SessionConfig::default();
        config.apply_overrides_from(|key| {
            (key == STORAGE_PATH_ENV).then(|| String::from("/var/lib/spacerun.json"))
        });
        assert_eq!(config.storage.path, PathBuf::from("/var/lib/spacerun.json"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = SessionConfig::from_file(Path::new("/definitely/not/here.yaml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
