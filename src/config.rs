//! Configuration management for the reaction time tester
//!
//! Configuration is read once at startup from a platform-specific TOML file
//! and is immutable for the rest of the session.
//!
//! ## Config File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/reaction-time-tester/config.toml` |
//! | macOS | `~/Library/Application Support/reaction-time-tester/config.toml` |
//! | Windows | `%APPDATA%\reaction-time-tester\config.toml` |
//!
//! A missing file is created with the default settings on first load.
//!
//! ## Example
//!
//! ```no_run
//! use reaction_time_tester::Config;
//!
//! let config = Config::load().expect("invalid configuration");
//! println!("Averaging over {} trials", config.trial.averaging_window);
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const APP_DIR: &str = "reaction-time-tester";

/// Error type for configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to determine config directory
    #[error("Could not determine config directory")]
    NoConfigDir,
    /// IO error reading or writing config file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Failed to parse config file
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Failed to serialize config
    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// A value is outside its allowed range
    #[error("Invalid setting: {0}")]
    Invalid(&'static str),
}

/// Returns the path to the config file.
///
/// Creates the config directory if it doesn't exist.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    let app_dir = config_dir.join(APP_DIR);

    if !app_dir.exists() {
        fs::create_dir_all(&app_dir)?;
    }

    Ok(app_dir.join("config.toml"))
}

/// Default directory for trial and debug logs
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("log")
}

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Cue timing
    #[serde(default)]
    pub delays: DelayConfig,
    /// Trial bookkeeping
    #[serde(default)]
    pub trial: TrialConfig,
    /// Input sources
    #[serde(default)]
    pub input: InputConfig,
    /// Trial and debug log files
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Signal colors
    #[serde(default)]
    pub colors: ColorConfig,
    /// UI settings
    #[serde(default)]
    pub ui: UiConfig,
}

/// Cue timing configuration (all values in milliseconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayConfig {
    /// Shortest wait before the react cue
    pub min_delay_ms: u64,
    /// Longest wait before the react cue (inclusive)
    pub max_delay_ms: u64,
    /// Time spent in the early state before returning to ready; 0 waits for input
    pub early_reset_delay_ms: u64,
    /// Input suppression window after each accepted activation; 0 disables it
    pub virtual_debounce_ms: u64,
    /// Draw an arming delay before drawing the react delay
    #[serde(default)]
    pub staged_arming: bool,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 1000,
            max_delay_ms: 3000,
            early_reset_delay_ms: 3000,
            virtual_debounce_ms: 50,
            staged_arming: false,
        }
    }
}

/// How a session begins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntryPolicy {
    /// Wait for a first activation before arming the cue
    #[default]
    ClickToBegin,
    /// Arm the cue as soon as the session starts
    AutoStart,
}

/// Trial bookkeeping configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialConfig {
    /// Number of trials averaged before the window starts over
    pub averaging_window: usize,
    /// Capacity of the reaction time buffer
    pub buffer_capacity: usize,
    /// Session entry policy
    #[serde(default)]
    pub entry: EntryPolicy,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            averaging_window: 5,
            buffer_capacity: 256,
            entry: EntryPolicy::ClickToBegin,
        }
    }
}

/// Input source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Use raw make/break keyboard events instead of polled key state
    pub raw_keyboard: bool,
    /// Use raw mouse button edges instead of polled button state
    pub raw_mouse: bool,
    /// Report raw input wiring at startup
    #[serde(default)]
    pub raw_input_debug: bool,
    /// Terminals that never report key releases: a key counts as released
    /// once no press for it has arrived for this long. Must outlast the
    /// auto-repeat delay.
    #[serde(default = "default_key_hold_ms")]
    pub key_hold_ms: u64,
}

fn default_key_hold_ms() -> u64 {
    600
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            raw_keyboard: true,
            raw_mouse: true,
            raw_input_debug: false,
            key_hold_ms: default_key_hold_ms(),
        }
    }
}

/// Log file configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Append every trial to a session log
    pub trial_log: bool,
    /// Write diagnostic logging to a debug log
    pub debug_log: bool,
    /// Directory for log files (defaults to the platform data directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl LoggingConfig {
    /// Resolved log directory
    pub fn log_dir(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(default_log_dir)
    }
}

/// An RGB color
pub type Rgb = [u8; 3];

/// Signal and text colors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorConfig {
    pub ready: Rgb,
    pub react: Rgb,
    pub early: Rgb,
    pub result: Rgb,
    pub early_text: Rgb,
    pub result_text: Rgb,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            ready: [185, 40, 40],
            react: [40, 180, 80],
            early: [235, 150, 30],
            result: [40, 90, 185],
            early_text: [255, 255, 255],
            result_text: [255, 255, 255],
        }
    }
}

/// UI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiConfig {
    /// Event loop tick rate (in Hz)
    pub refresh_rate_hz: u32,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            refresh_rate_hz: 240,
        }
    }
}

impl Config {
    /// Load configuration from the default config file.
    ///
    /// Writes the default configuration there first if the file doesn't
    /// exist. Returns an error if the file cannot be parsed or holds
    /// invalid settings.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path()?;

        if !path.exists() {
            let config = Self::default();
            config.save_to(&path)?;
            return Ok(config);
        }

        Self::load_from(&path)
    }

    /// Load and validate configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Reject settings the trial loop cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.delays.min_delay_ms == 0 {
            return Err(ConfigError::Invalid("min_delay_ms must be greater than 0"));
        }
        if self.delays.max_delay_ms < self.delays.min_delay_ms {
            return Err(ConfigError::Invalid(
                "max_delay_ms cannot be less than min_delay_ms",
            ));
        }
        if self.trial.averaging_window == 0 {
            return Err(ConfigError::Invalid(
                "averaging_window must be greater than 0",
            ));
        }
        if self.trial.buffer_capacity < self.trial.averaging_window {
            return Err(ConfigError::Invalid(
                "buffer_capacity cannot be less than averaging_window",
            ));
        }
        if self.input.key_hold_ms == 0 {
            return Err(ConfigError::Invalid("key_hold_ms must be greater than 0"));
        }
        if self.ui.refresh_rate_hz == 0 {
            return Err(ConfigError::Invalid("refresh_rate_hz must be greater than 0"));
        }
        Ok(())
    }

    /// Get event loop tick interval as Duration
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.ui.refresh_rate_hz as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn temp_config_path(name: &str) -> PathBuf {
        env::temp_dir().join(format!(
            "reaction-time-tester-{}-{}.toml",
            name,
            std::process::id()
        ))
    }

    #[test]
    fn config_default_values() {
        let config = Config::default();
        assert_eq!(config.delays.min_delay_ms, 1000);
        assert_eq!(config.delays.max_delay_ms, 3000);
        assert_eq!(config.delays.early_reset_delay_ms, 3000);
        assert_eq!(config.delays.virtual_debounce_ms, 50);
        assert!(!config.delays.staged_arming);
        assert_eq!(config.trial.averaging_window, 5);
        assert_eq!(config.trial.buffer_capacity, 256);
        assert_eq!(config.trial.entry, EntryPolicy::ClickToBegin);
        assert!(config.input.raw_keyboard);
        assert!(config.input.raw_mouse);
        assert!(!config.logging.trial_log);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_refresh_interval() {
        let mut config = Config::default();
        config.ui.refresh_rate_hz = 60;
        assert_eq!(config.refresh_interval().as_micros(), 16666);
    }

    #[test]
    fn config_save_and_load_roundtrip() {
        let path = temp_config_path("roundtrip");

        let mut config = Config::default();
        config.delays.min_delay_ms = 500;
        config.trial.entry = EntryPolicy::AutoStart;
        config.colors.react = [0, 255, 0];

        config.save_to(&path).expect("Failed to save config");
        let loaded = Config::load_from(&path).expect("Failed to load config");

        assert_eq!(loaded, config);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn config_load_missing_file_is_error() {
        let path = PathBuf::from("/nonexistent/path/config.toml");
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Io(_))));
    }

    #[test]
    fn config_load_rejects_invalid_file() {
        let path = temp_config_path("invalid");
        let mut config = Config::default();
        config.delays.max_delay_ms = 10;
        config.delays.min_delay_ms = 20;
        config.save_to(&path).unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("max_delay_ms"));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn config_deserializes_from_toml() {
        let toml_str = r#"
[delays]
min_delay_ms = 800
max_delay_ms = 1200
early_reset_delay_ms = 0
virtual_debounce_ms = 20

[trial]
averaging_window = 3
buffer_capacity = 16
entry = "auto_start"

[input]
raw_keyboard = false
raw_mouse = true

[logging]
trial_log = true
debug_log = false
directory = "/tmp/rtt-logs"
"#;

        let config: Config = toml::from_str(toml_str).expect("Failed to deserialize");

        assert_eq!(config.delays.min_delay_ms, 800);
        assert_eq!(config.delays.max_delay_ms, 1200);
        assert_eq!(config.delays.early_reset_delay_ms, 0);
        assert_eq!(config.delays.virtual_debounce_ms, 20);
        assert_eq!(config.trial.averaging_window, 3);
        assert_eq!(config.trial.entry, EntryPolicy::AutoStart);
        assert!(!config.input.raw_keyboard);
        assert!(!config.input.raw_input_debug);
        assert_eq!(config.input.key_hold_ms, 600);
        assert!(config.logging.trial_log);
        assert_eq!(config.logging.log_dir(), PathBuf::from("/tmp/rtt-logs"));
        // Omitted sections fall back to defaults
        assert_eq!(config.colors, ColorConfig::default());
        assert_eq!(config.ui.refresh_rate_hz, 240);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_rejects_out_of_range_color() {
        let toml_str = r#"
[colors]
ready = [300, 0, 0]
react = [0, 0, 0]
early = [0, 0, 0]
result = [0, 0, 0]
early_text = [0, 0, 0]
result_text = [0, 0, 0]
"#;
        assert!(toml::from_str::<Config>(toml_str).is_err());
    }

    #[test]
    fn validate_rejects_bad_delays() {
        let mut config = Config::default();
        config.delays.min_delay_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.delays.min_delay_ms = 2000;
        config.delays.max_delay_ms = 1000;
        assert!(config.validate().is_err());

        // Equal bounds are a fixed delay
        let mut config = Config::default();
        config.delays.min_delay_ms = 1000;
        config.delays.max_delay_ms = 1000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_window() {
        let mut config = Config::default();
        config.trial.averaging_window = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.trial.averaging_window = 10;
        config.trial.buffer_capacity = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_key_hold() {
        let mut config = Config::default();
        config.input.key_hold_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("key_hold_ms"));
    }

    #[test]
    fn validate_allows_zero_early_reset_and_debounce() {
        let mut config = Config::default();
        config.delays.early_reset_delay_ms = 0;
        config.delays.virtual_debounce_ms = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn entry_policy_serializes_snake_case() {
        let mut config = Config::default();
        config.trial.entry = EntryPolicy::AutoStart;
        let toml_str = toml::to_string_pretty(&config).expect("Failed to serialize");
        assert!(toml_str.contains("entry = \"auto_start\""));
        assert!(toml_str.contains("[delays]"));
        assert!(toml_str.contains("[colors]"));
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::NoConfigDir;
        assert_eq!(err.to_string(), "Could not determine config directory");

        let io_err = ConfigError::Io(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        assert!(io_err.to_string().contains("IO error"));
    }
}
