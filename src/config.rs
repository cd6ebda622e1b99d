//! Configuration management for front-paneld
//!
//! Handles loading and validation of the JSON configuration file.
//! Configuration is stored at `/etc/front-paneld/config.json`; a missing
//! file means "all defaults".

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::platform::MAX_SLOTS;

// ============================================================================
// Constants
// ============================================================================

/// System-wide config file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/front-paneld/config.json";

/// Config directory name under the user config dir (unprivileged runs)
const CONFIG_DIR: &str = "front-paneld";

/// Default config file name
const CONFIG_FILE: &str = "config.json";

/// Release polls before a held button is declared stuck (~20 s)
pub const BTN_MAX_SAMPLES: u32 = 200;

/// Release polls at or above which a power button press is "long" (~4 s)
pub const BTN_POWER_OFF_THRESHOLD: u32 = 40;

/// Heartbeat iterations between power-cycle timestamp writes (~1 hour)
pub const HB_TIMESTAMP_COUNT: u32 = 60 * 60;

// ============================================================================
// Button Configuration
// ============================================================================

/// Debounce and long-press thresholds shared by the reset and power buttons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonConfig {
    /// Release polls before giving up on a held button
    #[serde(default = "default_max_samples")]
    pub max_samples: u32,

    /// Release polls that turn a power button press into a long press
    #[serde(default = "default_power_off_threshold")]
    pub power_off_threshold: u32,

    /// Interval between release polls in milliseconds
    #[serde(default = "default_sample_interval")]
    pub sample_interval_ms: u64,
}

fn default_max_samples() -> u32 { BTN_MAX_SAMPLES }
fn default_power_off_threshold() -> u32 { BTN_POWER_OFF_THRESHOLD }
fn default_sample_interval() -> u64 { 100 }

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            max_samples: BTN_MAX_SAMPLES,
            power_off_threshold: BTN_POWER_OFF_THRESHOLD,
            sample_interval_ms: 100,
        }
    }
}

impl ButtonConfig {
    /// Keep the long-press threshold reachable before the stuck budget runs out
    pub fn validate(&mut self) {
        self.max_samples = self.max_samples.max(1);
        self.power_off_threshold = self.power_off_threshold.clamp(1, self.max_samples);
        self.sample_interval_ms = self.sample_interval_ms.max(1);
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

// ============================================================================
// Heartbeat Configuration
// ============================================================================

/// Heartbeat LED timing and power-cycle timestamp cadence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// LED on time and off time in milliseconds (full cycle is twice this)
    #[serde(default = "default_half_period")]
    pub half_period_ms: u64,

    /// Heartbeat iterations between timestamp writes
    #[serde(default = "default_timestamp_interval")]
    pub timestamp_interval: u32,
}

fn default_half_period() -> u64 { 500 }
fn default_timestamp_interval() -> u32 { HB_TIMESTAMP_COUNT }

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            half_period_ms: 500,
            timestamp_interval: HB_TIMESTAMP_COUNT,
        }
    }
}

impl HeartbeatConfig {
    pub fn validate(&mut self) {
        self.half_period_ms = self.half_period_ms.max(1);
        self.timestamp_interval = self.timestamp_interval.max(1);
    }

    pub fn half_period(&self) -> Duration {
        Duration::from_millis(self.half_period_ms)
    }
}

// ============================================================================
// Main Configuration
// ============================================================================

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// PID file doubling as the single-instance lock
    #[serde(default = "default_pid_file")]
    pub pid_file: PathBuf,

    /// Directory of the persistent key/value store
    #[serde(default = "default_kv_store_dir")]
    pub kv_store_dir: PathBuf,

    /// Root of the file-backed hardware lines
    #[serde(default = "default_platform_root")]
    pub platform_root: PathBuf,

    /// Number of populated slot positions (1-4)
    #[serde(default = "default_num_slots")]
    pub num_slots: u8,

    #[serde(default)]
    pub button: ButtonConfig,

    #[serde(default)]
    pub heartbeat: HeartbeatConfig,

    /// Configuration file path (not serialized)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

fn default_pid_file() -> PathBuf {
    PathBuf::from("/var/run/front-paneld.pid")
}

fn default_kv_store_dir() -> PathBuf {
    PathBuf::from("/mnt/data/kv_store")
}

fn default_platform_root() -> PathBuf {
    PathBuf::from("/var/run/front-paneld/hw")
}

fn default_num_slots() -> u8 {
    MAX_SLOTS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pid_file: default_pid_file(),
            kv_store_dir: default_kv_store_dir(),
            platform_root: default_platform_root(),
            num_slots: MAX_SLOTS,
            button: ButtonConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            config_path: None,
        }
    }
}

impl Config {
    /// Per-user config directory, used when not running as root
    pub fn user_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(CONFIG_DIR))
    }

    /// Default config file path: the system file if present, else the user one
    pub fn default_config_path() -> PathBuf {
        let system = PathBuf::from(DEFAULT_CONFIG_PATH);
        if system.exists() {
            return system;
        }
        match Self::user_config_dir() {
            Some(dir) if dir.join(CONFIG_FILE).exists() => dir.join(CONFIG_FILE),
            _ => system,
        }
    }

    /// Load configuration from file path
    ///
    /// Returns default config if file doesn't exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            let mut config = Self::default();
            config.config_path = Some(path.to_path_buf());
            return Ok(config);
        }

        let contents = fs::read_to_string(path).map_err(ConfigError::IoError)?;
        let mut config: Config =
            serde_json::from_str(&contents).map_err(ConfigError::ParseError)?;

        config.validate()?;
        config.config_path = Some(path.to_path_buf());

        tracing::info!(
            path = %path.display(),
            num_slots = config.num_slots,
            kv_store = %config.kv_store_dir.display(),
            platform_root = %config.platform_root.display(),
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Reject what cannot be clamped, clamp the rest
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.num_slots == 0 || self.num_slots > MAX_SLOTS {
            return Err(ConfigError::ValidationError(format!(
                "num_slots must be 1-{}, got {}",
                MAX_SLOTS, self.num_slots
            )));
        }
        self.button.validate();
        self.heartbeat.validate();
        Ok(())
    }

    /// Slot numbers handled by this instance
    pub fn slots(&self) -> impl Iterator<Item = u8> {
        1..=self.num_slots
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration error type
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading file
    IoError(std::io::Error),
    /// JSON parsing error
    ParseError(serde_json::Error),
    /// Validation error
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "I/O error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Parse error: {}", e),
            ConfigError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError(e) => Some(e),
            ConfigError::ParseError(e) => Some(e),
            ConfigError::ValidationError(_) => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
