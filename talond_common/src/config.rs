//! Daemon configuration loading and validation.
//!
//! Configuration is a TOML file loaded once at startup and read-only
//! afterwards. Loading and semantic validation are separate steps so tests
//! can construct configs directly.

use serde::Deserialize;
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::consts;

// ─── Errors ─────────────────────────────────────────────────────────

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("configuration file not found")]
    FileNotFound,

    /// File read or TOML parsing failed.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// Semantic validation failed.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

// ─── Field Types ────────────────────────────────────────────────────

/// Logging verbosity level, lowercase in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string accepted by the tracing subscriber.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Telescope flavor: `full` carries a focuser and a security interlock,
/// `lite` has neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    Full,
    Lite,
}

/// A named safe mechanical pose.
///
/// Poses are given either on the sky (altitude/azimuth, degrees) or
/// directly in controller encoder counts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParkPosition {
    AltAz { desc: String, alt: f64, az: f64 },
    Encoder { desc: String, ha_enc: i64, dec_enc: i64 },
}

impl ParkPosition {
    /// Human readable description of the pose.
    pub fn desc(&self) -> &str {
        match self {
            Self::AltAz { desc, .. } | Self::Encoder { desc, .. } => desc,
        }
    }
}

/// Address and payload key of the external security system daemon.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SecuritySystemConfig {
    /// Status endpoint returning a JSON object.
    pub url: String,
    /// Boolean key inside that object that must read `true`.
    pub safe_key: String,
}

// ─── Config ─────────────────────────────────────────────────────────

/// Daemon configuration parsed from a TOML file. Immutable after load.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Handle this daemon registers under with the RPC transport.
    pub daemon: String,
    /// Log channel name.
    pub log_name: String,
    /// Logging verbosity.
    #[serde(default)]
    pub log_level: LogLevel,
    /// Clients allowed to issue commands.
    pub control_ips: Vec<IpAddr>,
    /// Telescope flavor.
    pub flavor: Flavor,
    /// Run the controller against simulated hardware.
    #[serde(rename = "virtual")]
    pub virtual_hardware: bool,
    /// Seconds between telemetry polls.
    pub query_delay: f64,
    /// Poll observations kept by the liveness window.
    #[serde(default = "default_query_timeout_iterations")]
    pub query_timeout_iterations: usize,
    /// Seconds allowed for the controller to come alive after spawn.
    pub initialization_timeout: f64,
    /// Seconds allowed per slew.
    pub slew_timeout: f64,
    /// Seconds allowed per focuser wait tick.
    pub focus_timeout: f64,
    /// Seconds allowed per axis homing.
    pub homing_timeout: f64,
    /// Seconds allowed per axis limit search.
    pub limit_timeout: f64,
    /// Seconds allowed for mirror cover motion.
    pub cover_timeout: f64,
    /// Seconds allowed for daemon liveness pings.
    pub ping_timeout: f64,
    /// Focuser positioning tolerance, micrometres.
    pub focus_tolerance: f64,
    /// Allowed hour-angle range, degrees, negative then positive.
    pub ha_soft_limits: [f64; 2],
    /// Allowed declination range, degrees, negative then positive.
    pub dec_soft_limits: [f64; 2],
    /// Named park poses.
    pub park_positions: HashMap<String, ParkPosition>,
    /// Security interlock peer; required for the full flavor.
    #[serde(default)]
    pub security_system: Option<SecuritySystemConfig>,
    /// Talon communication directory.
    #[serde(default = "default_comm_dir")]
    pub comm_dir: PathBuf,
    /// Profile file sourced for the controller environment.
    #[serde(default = "default_profile_file")]
    pub profile_file: PathBuf,
    /// Command line used to start the controller.
    #[serde(default = "default_controller_command")]
    pub controller_command: Vec<String>,
    /// SysV key of the controller telemetry segment.
    #[serde(default = "default_shm_key")]
    pub shm_key: i32,
}

fn default_query_timeout_iterations() -> usize {
    10
}

fn default_comm_dir() -> PathBuf {
    PathBuf::from(consts::DEFAULT_COMM_DIR)
}

fn default_profile_file() -> PathBuf {
    PathBuf::from(consts::DEFAULT_PROFILE_FILE)
}

fn default_controller_command() -> Vec<String> {
    consts::DEFAULT_CONTROLLER_COMMAND
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_shm_key() -> i32 {
    consts::TALON_SHM_KEY
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::Parse(e.to_string())
            }
        })?;
        let config: Self =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Semantic validation beyond what serde enforces.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn fail(message: impl Into<String>) -> Result<(), ConfigError> {
            Err(ConfigError::Validation(message.into()))
        }

        if self.daemon.is_empty() {
            return fail("daemon cannot be empty");
        }
        if self.log_name.is_empty() {
            return fail("log_name cannot be empty");
        }
        if self.controller_command.is_empty() {
            return fail("controller_command cannot be empty");
        }
        if self.query_delay <= 0.0 {
            return fail("query_delay must be positive");
        }
        if self.query_timeout_iterations < 2 {
            return fail("query_timeout_iterations must be at least 2");
        }
        for (name, value) in [
            ("initialization_timeout", self.initialization_timeout),
            ("slew_timeout", self.slew_timeout),
            ("focus_timeout", self.focus_timeout),
            ("homing_timeout", self.homing_timeout),
            ("limit_timeout", self.limit_timeout),
            ("cover_timeout", self.cover_timeout),
            ("ping_timeout", self.ping_timeout),
        ] {
            if value <= 0.0 {
                return fail(format!("{name} must be positive"));
            }
        }
        if self.focus_tolerance < 0.0 {
            return fail("focus_tolerance cannot be negative");
        }

        let [ha_neg, ha_pos] = self.ha_soft_limits;
        if !(-180.0..=180.0).contains(&ha_neg) || !(-180.0..=180.0).contains(&ha_pos) {
            return fail("ha_soft_limits must lie within [-180, 180] degrees");
        }
        if ha_neg >= 0.0 || ha_pos <= 0.0 {
            return fail("ha_soft_limits must be a (negative, positive) pair");
        }
        let [dec_neg, dec_pos] = self.dec_soft_limits;
        if !(-90.0..=90.0).contains(&dec_neg) || !(-90.0..=90.0).contains(&dec_pos) {
            return fail("dec_soft_limits must lie within [-90, 90] degrees");
        }
        if dec_neg >= dec_pos {
            return fail("dec_soft_limits must be ordered low to high");
        }

        for (name, pose) in &self.park_positions {
            if let ParkPosition::AltAz { alt, az, .. } = pose {
                if !(0.0..=90.0).contains(alt) {
                    return fail(format!("park position '{name}': alt outside [0, 90]"));
                }
                if !(0.0..360.0).contains(az) {
                    return fail(format!("park position '{name}': az outside [0, 360)"));
                }
            }
        }

        if self.flavor == Flavor::Full && self.security_system.is_none() {
            return fail("full flavor requires a security_system section");
        }

        Ok(())
    }

    /// Whether this telescope carries a focuser.
    pub fn has_focus(&self) -> bool {
        self.flavor == Flavor::Full
    }
}
