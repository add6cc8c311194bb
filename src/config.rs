//! Configuration management for tcpclient.
//!
//! Defaults can be overridden from `~/.config/tcpclient/config.toml`, and
//! command-line flags override both.

use crate::encoding::TextEncoding;
use crate::error::ClientError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Receive buffer size used when neither a flag nor the config sets one.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Connect and receive timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: f64 = 5.0;

/// Upper bound on a single receive buffer.
pub const MAX_BUFFER_SIZE: usize = 64 * 1024 * 1024;

/// Main configuration structure, as read from the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Session defaults.
    #[serde(default)]
    pub session: SessionConfig,
}

/// Session defaults from the config file. Unset fields fall back to built-ins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Receive buffer size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_size: Option<usize>,
    /// Timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,
    /// Encoding label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

impl Config {
    /// Get the config directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("tcpclient"))
            .context("Could not determine config directory")
    }

    /// Get the default config file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. The default path is optional and a
    /// missing file just means built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::config_path() {
                Ok(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };
        Self::load_from(&path)
    }

    fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

/// Command-line overrides, already validated by the argument parser.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub buffer_size: Option<usize>,
    pub timeout: Option<Duration>,
    pub encoding: Option<TextEncoding>,
}

/// Fully resolved parameters for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub buffer_size: usize,
    pub timeout: Duration,
    pub encoding: TextEncoding,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
            encoding: TextEncoding::default(),
        }
    }
}

impl SessionSettings {
    /// Merge flags over config over built-in defaults.
    pub fn resolve(overrides: Overrides, config: &Config) -> Result<Self, ClientError> {
        let defaults = Self::default();
        let file = &config.session;

        let buffer_size = match (overrides.buffer_size, file.buffer_size) {
            (Some(size), _) => size,
            (None, Some(size)) => check_buffer_size(size).map_err(ClientError::Config)?,
            (None, None) => defaults.buffer_size,
        };

        let timeout = match (overrides.timeout, file.timeout) {
            (Some(timeout), _) => timeout,
            (None, Some(secs)) => timeout_from_secs(secs).map_err(ClientError::Config)?,
            (None, None) => defaults.timeout,
        };

        let encoding = match (overrides.encoding, &file.encoding) {
            (Some(encoding), _) => encoding,
            (None, Some(label)) => TextEncoding::from_label(label)?,
            (None, None) => defaults.encoding,
        };

        Ok(Self {
            buffer_size,
            timeout,
            encoding,
        })
    }
}

fn check_buffer_size(size: usize) -> Result<usize, String> {
    if size == 0 {
        return Err("buffer size must be positive".to_string());
    }
    if size > MAX_BUFFER_SIZE {
        return Err(format!("buffer size must be at most {} bytes", MAX_BUFFER_SIZE));
    }
    Ok(size)
}

fn timeout_from_secs(secs: f64) -> Result<Duration, String> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("timeout must be a positive number of seconds, got {}", secs));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| format!("timeout out of range: {}", e))
}

/// Value parser for `--size`.
pub fn parse_buffer_size(s: &str) -> Result<usize, String> {
    let size: usize = s
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a byte count", s))?;
    check_buffer_size(size)
}

/// Value parser for `--timeout`; accepts fractional seconds.
pub fn parse_timeout(s: &str) -> Result<Duration, String> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", s))?;
    timeout_from_secs(secs)
}
