//! TOML configuration schema types.
//!
//! Every section has defaults via `#[serde(default)]`, so an empty or
//! partial file is valid. Durations are human-readable strings (`"5s"`,
//! `"750ms"`) parsed by `humantime` when read.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ancestry::DEFAULT_GIT_PROGRAM;
use crate::config::error::ConfigError;
use crate::config::xdg;
use crate::terminal::{DEFAULT_AGENT_PROGRAM, DEFAULT_TMUX_PROGRAM};

/// Socket the producer listens on unless configured otherwise.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/agent-sessions.sock";

/// Root configuration.
///
/// ```toml
/// [connection]
/// [git]
/// [tmux]
/// [logging]
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Producer connection settings.
    pub connection: ConnectionConfig,
    /// Branch ancestry queries.
    pub git: GitConfig,
    /// Session activation.
    pub tmux: TmuxConfig,
    /// Log output.
    pub logging: LoggingConfig,
}

impl Config {
    /// Socket path with a leading `~` expanded.
    pub fn socket_path(&self) -> PathBuf {
        xdg::expand_tilde(&self.connection.socket_path)
    }

    /// Parsed retry interval. Zero is rejected.
    pub fn retry_interval(&self) -> Result<Duration, ConfigError> {
        let raw = &self.connection.retry_interval;
        let interval = humantime::parse_duration(raw).map_err(|e| ConfigError::InvalidValue {
            field: "connection.retry_interval",
            value: raw.clone(),
            message: e.to_string(),
        })?;
        if interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "connection.retry_interval",
                value: raw.clone(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(interval)
    }

    /// Checks values that parse as TOML but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry_interval()?;
        if self.connection.socket_path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "connection.socket_path",
                value: self.connection.socket_path.clone(),
                message: "must not be empty".to_string(),
            });
        }
        if self.git.program.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "git.program",
                value: self.git.program.clone(),
                message: "must not be empty".to_string(),
            });
        }
        if self.tmux.program.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "tmux.program",
                value: self.tmux.program.clone(),
                message: "must not be empty".to_string(),
            });
        }
        if self.tmux.agent.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "tmux.agent",
                value: self.tmux.agent.clone(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Where and how to reach the producer.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Unix socket path; `~` is expanded.
    pub socket_path: String,
    /// Wait between connection attempts (e.g. `"5s"`).
    pub retry_interval: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            socket_path: DEFAULT_SOCKET_PATH.to_string(),
            retry_interval: "5s".to_string(),
        }
    }
}

/// Branch ancestry settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct GitConfig {
    /// When false, every branch is shown as a root.
    pub enabled: bool,
    /// git executable.
    pub program: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: DEFAULT_GIT_PROGRAM.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TmuxConfig {
    /// tmux executable.
    pub program: String,
    /// Agent started in a merge handoff window.
    pub agent: String,
}

impl Default for TmuxConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_TMUX_PROGRAM.to_string(),
            agent: DEFAULT_AGENT_PROGRAM.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level used when `ASB_LOG` is unset.
    pub level: LogLevel,
}

/// Log verbosity levels (kebab-case in TOML).
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LogLevel {
    /// Only errors.
    Error,
    /// Errors and warnings (default).
    #[default]
    Warn,
    /// Informational messages.
    Info,
    /// Debug-level detail.
    Debug,
    /// Full trace output.
    Trace,
}

impl LogLevel {
    /// Filter directive for this level.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}
