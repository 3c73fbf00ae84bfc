//! Agent Sidebar library
//!
//! This crate is the non-visual engine behind the agent sidebar: it keeps a
//! live inventory of agent sessions reported by a local producer and derives
//! a stable, branch-aware display order from it.
//!
//! # Pipeline
//!
//! - [`client`] holds a reconnecting Unix socket connection to the producer
//!   and frames the line-delimited stream.
//! - [`protocol`] decodes each frame into an [`Operation`].
//! - [`registry`] applies operations to the canonical session set, then
//!   sorts and disambiguates it.
//! - [`ancestry`] recovers branch parent/child relationships from git
//!   history for sessions sharing a repository.
//! - [`grouping`] composes the registry and the resolver into the grouped
//!   view handed to the presentation layer by [`console`].
//!
//! # Platform Support
//!
//! Unix-like systems only (Linux, macOS): the producer is reached over a
//! Unix domain socket and sessions are tmux panes.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};

/// Branch ancestry resolution over git history.
pub mod ancestry;

/// Reconnecting stream client for the session producer.
pub mod client;

/// Configuration file loading and path resolution.
pub mod config;

/// Single-threaded apply context feeding the presentation layer.
pub mod console;

/// Text rendering helpers for the CLI.
pub mod display;

/// Repository grouping facade.
pub mod grouping;

/// Tracing subscriber setup.
pub mod logging;

/// Wire protocol decoding.
pub mod protocol;

/// Canonical session registry.
pub mod registry;

/// Session control through the terminal multiplexer.
pub mod terminal;

pub use grouping::{SessionEntry, SessionGroup};
pub use protocol::Operation;
pub use registry::SessionRegistry;

/// Session status as reported by the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Status {
    /// Agent is waiting for a prompt.
    Idle,
    /// Agent is running a turn.
    Working,
    /// Agent is blocked on the user (permission prompt, question).
    Attention,
}

impl Status {
    /// Sort rank used for the registry order. Lower sorts first.
    ///
    /// - 0: Attention
    /// - 1: Working
    /// - 2: Idle
    pub fn list_priority(self) -> u8 {
        match self {
            Status::Attention => 0,
            Status::Working => 1,
            Status::Idle => 2,
        }
    }

    /// Rank used to pick the session most worth jumping to. Lower wins.
    ///
    /// Differs from [`Status::list_priority`]: an idle agent is waiting on
    /// the user and is a better focus target than one still working.
    ///
    /// - 0: Attention
    /// - 1: Idle
    /// - 2: Working
    pub fn focus_priority(self) -> u8 {
        match self {
            Status::Attention => 0,
            Status::Idle => 1,
            Status::Working => 2,
        }
    }

    /// Single-glyph marker for text output.
    pub fn icon(self) -> &'static str {
        match self {
            Status::Idle => "✓",
            Status::Working => "⚡",
            Status::Attention => "💬",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Idle => "idle",
            Status::Working => "working",
            Status::Attention => "attention",
        };
        write!(f, "{}", s)
    }
}

/// Error type for parsing Status from string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError(pub String);

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid status: {}", self.0)
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for Status {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(Status::Idle),
            "working" => Ok(Status::Working),
            "attention" => Ok(Status::Attention),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

/// One observed agent session.
///
/// `id` is assigned by the producer and stable for the session's lifetime.
/// `display_label` starts as the producer's label and is only rewritten by
/// the registry's disambiguation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Producer-assigned identifier (primary key).
    pub id: String,
    /// Human-facing label, unique after disambiguation.
    pub display_label: String,
    /// Current status.
    pub status: Status,
    /// Time of the last reported activity.
    pub last_activity: DateTime<Utc>,
    /// Working directory of the agent, if known.
    pub working_dir: Option<PathBuf>,
    /// tmux pane id (e.g. `%3`). Required to activate the session.
    pub pane: Option<String>,
    /// Root of the owning git repository.
    pub repository: Option<PathBuf>,
    /// Checked-out branch.
    pub branch: Option<String>,
    /// Input tokens consumed so far.
    pub input_tokens: u64,
    /// Output tokens produced so far.
    pub output_tokens: u64,
}

impl Session {
    /// Creates a session with no optional fields set and activity at now.
    pub fn new(id: impl Into<String>, display_label: impl Into<String>, status: Status) -> Self {
        Self {
            id: id.into(),
            display_label: display_label.into(),
            status,
            last_activity: Utc::now(),
            working_dir: None,
            pane: None,
            repository: None,
            branch: None,
            input_tokens: 0,
            output_tokens: 0,
        }
    }

    /// Sets the owning repository root.
    pub fn with_repository(mut self, repository: impl Into<PathBuf>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    /// Sets the checked-out branch.
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Sets the tmux pane id.
    pub fn with_pane(mut self, pane: impl Into<String>) -> Self {
        self.pane = Some(pane.into());
        self
    }

    /// Sets the working directory.
    pub fn with_working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(working_dir.into());
        self
    }

    /// Sets the last activity timestamp.
    pub fn with_last_activity(mut self, last_activity: DateTime<Utc>) -> Self {
        self.last_activity = last_activity;
        self
    }

    /// Sets both token counters.
    pub fn with_tokens(mut self, input_tokens: u64, output_tokens: u64) -> Self {
        self.input_tokens = input_tokens;
        self.output_tokens = output_tokens;
        self
    }

    /// Sum of input and output tokens.
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

#[cfg(test)]
mod tests;
