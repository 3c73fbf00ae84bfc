use std::process::Command;

use thiserror::Error;
use tracing::debug;

use super::environment::TerminalEnvironment;
use crate::ancestry::AncestryError;
use crate::Session;

/// Default multiplexer program.
pub const DEFAULT_TMUX_PROGRAM: &str = "tmux";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    /// The tmux client was switched to the pane
    Executed,
    /// Command should be run manually by user
    DisplayCommand(String),
    /// tmux ran but reported failure
    Failed(String),
}

#[derive(Error, Debug)]
pub enum TerminalError {
    /// The session reports no pane to switch to
    #[error("session {0} has no tmux pane")]
    NoPane(String),

    /// Failed to execute the command
    #[error("Failed to execute command: {0}")]
    ExecutionFailed(String),

    /// The two sessions cannot be merged
    #[error("cannot merge: {0}")]
    NotMergeable(String),

    /// The source session's branch could not be read
    #[error("cannot read source branch: {0}")]
    SourceBranch(#[source] AncestryError),
}

/// Switches the tmux client between session panes.
#[derive(Debug, Clone)]
pub struct TmuxControl {
    program: String,
    environment: TerminalEnvironment,
}

impl TmuxControl {
    /// Uses `program` in the detected environment.
    pub fn new(program: impl Into<String>) -> Self {
        Self::with_environment(program, TerminalEnvironment::detect())
    }

    pub fn with_environment(program: impl Into<String>, environment: TerminalEnvironment) -> Self {
        Self {
            program: program.into(),
            environment,
        }
    }

    pub fn environment(&self) -> TerminalEnvironment {
        self.environment
    }

    /// tmux executable this control runs.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Brings `session`'s pane to the front.
    ///
    /// `switch-client` is used rather than `select-pane` so the jump works
    /// across tmux sessions. Outside tmux the command is returned for the
    /// user to run instead.
    pub fn activate(&self, session: &Session) -> Result<ExecutionResult, TerminalError> {
        let pane = session
            .pane
            .as_deref()
            .ok_or_else(|| TerminalError::NoPane(session.id.clone()))?;
        let args = switch_args(pane);

        match self.environment {
            TerminalEnvironment::Tmux => self.run(&args),
            TerminalEnvironment::Plain => Ok(ExecutionResult::DisplayCommand(
                build_command_string(&self.program, &args),
            )),
        }
    }

    fn run(&self, args: &[String]) -> Result<ExecutionResult, TerminalError> {
        debug!(program = %self.program, ?args, "switching tmux client");
        let status = Command::new(&self.program)
            .args(args)
            .status()
            .map_err(|e| TerminalError::ExecutionFailed(e.to_string()))?;

        if status.success() {
            Ok(ExecutionResult::Executed)
        } else {
            Ok(ExecutionResult::Failed(format!(
                "{} exited with {}",
                build_command_string(&self.program, args),
                status
            )))
        }
    }
}

impl Default for TmuxControl {
    fn default() -> Self {
        Self::new(DEFAULT_TMUX_PROGRAM)
    }
}

fn switch_args(pane: &str) -> Vec<String> {
    vec!["switch-client".to_string(), "-t".to_string(), pane.to_string()]
}

/// Joins a program and its arguments for display.
pub fn build_command_string(cmd: &str, args: &[String]) -> String {
    if args.is_empty() {
        cmd.to_string()
    } else {
        format!("{} {}", cmd, args.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Status;

    fn with_pane(pane: &str) -> Session {
        Session::new("s1", "api", Status::Idle).with_pane(pane)
    }

    #[test]
    fn test_build_command_string() {
        assert_eq!(build_command_string("tmux", &[]), "tmux");
        assert_eq!(
            build_command_string("tmux", &switch_args("%3")),
            "tmux switch-client -t %3"
        );
    }

    #[test]
    fn test_plain_returns_display_command() {
        let control = TmuxControl::with_environment("tmux", TerminalEnvironment::Plain);
        let result = control.activate(&with_pane("%3")).unwrap();
        assert_eq!(
            result,
            ExecutionResult::DisplayCommand("tmux switch-client -t %3".to_string())
        );
    }

    #[test]
    fn test_missing_pane_is_error() {
        let control = TmuxControl::with_environment("tmux", TerminalEnvironment::Tmux);
        let err = control
            .activate(&Session::new("abc", "api", Status::Idle))
            .unwrap_err();
        assert!(matches!(err, TerminalError::NoPane(ref id) if id == "abc"));
        assert_eq!(err.to_string(), "session abc has no tmux pane");
    }

    #[test]
    fn test_tmux_runs_program() {
        // `true` accepts any arguments and succeeds.
        let control = TmuxControl::with_environment("true", TerminalEnvironment::Tmux);
        assert_eq!(
            control.activate(&with_pane("%1")).unwrap(),
            ExecutionResult::Executed
        );
    }

    #[test]
    fn test_tmux_failure_reported() {
        let control = TmuxControl::with_environment("false", TerminalEnvironment::Tmux);
        match control.activate(&with_pane("%1")).unwrap() {
            ExecutionResult::Failed(msg) => assert!(msg.contains("false switch-client -t %1")),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_program_is_error() {
        let control =
            TmuxControl::with_environment("/nonexistent/tmux-binary", TerminalEnvironment::Tmux);
        let err = control.activate(&with_pane("%1")).unwrap_err();
        assert!(err.to_string().starts_with("Failed to execute command"));
    }
}
