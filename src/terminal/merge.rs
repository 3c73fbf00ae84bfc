//! Merge handoff between two sessions of one repository.
//!
//! The source session's branch is handed to the target session's checkout:
//! a new tmux window opens in the target's working directory, in the
//! target's tmux session, and an agent is started there with a prompt to
//! merge the branch and then close the source pane.
//!
//! Every tmux call names its target explicitly, so this works from outside
//! tmux too, as long as a server is running.

use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use super::executor::{build_command_string, TerminalError, TmuxControl};
use crate::ancestry::GitLog;
use crate::Session;

/// Agent started in the merge window.
pub const DEFAULT_AGENT_PROGRAM: &str = "claude";

/// What a successful handoff did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeHandoff {
    /// Branch checked out in the source session.
    pub branch: String,
    /// tmux session the target pane belongs to.
    pub tmux_session: String,
    /// Pane of the newly opened window.
    pub pane: String,
    /// Prompt typed into the new window.
    pub prompt: String,
}

/// Checked inputs of a handoff.
struct MergePlan<'a> {
    source_dir: &'a Path,
    source_pane: &'a str,
    target_dir: &'a Path,
    target_pane: &'a str,
}

impl<'a> MergePlan<'a> {
    fn check(source: &'a Session, target: &'a Session) -> Result<Self, TerminalError> {
        match (&source.repository, &target.repository) {
            (Some(a), Some(b)) if a == b => {}
            _ => {
                return Err(TerminalError::NotMergeable(format!(
                    "{} and {} are not in the same repository",
                    source.id, target.id
                )))
            }
        }

        let source_dir = working_dir(source)?;
        let target_dir = working_dir(target)?;

        let source_pane = source
            .pane
            .as_deref()
            .ok_or_else(|| TerminalError::NoPane(source.id.clone()))?;
        let target_pane = target
            .pane
            .as_deref()
            .ok_or_else(|| TerminalError::NoPane(target.id.clone()))?;
        if source_pane == target_pane {
            return Err(TerminalError::NotMergeable(format!(
                "both sessions run in pane {}",
                source_pane
            )));
        }

        Ok(Self {
            source_dir,
            source_pane,
            target_dir,
            target_pane,
        })
    }
}

fn working_dir(session: &Session) -> Result<&Path, TerminalError> {
    session.working_dir.as_deref().ok_or_else(|| {
        TerminalError::NotMergeable(format!("session {} has no working directory", session.id))
    })
}

impl TmuxControl {
    /// Hands `source`'s branch to `target` for merging.
    ///
    /// Both sessions must share a repository, report working directories,
    /// and run in different panes. `git` reads the source branch; `agent`
    /// is the program started in the new window.
    pub fn merge(
        &self,
        source: &Session,
        target: &Session,
        git: &GitLog,
        agent: &str,
    ) -> Result<MergeHandoff, TerminalError> {
        let plan = MergePlan::check(source, target)?;

        let branch = git
            .current_branch(plan.source_dir)
            .map_err(TerminalError::SourceBranch)?;
        let tmux_session = self.capture(&session_name_args(plan.target_pane))?;
        let pane = self.capture(&new_window_args(&tmux_session, plan.target_dir))?;

        let prompt = merge_prompt(&branch, self.program(), plan.source_pane);
        self.output(&send_keys_args(&pane, &agent_command(agent, &prompt)))?;

        info!(branch = %branch, pane = %pane, "merge handed off");
        Ok(MergeHandoff {
            branch,
            tmux_session,
            pane,
            prompt,
        })
    }

    /// Runs tmux and returns its trimmed stdout, which must not be empty.
    fn capture(&self, args: &[String]) -> Result<String, TerminalError> {
        let out = self.output(args)?;
        if out.is_empty() {
            return Err(TerminalError::ExecutionFailed(format!(
                "{} printed nothing",
                build_command_string(self.program(), args)
            )));
        }
        Ok(out)
    }

    fn output(&self, args: &[String]) -> Result<String, TerminalError> {
        debug!(program = %self.program(), ?args, "running tmux");
        let output = Command::new(self.program())
            .args(args)
            .output()
            .map_err(|e| TerminalError::ExecutionFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(TerminalError::ExecutionFailed(format!(
                "{} exited with {}",
                build_command_string(self.program(), args),
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Instruction given to the agent in the merge window.
pub fn merge_prompt(branch: &str, tmux_program: &str, source_pane: &str) -> String {
    format!(
        "Merge the git branch '{}' into the current branch. Resolve any merge conflicts. \
         Once the merge is complete and committed, close the source session by running: \
         {} kill-pane -t {}",
        branch, tmux_program, source_pane
    )
}

fn session_name_args(pane: &str) -> Vec<String> {
    ["display-message", "-t", pane, "-p", "#{session_name}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn new_window_args(tmux_session: &str, dir: &Path) -> Vec<String> {
    vec![
        "new-window".to_string(),
        "-t".to_string(),
        tmux_session.to_string(),
        "-c".to_string(),
        dir.display().to_string(),
        "-P".to_string(),
        "-F".to_string(),
        "#{pane_id}".to_string(),
    ]
}

fn send_keys_args(pane: &str, keys: &str) -> Vec<String> {
    vec![
        "send-keys".to_string(),
        "-t".to_string(),
        pane.to_string(),
        keys.to_string(),
        "Enter".to_string(),
    ]
}

/// `agent "<prompt>"`, double-quoted for the pane's shell.
fn agent_command(agent: &str, prompt: &str) -> String {
    let mut quoted = String::with_capacity(prompt.len() + 2);
    quoted.push('"');
    for c in prompt.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    format!("{} {}", agent, quoted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::TerminalEnvironment;
    use crate::Status;

    const REPO: &str = "/src/app";

    fn session(id: &str, pane: &str, dir: &str) -> Session {
        Session::new(id, id, Status::Idle)
            .with_repository(REPO)
            .with_working_dir(dir)
            .with_pane(pane)
    }

    fn control(program: &str) -> TmuxControl {
        TmuxControl::with_environment(program, TerminalEnvironment::Plain)
    }

    fn refusal(source: &Session, target: &Session) -> TerminalError {
        // `/nonexistent` proves the guards fail before anything runs.
        control("/nonexistent/tmux-binary")
            .merge(source, target, &GitLog::with_program("/nonexistent/git"), "claude")
            .unwrap_err()
    }

    #[test]
    fn test_requires_same_repository() {
        let source = session("src", "%1", "/src/app-wt");
        let other = session("dst", "%2", "/src/other").with_repository("/src/other");
        assert!(matches!(refusal(&source, &other), TerminalError::NotMergeable(_)));

        let loose = Session::new("dst", "dst", Status::Idle)
            .with_working_dir("/tmp")
            .with_pane("%2");
        assert!(matches!(refusal(&source, &loose), TerminalError::NotMergeable(_)));
    }

    #[test]
    fn test_requires_working_dirs() {
        let source = session("src", "%1", "/src/app-wt");
        let mut target = session("dst", "%2", REPO);
        target.working_dir = None;
        let err = refusal(&source, &target);
        assert_eq!(err.to_string(), "cannot merge: session dst has no working directory");
    }

    #[test]
    fn test_requires_two_panes() {
        let mut source = session("src", "%1", "/src/app-wt");
        let target = session("dst", "%2", REPO);

        let same = session("dst", "%1", REPO);
        assert!(matches!(refusal(&source, &same), TerminalError::NotMergeable(_)));

        source.pane = None;
        assert!(matches!(refusal(&source, &target), TerminalError::NoPane(ref id) if id == "src"));
    }

    #[test]
    fn test_command_lines() {
        // echo prints its arguments, so every captured value is the command
        // line that produced it.
        let source = session("src", "%1", "/src/app-wt");
        let target = session("dst", "%2", REPO);

        let handoff = control("echo")
            .merge(&source, &target, &GitLog::with_program("echo"), "claude")
            .unwrap();

        assert_eq!(handoff.branch, "-C /src/app-wt branch --show-current");
        assert_eq!(handoff.tmux_session, "display-message -t %2 -p #{session_name}");
        assert_eq!(
            handoff.pane,
            "new-window -t display-message -t %2 -p #{session_name} -c /src/app -P -F #{pane_id}"
        );
        assert!(handoff.prompt.ends_with("by running: echo kill-pane -t %1"));
        assert!(handoff
            .prompt
            .starts_with("Merge the git branch '-C /src/app-wt branch --show-current' into"));
    }

    #[test]
    fn test_source_branch_failure() {
        let source = session("src", "%1", "/src/app-wt");
        let target = session("dst", "%2", REPO);
        let err = control("echo")
            .merge(&source, &target, &GitLog::with_program("false"), "claude")
            .unwrap_err();
        assert!(matches!(err, TerminalError::SourceBranch(_)));
    }

    #[test]
    fn test_tmux_failure() {
        let source = session("src", "%1", "/src/app-wt");
        let target = session("dst", "%2", REPO);
        let err = control("false")
            .merge(&source, &target, &GitLog::with_program("echo"), "claude")
            .unwrap_err();
        match err {
            TerminalError::ExecutionFailed(msg) => assert!(msg.contains("false display-message -t %2")),
            other => panic!("expected ExecutionFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_prompt() {
        assert_eq!(
            merge_prompt("feature", "tmux", "%7"),
            "Merge the git branch 'feature' into the current branch. Resolve any merge conflicts. \
             Once the merge is complete and committed, close the source session by running: \
             tmux kill-pane -t %7"
        );
    }

    #[test]
    fn test_agent_command_quotes_prompt() {
        assert_eq!(agent_command("claude", "plain"), "claude \"plain\"");
        assert_eq!(
            agent_command("claude", r#"say "hi" to $USER `now` \o/"#),
            r#"claude "say \"hi\" to \$USER \`now\` \\o/""#
        );
    }
}
