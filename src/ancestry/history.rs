//! Version-control history queries.
//!
//! The resolver only needs one question answered: for a branch, which ref
//! names decorate each commit on its simplified first-parent history, most
//! recent first. [`HistorySource`] is that seam; [`GitLog`] answers it by
//! running `git log`.

use std::path::Path;
use std::process::Command;

use super::AncestryError;

/// Default program used by [`GitLog`].
pub const DEFAULT_GIT_PROGRAM: &str = "git";

/// Prefix git puts on the ref HEAD points at.
const HEAD_PREFIX: &str = "HEAD -> ";

/// Namespace local branch names are resolved in.
const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Answers decoration-history queries for a repository.
pub trait HistorySource {
    /// Decoration sets of `branch`'s simplified first-parent history, tip
    /// first. Each inner vector holds the ref names on one commit.
    fn decorations(&self, repository: &Path, branch: &str) -> Result<Vec<Vec<String>>, AncestryError>;
}

/// Queries git through its command line.
#[derive(Debug, Clone)]
pub struct GitLog {
    program: String,
}

impl GitLog {
    /// Uses `git` from `PATH`.
    pub fn new() -> Self {
        Self::with_program(DEFAULT_GIT_PROGRAM)
    }

    /// Uses a specific git executable.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Program this source runs.
    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self, repository: &Path, branch: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-C")
            .arg(repository)
            .args(["log", "--simplify-by-decoration", "--first-parent", "--format=%D"])
            .arg(format!("{}{}", BRANCH_REF_PREFIX, branch))
            .arg("--");
        cmd
    }

    /// Branch checked out in `working_dir`.
    ///
    /// Fails on a detached HEAD, where git prints nothing.
    pub fn current_branch(&self, working_dir: &Path) -> Result<String, AncestryError> {
        let output = Command::new(&self.program)
            .arg("-C")
            .arg(working_dir)
            .args(["branch", "--show-current"])
            .output()
            .map_err(|source| AncestryError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = String::from_utf8(output.stdout)?;
        let branch = stdout.trim();
        if !output.status.success() || branch.is_empty() {
            return Err(AncestryError::Failed {
                branch: "HEAD".to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(branch.to_string())
    }
}

/// Rejects names git would read as an option.
fn check_branch_name(branch: &str) -> Result<(), AncestryError> {
    if branch.is_empty() || branch.starts_with('-') {
        return Err(AncestryError::InvalidBranch(branch.to_string()));
    }
    Ok(())
}

impl Default for GitLog {
    fn default() -> Self {
        Self::new()
    }
}

impl HistorySource for GitLog {
    fn decorations(&self, repository: &Path, branch: &str) -> Result<Vec<Vec<String>>, AncestryError> {
        check_branch_name(branch)?;
        let output = self
            .command(repository, branch)
            .output()
            .map_err(|source| AncestryError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(AncestryError::Failed {
                branch: branch.to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8(output.stdout)?;
        Ok(parse_decorations(&stdout))
    }
}

/// History source that never answers, making every branch a root.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHistory;

impl HistorySource for NoHistory {
    fn decorations(&self, _repository: &Path, _branch: &str) -> Result<Vec<Vec<String>>, AncestryError> {
        Err(AncestryError::Unavailable)
    }
}

impl<T: HistorySource + ?Sized> HistorySource for &T {
    fn decorations(&self, repository: &Path, branch: &str) -> Result<Vec<Vec<String>>, AncestryError> {
        (**self).decorations(repository, branch)
    }
}

impl<T: HistorySource + ?Sized> HistorySource for Box<T> {
    fn decorations(&self, repository: &Path, branch: &str) -> Result<Vec<Vec<String>>, AncestryError> {
        (**self).decorations(repository, branch)
    }
}

/// Parses `git log --format=%D` output.
///
/// Blank lines are dropped. Each remaining line is split on `", "` and the
/// `HEAD -> ` marker is removed from the ref it points at. Tags and
/// remote-qualified names are kept; filtering is the caller's business.
pub fn parse_decorations(output: &str) -> Vec<Vec<String>> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.split(", ")
                .map(str::trim)
                .map(|name| name.strip_prefix(HEAD_PREFIX).unwrap_or(name))
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect()
        })
        .collect()
}
