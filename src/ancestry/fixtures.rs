//! In-memory history source for tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{parse_decorations, AncestryError, HistorySource};

/// Canned `git log --format=%D` output per (repository, branch).
///
/// Unknown branches fail like git does for a bad revision. Every query is
/// recorded.
#[derive(Debug, Default)]
pub(crate) struct StaticHistory {
    logs: HashMap<(PathBuf, String), String>,
    queries: RefCell<Vec<String>>,
}

impl StaticHistory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers raw log output for `branch` in `repository`.
    pub(crate) fn with_log(mut self, repository: &str, branch: &str, output: &str) -> Self {
        self.logs
            .insert((PathBuf::from(repository), branch.to_string()), output.to_string());
        self
    }

    /// Branches queried so far, in order.
    pub(crate) fn queries(&self) -> Vec<String> {
        self.queries.borrow().clone()
    }
}

impl HistorySource for StaticHistory {
    fn decorations(&self, repository: &Path, branch: &str) -> Result<Vec<Vec<String>>, AncestryError> {
        self.queries.borrow_mut().push(branch.to_string());
        self.logs
            .get(&(repository.to_path_buf(), branch.to_string()))
            .map(|output| parse_decorations(output))
            .ok_or_else(|| AncestryError::Failed {
                branch: branch.to_string(),
                code: Some(128),
                stderr: format!("fatal: bad revision '{}'", branch),
            })
    }
}
