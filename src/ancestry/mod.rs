//! Branch ancestry resolution.
//!
//! Sessions in one repository often sit on related branches: `feature`
//! forked from `main`, `fix` forked from `feature`. This module recovers
//! that nesting from git history so the sidebar can show it as a tree.
//!
//! For a repository whose sessions reference two or more distinct branches
//! (the *active set*):
//!
//! 1. each active branch's decorated first-parent history is queried
//!    through a [`HistorySource`]
//! 2. [`find_parent`] picks the nearest active ancestor from it
//! 3. [`BranchForest`] resolves depths and breaks cycles
//! 4. [`order_entries`] emits sessions in depth-first order
//!
//! Query failures never propagate: a branch whose history cannot be read
//! simply has no parent.

pub mod forest;
pub mod history;

#[cfg(test)]
pub(crate) mod fixtures;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;
use std::path::Path;
use std::string::FromUtf8Error;

use thiserror::Error;
use tracing::debug;

use crate::grouping::SessionEntry;
use crate::Session;

pub use forest::BranchForest;
pub use history::{parse_decorations, GitLog, HistorySource, NoHistory, DEFAULT_GIT_PROGRAM};

/// Error types for history queries.
#[derive(Error, Debug)]
pub enum AncestryError {
    /// The history program could not be started.
    #[error("failed to run {program}")]
    Spawn {
        /// Program that was invoked.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The history program exited unsuccessfully (unknown branch, not a
    /// repository).
    #[error("history query for {branch} failed (exit code {code:?}): {stderr}")]
    Failed {
        /// Branch that was queried.
        branch: String,
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
        /// Trimmed standard error.
        stderr: String,
    },

    /// The history output was not valid UTF-8.
    #[error("history output is not valid UTF-8")]
    NonUtf8(#[from] FromUtf8Error),

    /// History queries are disabled.
    #[error("history queries are disabled")]
    Unavailable,

    /// The branch name cannot be passed to git safely.
    #[error("refusing to query branch {0:?}")]
    InvalidBranch(String),
}

/// Finds `branch`'s nearest ancestor in `active`.
///
/// The first decoration set belongs to the branch's own tip and is skipped.
/// Tags (`tag: v1`) and names containing `/` (remote-tracking refs) are
/// ignored, which also means slash-named branches are never chosen.
pub fn find_parent(decorations: &[Vec<String>], branch: &str, active: &BTreeSet<String>) -> Option<String> {
    decorations
        .iter()
        .skip(1)
        .flatten()
        .map(String::as_str)
        .filter(|name| !is_ignored_ref(name))
        .find(|name| *name != branch && active.contains(*name))
        .map(str::to_string)
}

fn is_ignored_ref(name: &str) -> bool {
    name.starts_with("tag: ") || name.contains('/')
}

/// Orders one repository's sessions by branch ancestry.
///
/// With fewer than two distinct branches every session gets depth 0 in its
/// existing order and `history` is not consulted. Otherwise sessions are
/// emitted branch by branch in depth-first order, each branch's sessions in
/// their existing order, followed by sessions with no branch at depth 0.
pub fn order_entries(repository: &Path, sessions: &[Session], history: &dyn HistorySource) -> Vec<SessionEntry> {
    let active: BTreeSet<String> = sessions.iter().filter_map(|s| s.branch.clone()).collect();

    if active.len() < 2 {
        return sessions.iter().cloned().map(SessionEntry::root).collect();
    }

    let parents: BTreeMap<String, Option<String>> = active
        .iter()
        .map(|branch| {
            let parent = resolve_parent(repository, branch, &active, history);
            (branch.clone(), parent)
        })
        .collect();

    let forest = BranchForest::build(&parents);

    let mut by_branch: HashMap<&str, Vec<&Session>> = HashMap::new();
    let mut unbranched: Vec<&Session> = Vec::new();
    for session in sessions {
        match session.branch.as_deref() {
            Some(branch) => by_branch.entry(branch).or_default().push(session),
            None => unbranched.push(session),
        }
    }

    let mut entries = Vec::with_capacity(sessions.len());
    for (branch, depth) in forest.preorder() {
        for session in by_branch.remove(branch).unwrap_or_default() {
            entries.push(SessionEntry::new(session.clone(), depth));
        }
    }
    entries.extend(unbranched.into_iter().cloned().map(SessionEntry::root));
    entries
}

fn resolve_parent(
    repository: &Path,
    branch: &str,
    active: &BTreeSet<String>,
    history: &dyn HistorySource,
) -> Option<String> {
    match history.decorations(repository, branch) {
        Ok(decorations) => find_parent(&decorations, branch, active),
        Err(e) => {
            debug!(
                repository = %repository.display(),
                branch,
                error = %e,
                "branch history unavailable, treating as root"
            );
            None
        }
    }
}
