//! Repository grouping facade.
//!
//! Turns the registry's flat, sorted session list into the grouped view the
//! presentation layer draws: one group per repository, named after the
//! repository directory and ordered by [`crate::ancestry`], followed by an
//! [`OTHER_GROUP_NAME`] group for sessions outside any repository.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::ancestry::{order_entries, HistorySource};
use crate::Session;

/// Name of the group holding sessions with no repository.
pub const OTHER_GROUP_NAME: &str = "Other";

/// A session placed in the grouped view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEntry {
    /// The session itself.
    pub session: Session,
    /// Branch nesting level; 0 for roots.
    pub depth: usize,
}

impl SessionEntry {
    /// Creates an entry at `depth`.
    pub fn new(session: Session, depth: usize) -> Self {
        Self { session, depth }
    }

    /// Creates an entry at depth 0.
    pub fn root(session: Session) -> Self {
        Self::new(session, 0)
    }
}

/// Sessions sharing a repository, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGroup {
    /// Last path component of the repository, or [`OTHER_GROUP_NAME`].
    pub name: String,
    /// Repository root; `None` for the "Other" group.
    pub repository: Option<PathBuf>,
    /// Entries in display order.
    pub entries: Vec<SessionEntry>,
}

impl SessionGroup {
    /// Returns `true` for the group of sessions with no repository.
    pub fn is_other(&self) -> bool {
        self.repository.is_none()
    }
}

/// Partitions `sessions` by repository.
///
/// Repository groups come first, sorted by name case-insensitively (ties by
/// path), each ordered through [`order_entries`]. Sessions with no
/// repository follow in one "Other" group at depth 0, in input order. Empty
/// groups are never produced.
pub fn group_sessions(sessions: &[Session], history: &dyn HistorySource) -> Vec<SessionGroup> {
    let mut by_repository: BTreeMap<&Path, Vec<Session>> = BTreeMap::new();
    let mut other: Vec<Session> = Vec::new();

    for session in sessions {
        match session.repository.as_deref() {
            Some(repository) => by_repository
                .entry(repository)
                .or_default()
                .push(session.clone()),
            None => other.push(session.clone()),
        }
    }

    let mut groups: Vec<SessionGroup> = by_repository
        .into_iter()
        .map(|(repository, members)| SessionGroup {
            name: repository_name(repository),
            repository: Some(repository.to_path_buf()),
            entries: order_entries(repository, &members, history),
        })
        .collect();

    groups.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.repository.cmp(&b.repository))
    });

    if !other.is_empty() {
        groups.push(SessionGroup {
            name: OTHER_GROUP_NAME.to_string(),
            repository: None,
            entries: other.into_iter().map(SessionEntry::root).collect(),
        });
    }

    groups
}

/// Display name for a repository path.
pub fn repository_name(repository: &Path) -> String {
    repository
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| repository.display().to_string())
}

/// Best session to jump to: the first entry in display order with the
/// lowest focus priority (Attention, then Idle, then Working).
pub fn best_focus_entry(groups: &[SessionGroup]) -> Option<&SessionEntry> {
    best_entry_where(groups, |_| true)
}

/// Like [`best_focus_entry`], but only among sessions with a tmux pane,
/// which are the only ones that can be switched to.
pub fn best_activatable_entry(groups: &[SessionGroup]) -> Option<&SessionEntry> {
    best_entry_where(groups, |entry| entry.session.pane.is_some())
}

fn best_entry_where<F>(groups: &[SessionGroup], keep: F) -> Option<&SessionEntry>
where
    F: Fn(&SessionEntry) -> bool,
{
    groups
        .iter()
        .flat_map(|group| group.entries.iter())
        .filter(|entry| keep(entry))
        .min_by_key(|entry| entry.session.status.focus_priority())
}
