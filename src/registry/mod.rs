//! Canonical session set.
//!
//! [`SessionRegistry`] owns every [`Session`] the producer has reported and
//! is the only place they change. Each [`SessionRegistry::apply`] runs the
//! same pipeline:
//!
//! 1. mutate the set (snapshot replace, upsert, or delete)
//! 2. disambiguate colliding display labels ([`labels`])
//! 3. stable-sort by status rank, then label
//! 4. notify subscribers
//!
//! The registry is not synchronized. It is meant to be owned by a single
//! apply context (see [`crate::console`]), which serializes every call.

pub mod labels;

use std::collections::HashMap;
use std::fmt;

use crate::ancestry::HistorySource;
use crate::grouping::{group_sessions, SessionGroup};
use crate::protocol::Operation;
use crate::Session;

/// Change notification handler.
pub type ChangeHandler = Box<dyn Fn() + Send>;

/// Ordered, disambiguated set of sessions keyed by id.
///
/// # Example
///
/// ```
/// use agent_sidebar::{Operation, Session, SessionRegistry, Status};
///
/// let mut registry = SessionRegistry::new();
/// registry.apply(Operation::Snapshot(vec![
///     Session::new("1111", "api", Status::Idle),
///     Session::new("2222", "api", Status::Attention),
/// ]));
///
/// let labels: Vec<_> = registry.sessions().iter().map(|s| s.display_label.as_str()).collect();
/// assert_eq!(labels, ["api [2222]", "api [1111]"]);
/// ```
pub struct SessionRegistry {
    sessions: Vec<Session>,
    subscribers: Vec<ChangeHandler>,
    revision: u64,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            sessions: Vec::new(),
            subscribers: Vec::new(),
            revision: 0,
        }
    }

    /// Applies one operation, then relabels, re-sorts, and notifies.
    ///
    /// Every operation is total: deleting an absent id and upserting a new
    /// one are both defined and never fail.
    pub fn apply(&mut self, op: Operation) {
        match op {
            Operation::Snapshot(sessions) => self.replace_all(sessions),
            Operation::Upsert(session) => {
                match self.sessions.iter_mut().find(|s| s.id == session.id) {
                    Some(existing) => *existing = session,
                    None => self.sessions.push(session),
                }
            }
            Operation::Delete(id) => self.sessions.retain(|s| s.id != id),
        }

        labels::disambiguate(&mut self.sessions);
        sort_sessions(&mut self.sessions);
        self.revision = self.revision.wrapping_add(1);

        tracing::trace!(
            revision = self.revision,
            sessions = self.sessions.len(),
            "registry updated"
        );

        for handler in &self.subscribers {
            handler();
        }
    }

    /// Current sessions in display order.
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Looks up a session by id.
    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Number of sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` when no sessions are known.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Registers a handler invoked after every apply.
    ///
    /// Handlers run synchronously on the applying thread, in registration
    /// order, once the registry is fully updated.
    pub fn subscribe<F>(&mut self, handler: F)
    where
        F: Fn() + Send + 'static,
    {
        self.subscribers.push(Box::new(handler));
    }

    /// Number of registered handlers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Number of operations applied so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Groups the current sessions by repository, ordering each group by
    /// branch ancestry.
    pub fn groups(&self, history: &dyn HistorySource) -> Vec<SessionGroup> {
        group_sessions(&self.sessions, history)
    }

    /// Full replace. A repeated id keeps its last occurrence.
    fn replace_all(&mut self, sessions: Vec<Session>) {
        let mut index: HashMap<String, usize> = HashMap::with_capacity(sessions.len());
        let mut unique: Vec<Session> = Vec::with_capacity(sessions.len());

        for session in sessions {
            match index.get(&session.id) {
                Some(&i) => unique[i] = session,
                None => {
                    index.insert(session.id.clone(), unique.len());
                    unique.push(session);
                }
            }
        }

        self.sessions = unique;
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions)
            .field("subscriber_count", &self.subscribers.len())
            .field("revision", &self.revision)
            .finish()
    }
}

/// Stable sort: status rank first, then display label.
fn sort_sessions(sessions: &mut [Session]) {
    sessions.sort_by(|a, b| {
        a.status
            .list_priority()
            .cmp(&b.status.list_priority())
            .then_with(|| a.display_label.cmp(&b.display_label))
    });
}

#[cfg(test)]
mod tests;
