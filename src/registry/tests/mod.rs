//! Tests for the session registry.
//!
//! - `apply` - Snapshot, upsert, and delete semantics
//! - `ordering` - Status rank and label ordering
//! - `labels` - Label disambiguation through apply
//! - `subscribers` - Change notification


use crate::{Session, Status};

/// Shorthand for a session with no optional fields.
pub(super) fn session(id: &str, label: &str, status: Status) -> Session {
    Session::new(id, label, status)
}

/// Ids in registry order.
pub(super) fn ids(registry: &super::SessionRegistry) -> Vec<String> {
    registry.sessions().iter().map(|s| s.id.clone()).collect()
}

/// Labels in registry order.
pub(super) fn labels(registry: &super::SessionRegistry) -> Vec<String> {
    registry
        .sessions()
        .iter()
        .map(|s| s.display_label.clone())
        .collect()
}
