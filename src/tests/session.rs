//! Tests for Session construction and derived fields.

use crate::*;
use std::path::PathBuf;

#[test]
fn test_session_new_defaults() {
    let session = Session::new("abc123", "api", Status::Idle);
    assert_eq!(session.id, "abc123");
    assert_eq!(session.display_label, "api");
    assert_eq!(session.status, Status::Idle);
    assert!(session.working_dir.is_none());
    assert!(session.pane.is_none());
    assert!(session.repository.is_none());
    assert!(session.branch.is_none());
    assert_eq!(session.input_tokens, 0);
    assert_eq!(session.output_tokens, 0);
}

#[test]
fn test_session_builders() {
    let session = Session::new("s1", "web", Status::Working)
        .with_repository("/src/web")
        .with_branch("main")
        .with_pane("%4")
        .with_working_dir("/src/web/packages/ui");
    assert_eq!(session.repository, Some(PathBuf::from("/src/web")));
    assert_eq!(session.branch.as_deref(), Some("main"));
    assert_eq!(session.pane.as_deref(), Some("%4"));
    assert_eq!(
        session.working_dir,
        Some(PathBuf::from("/src/web/packages/ui"))
    );
}

#[test]
fn test_total_tokens() {
    let session = Session::new("s1", "web", Status::Idle).with_tokens(1200, 340);
    assert_eq!(session.total_tokens(), 1540);
}

#[test]
fn test_total_tokens_saturates() {
    let session = Session::new("s1", "web", Status::Idle).with_tokens(u64::MAX, 1);
    assert_eq!(session.total_tokens(), u64::MAX);
}
