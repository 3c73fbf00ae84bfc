//! Tests for the crate root types.
//!
//! - `status` - Status parsing and priority policies
//! - `session` - Session construction and derived fields

mod session;
