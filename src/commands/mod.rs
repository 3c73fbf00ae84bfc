//! Command implementations for the asb CLI.
//!
//! - `config` - Configuration file commands (path, validate)
//! - `view` - Stream-backed commands (watch, list, focus, merge)

pub(crate) mod config;
pub(crate) mod view;

pub(crate) use config::*;
pub(crate) use view::*;
