//! Text rendering for the CLI.

use chrono::{DateTime, Utc};
use std::fmt::Write;

use crate::grouping::{SessionEntry, SessionGroup};

/// Compact token count: `950`, `1.4k`, `12k`, `1.4M`. Zero renders empty.
pub fn format_tokens(n: u64) -> String {
    if n == 0 {
        return String::new();
    }
    if n < 1_000 {
        return n.to_string();
    }
    if n < 10_000 {
        return format!("{:.1}k", n as f64 / 1_000.0);
    }
    if n < 1_000_000 {
        return format!("{}k", n / 1_000);
    }
    format!("{:.1}M", n as f64 / 1_000_000.0)
}

/// Age of `from` relative to `now`: `just now`, `42s`, `5m`, `3h`, `2d`.
///
/// Timestamps in the future count as zero.
pub fn relative_time(from: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - from).num_seconds().max(0);
    match secs {
        0..=4 => "just now".to_string(),
        5..=59 => format!("{}s", secs),
        60..=3_599 => format!("{}m", secs / 60),
        3_600..=86_399 => format!("{}h", secs / 3_600),
        _ => format!("{}d", secs / 86_400),
    }
}

/// Renders the grouped view as an indented tree, one line per session.
///
/// ```text
/// api
///   💬 api  main  12k  5m
///     ⚡ fix-login  fix-login  950  just now
/// Other
///   ✓ scratch  2h
/// ```
pub fn render_groups(groups: &[SessionGroup], now: DateTime<Utc>) -> String {
    let mut out = String::new();
    for group in groups {
        out.push_str(&group.name);
        out.push('\n');
        for entry in &group.entries {
            out.push_str(&render_entry(entry, now));
            out.push('\n');
        }
    }
    out
}

fn render_entry(entry: &SessionEntry, now: DateTime<Utc>) -> String {
    let session = &entry.session;
    let mut line = "  ".repeat(entry.depth + 1);
    let _ = write!(line, "{} {}", session.status.icon(), session.display_label);

    let tokens = format_tokens(session.total_tokens());
    let age = relative_time(session.last_activity, now);
    let columns = [
        session.branch.as_deref().unwrap_or(""),
        tokens.as_str(),
        age.as_str(),
    ];
    for column in columns.iter().filter(|c| !c.is_empty()) {
        line.push_str("  ");
        line.push_str(column);
    }
    line
}
