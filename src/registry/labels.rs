//! Display label disambiguation.
//!
//! Sessions may share a label (two agents in the same directory). Every
//! label held by two or more sessions is rewritten to
//! `"<base> [<first 4 chars of id>]"`, where `<base>` is the label up to
//! its first `" ["`.
//!
//! A label that has already been rewritten is not restored when the
//! collision goes away; only a fresh label from the producer replaces it.
//! Note the split also drops any `" ["` text a producer put in a label
//! itself, once that label collides.

use std::collections::HashMap;

use crate::Session;

/// Marker separating the base label from the id suffix.
pub const SUFFIX_MARKER: &str = " [";

/// Number of id characters in the suffix.
pub const SUFFIX_ID_CHARS: usize = 4;

/// Label text before the first [`SUFFIX_MARKER`].
pub fn base_label(label: &str) -> &str {
    label.split(SUFFIX_MARKER).next().unwrap_or(label)
}

/// Label a colliding session is rewritten to.
pub fn suffixed_label(label: &str, id: &str) -> String {
    let prefix: String = id.chars().take(SUFFIX_ID_CHARS).collect();
    format!("{}{}{}]", base_label(label), SUFFIX_MARKER, prefix)
}

/// Rewrites colliding labels in place.
///
/// Passes repeat until no label changes, so running this on its own output
/// is a no-op. A pass only rewrites labels that differ from their suffixed
/// form, and a suffixed label maps to itself, so this terminates.
pub fn disambiguate(sessions: &mut [Session]) {
    while disambiguate_pass(sessions) {}
}

/// One counting pass. Returns `true` if any label changed.
fn disambiguate_pass(sessions: &mut [Session]) -> bool {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for session in sessions.iter() {
        *counts.entry(session.display_label.as_str()).or_default() += 1;
    }

    let rewrites: Vec<(usize, String)> = sessions
        .iter()
        .enumerate()
        .filter(|(_, s)| counts.get(s.display_label.as_str()).copied().unwrap_or(0) > 1)
        .map(|(i, s)| (i, suffixed_label(&s.display_label, &s.id)))
        .filter(|(i, label)| *label != sessions[*i].display_label)
        .collect();

    let changed = !rewrites.is_empty();
    for (i, label) in rewrites {
        sessions[i].display_label = label;
    }
    changed
}
