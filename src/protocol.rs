//! Wire types for the producer's JSON Lines stream.
//!
//! Every inbound frame is one JSON object carrying a `type` discriminator:
//!
//! ```text
//! {"type":"snapshot","sessions":[ ... ]}
//! {"type":"update","session":{ ... }}
//! {"type":"remove","session_id":"..."}
//! ```
//!
//! A frame that fails to decode is rejected on its own; the stream carries on.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

use crate::{Session, Status};

/// First frame sent after connecting.
pub const SUBSCRIBE_REQUEST: &str = "{\"type\":\"subscribe\"}\n";

/// Largest frame the decoder accepts, in bytes.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Fallback timestamp layout: whole seconds, no offset, read as UTC.
pub const COARSE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// One mutation from the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Full replace of the session set.
    Snapshot(Vec<Session>),
    /// Insert or replace keyed by session id.
    Upsert(Session),
    /// Remove by id; no-op when absent.
    Delete(String),
}

impl Operation {
    /// Wire discriminator for this variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Snapshot(_) => "snapshot",
            Operation::Upsert(_) => "update",
            Operation::Delete(_) => "remove",
        }
    }
}

/// Reasons a single frame can fail to decode.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The frame is larger than [`MAX_FRAME_BYTES`].
    #[error("frame of {0} bytes exceeds the 1 MiB limit")]
    FrameTooLarge(usize),

    /// Not JSON, or a payload with a missing or mistyped field.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The frame has no string `type` field.
    #[error("frame has no \"type\" discriminator")]
    MissingType,

    /// The `type` field names no known operation.
    #[error("unknown message type: {0}")]
    UnknownType(String),

    /// The variant's payload field is absent.
    #[error("{kind} frame is missing \"{field}\"")]
    MissingPayload {
        /// Discriminator of the frame.
        kind: &'static str,
        /// Name of the absent field.
        field: &'static str,
    },

    /// `last_activity` matches neither accepted layout.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Session as it appears on the wire.
#[derive(Debug, Deserialize)]
struct WireSession {
    session_id: String,
    slug: String,
    status: Status,
    last_activity: String,
    #[serde(default)]
    cwd: Option<String>,
    #[serde(default)]
    tmux_pane: Option<String>,
    #[serde(default)]
    git_repo: Option<String>,
    #[serde(default)]
    git_branch: Option<String>,
    #[serde(default)]
    input_tokens: Option<u64>,
    #[serde(default)]
    output_tokens: Option<u64>,
}

impl TryFrom<WireSession> for Session {
    type Error = DecodeError;

    fn try_from(wire: WireSession) -> Result<Self, Self::Error> {
        Ok(Session {
            last_activity: parse_timestamp(&wire.last_activity)?,
            id: wire.session_id,
            display_label: wire.slug,
            status: wire.status,
            working_dir: wire.cwd.map(PathBuf::from),
            pane: wire.tmux_pane,
            repository: wire.git_repo.map(PathBuf::from),
            branch: wire.git_branch,
            input_tokens: wire.input_tokens.unwrap_or(0),
            output_tokens: wire.output_tokens.unwrap_or(0),
        })
    }
}

/// Parses a `last_activity` value.
///
/// Tries RFC 3339 (fractional seconds optional) first, then
/// [`COARSE_TIMESTAMP_FORMAT`].
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DecodeError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, COARSE_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| DecodeError::InvalidTimestamp(raw.to_string()))
}

/// Decodes one frame (without its trailing newline) into an [`Operation`].
pub fn decode_frame(frame: &[u8]) -> Result<Operation, DecodeError> {
    if frame.len() > MAX_FRAME_BYTES {
        return Err(DecodeError::FrameTooLarge(frame.len()));
    }

    let mut value: Value = serde_json::from_slice(frame)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingType)?
        .to_string();

    match kind.as_str() {
        "snapshot" => {
            let sessions: Vec<WireSession> = take_payload(&mut value, "snapshot", "sessions")?;
            let sessions = sessions
                .into_iter()
                .map(Session::try_from)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Operation::Snapshot(sessions))
        }
        "update" => {
            let session: WireSession = take_payload(&mut value, "update", "session")?;
            Ok(Operation::Upsert(Session::try_from(session)?))
        }
        "remove" => {
            let session_id: String = take_payload(&mut value, "remove", "session_id")?;
            Ok(Operation::Delete(session_id))
        }
        _ => Err(DecodeError::UnknownType(kind)),
    }
}

fn take_payload<T: DeserializeOwned>(
    value: &mut Value,
    kind: &'static str,
    field: &'static str,
) -> Result<T, DecodeError> {
    let payload = value
        .get_mut(field)
        .map(Value::take)
        .ok_or(DecodeError::MissingPayload { kind, field })?;
    Ok(serde_json::from_value(payload)?)
}
