//! Stream client for the session producer.
//!
//! This module owns the single outbound connection to the producer's Unix
//! socket. It keeps that connection alive for the lifetime of the process:
//! connect failures and disconnects are retried after a fixed interval,
//! forever, until [`StopHandle::stop`] is called.
//!
//! # Events
//!
//! Everything the client observes is reported as a [`ClientEvent`] on an
//! unbounded channel, in the order it happened:
//!
//! - [`ClientEvent::Connectivity`] on every connected/disconnected
//!   transition (never two equal values in a row)
//! - [`ClientEvent::Operation`] for every frame that decodes
//!
//! Frames that fail to decode are dropped and logged at debug level.
//!
//! # Usage
//!
//! ```no_run
//! use agent_sidebar::client::{ClientEvent, StreamClient, DEFAULT_RETRY_INTERVAL};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (client, stop) = StreamClient::new("/tmp/agent-sessions.sock", DEFAULT_RETRY_INTERVAL);
//!     let (tx, mut rx) = mpsc::unbounded_channel();
//!     let task = client.spawn(tx);
//!     while let Some(event) = rx.recv().await {
//!         if let ClientEvent::Operation(op) = event {
//!             println!("{}", op.kind());
//!             stop.stop();
//!         }
//!     }
//!     let _ = task.await;
//! }
//! ```

pub mod connection;
pub mod framing;

pub use connection::{ClientError, StopHandle, StreamClient, DEFAULT_RETRY_INTERVAL};
pub use framing::FrameBuffer;

use crate::protocol::Operation;

/// Something the client observed on the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// The connection came up (`true`) or went down (`false`).
    Connectivity(bool),
    /// A decoded operation, delivered exactly once.
    Operation(Operation),
}
