//! Reconnecting connection loop.
//!
//! One attempt connects to the socket, sends [`SUBSCRIBE_REQUEST`], then
//! reads until the peer disconnects. Any failure waits `retry_interval`
//! before the next attempt. There is no retry limit.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, trace, warn};

use crate::client::{ClientEvent, FrameBuffer};
use crate::protocol::{decode_frame, SUBSCRIBE_REQUEST};

/// Wait between connection attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Size of a single socket read.
const READ_CHUNK_BYTES: usize = 4096;

/// Error types for a single connection attempt.
///
/// These never escape the loop; they are logged and retried.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The socket could not be reached (absent, refused, permissions).
    #[error("failed to connect to {path}")]
    Connect {
        /// Socket path that was dialed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Connected, but the subscribe request could not be written.
    #[error("failed to send subscribe request to {path}")]
    Subscribe {
        /// Socket path of the connection.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Stops a [`StreamClient`] from any thread.
///
/// Stopping interrupts a pending connect, read, or retry wait and closes the
/// socket. Calling [`StopHandle::stop`] more than once has no further effect.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    /// Requests the client to stop.
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    /// Returns `true` once [`StopHandle::stop`] has been called.
    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Why a connected read loop ended.
#[derive(Debug)]
enum StreamEnd {
    /// Peer closed the connection (read returned 0).
    Closed,
    /// Read failed.
    Failed(io::Error),
    /// Stop was requested.
    Stopped,
    /// Nobody is listening for events anymore.
    ReceiverGone,
}

/// Reconnecting client for the producer's session stream.
#[derive(Debug)]
pub struct StreamClient {
    socket_path: PathBuf,
    retry_interval: Duration,
    stop: StopHandle,
}

impl StreamClient {
    /// Creates a client for `socket_path` and the handle that stops it.
    pub fn new(socket_path: impl Into<PathBuf>, retry_interval: Duration) -> (Self, StopHandle) {
        let (tx, _rx) = watch::channel(false);
        let stop = StopHandle { tx: Arc::new(tx) };
        let client = Self {
            socket_path: socket_path.into(),
            retry_interval,
            stop: stop.clone(),
        };
        (client, stop)
    }

    /// Socket path this client dials.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Wait between connection attempts.
    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    /// Runs the client on a background task.
    pub fn spawn(self, events: mpsc::UnboundedSender<ClientEvent>) -> JoinHandle<()> {
        tokio::spawn(self.run(events))
    }

    /// Connects, streams, and reconnects until stopped or until `events` has
    /// no receiver left.
    pub async fn run(self, events: mpsc::UnboundedSender<ClientEvent>) {
        let mut shutdown = self.stop.tx.subscribe();
        let mut failed_attempts: u32 = 0;

        loop {
            if *shutdown.borrow() {
                break;
            }

            let attempt = tokio::select! {
                result = self.connect() => Some(result),
                _ = wait_for_stop(&mut shutdown) => None,
            };
            let Some(result) = attempt else {
                break;
            };

            match result {
                Ok(stream) => {
                    info!("Connected to session stream at {:?}", self.socket_path);
                    failed_attempts = 0;
                    if events.send(ClientEvent::Connectivity(true)).is_err() {
                        break;
                    }

                    let end = self.stream_frames(stream, &events, &mut shutdown).await;
                    match &end {
                        StreamEnd::Closed => info!("Session stream closed by producer"),
                        StreamEnd::Failed(e) => warn!(error = %e, "session stream read failed"),
                        StreamEnd::Stopped | StreamEnd::ReceiverGone => {}
                    }

                    if events.send(ClientEvent::Connectivity(false)).is_err() {
                        break;
                    }
                    if matches!(end, StreamEnd::Stopped | StreamEnd::ReceiverGone) {
                        break;
                    }
                }
                Err(e) => {
                    failed_attempts = failed_attempts.saturating_add(1);
                    debug!(
                        error = %e,
                        failed_attempts,
                        "connection attempt failed, retrying in {:?}",
                        self.retry_interval
                    );
                }
            }

            if events.is_closed() {
                break;
            }

            tokio::select! {
                _ = sleep(self.retry_interval) => {}
                _ = wait_for_stop(&mut shutdown) => break,
            }
        }

        debug!("Stream client for {:?} stopped", self.socket_path);
    }

    async fn connect(&self) -> Result<UnixStream, ClientError> {
        let mut stream =
            UnixStream::connect(&self.socket_path)
                .await
                .map_err(|source| ClientError::Connect {
                    path: self.socket_path.clone(),
                    source,
                })?;

        let subscribe = async {
            stream.write_all(SUBSCRIBE_REQUEST.as_bytes()).await?;
            stream.flush().await
        };
        subscribe.await.map_err(|source| ClientError::Subscribe {
            path: self.socket_path.clone(),
            source,
        })?;

        Ok(stream)
    }

    /// Reads until the connection ends. Dropping `stream` on return closes it.
    async fn stream_frames(
        &self,
        mut stream: UnixStream,
        events: &mpsc::UnboundedSender<ClientEvent>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> StreamEnd {
        let mut frames = FrameBuffer::new();
        let mut chunk = [0u8; READ_CHUNK_BYTES];

        loop {
            let read = tokio::select! {
                read = stream.read(&mut chunk) => read,
                _ = wait_for_stop(shutdown) => return StreamEnd::Stopped,
            };

            let n = match read {
                Ok(0) => return StreamEnd::Closed,
                Ok(n) => n,
                Err(e) => return StreamEnd::Failed(e),
            };

            for frame in frames.push(&chunk[..n]) {
                match decode_frame(&frame) {
                    Ok(op) => {
                        trace!(kind = op.kind(), "decoded operation");
                        if events.send(ClientEvent::Operation(op)).is_err() {
                            return StreamEnd::ReceiverGone;
                        }
                    }
                    Err(e) => debug!(error = %e, "dropping undecodable frame"),
                }
            }
        }
    }
}

/// Resolves once stop has been requested.
///
/// The client holds a sender for as long as it runs, so the channel cannot
/// close underneath this future.
async fn wait_for_stop(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stopped| *stopped).await;
}

#[cfg(test)]
mod tests;
