//! Newline framing for the inbound byte stream.

use crate::protocol::MAX_FRAME_BYTES;

/// Accumulates partial reads and splits them into newline-delimited frames.
///
/// Bytes after the last newline are kept for the next [`FrameBuffer::push`].
/// A partial frame that grows past [`MAX_FRAME_BYTES`] is discarded up to
/// and including its terminating newline.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    pending: Vec<u8>,
    discarding: bool,
}

impl FrameBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and returns every complete, non-empty frame, without
    /// the trailing newline.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let (line, tail) = rest.split_at(pos);
            rest = &tail[1..];

            if self.discarding {
                self.discarding = false;
                self.pending.clear();
                continue;
            }

            self.pending.extend_from_slice(line);
            let frame = std::mem::take(&mut self.pending);
            if !frame.is_empty() {
                frames.push(frame);
            }
        }

        if !self.discarding {
            self.pending.extend_from_slice(rest);
            if self.pending.len() > MAX_FRAME_BYTES {
                tracing::debug!(
                    "discarding oversized partial frame ({} bytes)",
                    self.pending.len()
                );
                self.pending.clear();
                self.discarding = true;
            }
        }

        frames
    }

    /// Number of buffered bytes not yet terminated by a newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drops any buffered partial frame.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.discarding = false;
    }
}
