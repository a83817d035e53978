//! One-shot result channel between a dispatch unit and the aggregator
//!
//! Each channel carries exactly one length-prefixed frame: a 4-byte
//! big-endian payload length followed by a JSON-encoded [`HostResult`]. The
//! payload may not exceed the channel's byte budget. The in-memory buffer is
//! sized for one full frame, so the unit's single write completes without
//! waiting on the reader.
//!
//! Oversized results are never cut short. The writer substitutes a transport
//! failure naming the size and the budget, and the reader rejects any frame
//! that is empty, shorter than its declared length, larger than the budget or
//! not valid JSON.

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use thiserror::Error;
use tracing::{trace, warn};

use crate::result::{FailureKind, HostResult};

const HEADER_LEN: usize = 4;

/// Largest budget a frame header can describe
pub const MAX_BUDGET: usize = u32::MAX as usize;

/// Errors raised while moving a result across a channel
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The unit closed the channel without writing
    #[error("empty result payload")]
    Empty,

    /// Fewer bytes arrived than the frame declared
    #[error("truncated result payload: expected {expected} bytes, received {received}")]
    Truncated {
        /// Declared frame length (header included)
        expected: usize,
        /// Bytes actually received
        received: usize,
    },

    /// The payload is larger than the channel budget
    #[error("result payload of {size} bytes exceeds buffer size of {budget} bytes")]
    Oversized {
        /// Payload size
        size: usize,
        /// Channel budget
        budget: usize,
    },

    /// The payload could not be encoded or decoded
    #[error("malformed result payload: {0}")]
    Malformed(String),

    /// The channel failed underneath
    #[error("channel I/O error: {0}")]
    Io(String),
}

impl From<TransportError> for HostResult {
    fn from(err: TransportError) -> Self {
        HostResult::failed(FailureKind::Transport, err.to_string())
    }
}

/// Factory for channel pairs
#[derive(Debug, Clone, Copy)]
pub struct ResultChannel;

impl ResultChannel {
    /// Open a channel whose payload may hold up to `budget` bytes
    ///
    /// Budgets above [`MAX_BUDGET`] are capped to it.
    #[must_use]
    pub fn open(budget: usize) -> (ResultWriter, ResultReader) {
        let budget = budget.min(MAX_BUDGET);
        let (unit_end, parent_end) = tokio::io::duplex(budget.saturating_add(HEADER_LEN));
        (
            ResultWriter {
                stream: unit_end,
                budget,
            },
            ResultReader {
                stream: parent_end,
                budget,
            },
        )
    }
}

/// Unit side of a result channel
#[derive(Debug)]
pub struct ResultWriter {
    stream: DuplexStream,
    budget: usize,
}

impl ResultWriter {
    /// Write the single result frame and close the channel
    ///
    /// A result that would exceed the budget is replaced by a transport
    /// failure. If even that does not fit, nothing is written and the reader
    /// sees an empty channel.
    ///
    /// # Errors
    /// Returns `TransportError` if encoding or writing fails. The channel is
    /// closed either way.
    pub async fn send(mut self, result: &HostResult) -> Result<(), TransportError> {
        let mut payload =
            serde_json::to_vec(result).map_err(|e| TransportError::Malformed(e.to_string()))?;

        if payload.len() > self.budget {
            let oversized = TransportError::Oversized {
                size: payload.len(),
                budget: self.budget,
            };
            warn!(error = %oversized, "replacing oversized result");
            payload = serde_json::to_vec(&HostResult::from(oversized.clone()))
                .map_err(|e| TransportError::Malformed(e.to_string()))?;
            if payload.len() > self.budget {
                return Err(oversized);
            }
        }

        let len = u32::try_from(payload.len()).map_err(|_| TransportError::Oversized {
            size: payload.len(),
            budget: self.budget,
        })?;

        let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
        frame.extend_from_slice(&len.to_be_bytes());
        frame.extend_from_slice(&payload);

        self.stream
            .write_all(&frame)
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;
        self.stream
            .shutdown()
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;

        trace!(bytes = frame.len(), "result frame written");
        Ok(())
    }
}

/// Aggregator side of a result channel
#[derive(Debug)]
pub struct ResultReader {
    stream: DuplexStream,
    budget: usize,
}

impl ResultReader {
    /// Read the single result frame and close the channel
    ///
    /// Reads at most one frame's worth of bytes. Call once the writer has
    /// been dropped, otherwise this waits for it.
    ///
    /// # Errors
    /// Returns `TransportError` for empty, truncated, oversized or malformed
    /// frames.
    pub async fn receive(self) -> Result<HostResult, TransportError> {
        let Self { stream, budget } = self;
        let limit = u64::try_from(budget.saturating_add(HEADER_LEN + 1)).unwrap_or(u64::MAX);

        let mut buf = Vec::new();
        stream
            .take(limit)
            .read_to_end(&mut buf)
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;

        decode_frame(&buf, budget)
    }
}

fn decode_frame(buf: &[u8], budget: usize) -> Result<HostResult, TransportError> {
    if buf.is_empty() {
        return Err(TransportError::Empty);
    }

    let Some((header, payload)) = buf.split_first_chunk::<HEADER_LEN>() else {
        return Err(TransportError::Truncated {
            expected: HEADER_LEN,
            received: buf.len(),
        });
    };

    let declared = u32::from_be_bytes(*header) as usize;
    if declared > budget {
        return Err(TransportError::Oversized {
            size: declared,
            budget,
        });
    }
    if payload.len() < declared {
        return Err(TransportError::Truncated {
            expected: HEADER_LEN + declared,
            received: buf.len(),
        });
    }
    if payload.len() > declared {
        return Err(TransportError::Malformed(format!(
            "{} trailing bytes after frame",
            payload.len() - declared
        )));
    }
    if declared == 0 {
        return Err(TransportError::Empty);
    }

    serde_json::from_slice(payload).map_err(|e| TransportError::Malformed(e.to_string()))
}
