//! Score relay: the game process pushes one JSON line per finished round to
//! a single scoreboard subscriber over plain TCP.
//!
//! Wire format: `{"score":<int>,"timestamp":"YYYY-MM-DD HH:MM:SS"}\n`.
//! No length prefix, no acknowledgement. Delivery is at most once.

pub mod client;
pub mod server;

pub use client::{ClientOptions, ScoreboardClient};
pub use server::{RelayServer, SendOutcome, ServerOptions};

use std::io;

use serde::{Deserialize, Serialize};

/// strftime pattern of `ScoreRecord::timestamp`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Record delimiter
pub const DELIMITER: u8 = b'\n';

/// Longest line the client buffers before giving up on it
pub const MAX_LINE_BYTES: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("failed to bind score relay on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("score relay I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode score record: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("malformed score record: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Summary of one finished round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Combined score of both baskets
    pub score: i64,
    /// Local wall-clock time, `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
}

impl ScoreRecord {
    pub fn new(score: i64, timestamp: impl Into<String>) -> Self {
        Self {
            score,
            timestamp: timestamp.into(),
        }
    }

    /// Record stamped with the current local time
    pub fn stamped_now(score: i64) -> Self {
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        Self { score, timestamp }
    }
}

/// Serialize a record as one delimited line
pub fn encode_line(record: &ScoreRecord) -> Result<Vec<u8>, RelayError> {
    let mut line = serde_json::to_vec(record).map_err(RelayError::Encode)?;
    line.push(DELIMITER);
    Ok(line)
}

/// Parse one line (delimiter already stripped)
pub fn decode_line(line: &str) -> Result<ScoreRecord, RelayError> {
    serde_json::from_str(line.trim()).map_err(RelayError::Decode)
}

/// Reassembles delimited lines from arbitrary read chunks
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed (without delimiters).
    /// Blank lines are dropped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(end) = self.pending.iter().position(|b| *b == DELIMITER) {
            let raw: Vec<u8> = self.pending.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]).trim().to_string();
            if !line.is_empty() {
                lines.push(line);
            }
        }

        if self.pending.len() > MAX_LINE_BYTES {
            log::warn!(
                "Discarding {} buffered bytes without a delimiter",
                self.pending.len()
            );
            self.pending.clear();
        }

        lines
    }

    /// Forget any partial line (new connection)
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Destination for finished-round records
pub trait ScoreSink {
    fn dispatch(&mut self, record: &ScoreRecord);
}

impl ScoreSink for Vec<ScoreRecord> {
    fn dispatch(&mut self, record: &ScoreRecord) {
        self.push(record.clone());
    }
}

/// A missing relay discards records
impl<T: ScoreSink> ScoreSink for Option<T> {
    fn dispatch(&mut self, record: &ScoreRecord) {
        if let Some(sink) = self {
            sink.dispatch(record);
        }
    }
}
