//! Shared command history: one assembler and one log behind one lock.
//!
//! This is the seam the device-file and socket shells plug into. Both paths
//! go through a single mutex, and each call holds it for exactly one logical
//! operation:
//!
//! - [`write`](CommandHistory::write): one `append` plus the `insert` of every
//!   record that fragment completed, with evictions released before unlock
//! - [`read_at`](CommandHistory::read_at): one resolve and one copy
//!
//! Nothing is held across calls, so a reader walking the history in small
//! chunks may observe writes that land between its calls. Callers that need a
//! consistent snapshot use [`contents`](CommandHistory::contents).
//!
//! # Example
//!
//! ```
//! use cmdlog_core::{CommandHistory, HistoryConfig};
//! use std::io::Read;
//!
//! let history = CommandHistory::new(HistoryConfig::default()).unwrap();
//! history.write(b"hel").unwrap();
//! history.write(b"lo\nworld\n").unwrap();
//!
//! let mut text = String::new();
//! history.cursor().read_to_string(&mut text).unwrap();
//! assert_eq!(text, "hello\nworld\n");
//! ```

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, trace, warn};

use crate::assembler::{Assembler, AssemblerStats, FramingPolicy, DEFAULT_DELIMITER};
use crate::error::{Error, Result};
use crate::metrics::Metrics;
use crate::record::Record;
use crate::record_log::{LogStats, RecordLog, DEFAULT_CAPACITY};

/// Construction parameters for a [`CommandHistory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Records retained before the oldest is evicted
    pub capacity: usize,

    /// Byte that terminates a write command
    pub delimiter: u8,

    /// How fragments with several delimiters are framed
    pub policy: FramingPolicy,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            delimiter: DEFAULT_DELIMITER,
            policy: FramingPolicy::Split,
        }
    }
}

/// Result of one write call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Fragment bytes consumed (always the whole fragment on success)
    pub accepted: usize,

    /// Records the fragment completed
    pub completed: usize,

    /// Records evicted to make room for them
    pub evicted: usize,
}

/// Everything guarded by the history lock.
#[derive(Debug)]
struct State {
    assembler: Assembler,
    log: RecordLog,
    metrics: Metrics,
}

/// Thread-safe bounded history of write commands.
#[derive(Debug)]
pub struct CommandHistory {
    config: HistoryConfig,
    state: Mutex<State>,
}

impl CommandHistory {
    /// Create an empty history.
    ///
    /// # Errors
    /// Returns `Error::InvalidCapacity` if `config.capacity` is zero.
    pub fn new(config: HistoryConfig) -> Result<Self> {
        let log = RecordLog::new(config.capacity)?;
        Ok(Self::with_log(config, log))
    }

    /// `log` must already have `config.capacity` slots.
    fn with_log(config: HistoryConfig, log: RecordLog) -> Self {
        debug_assert_eq!(log.capacity(), config.capacity);
        let state = State {
            assembler: Assembler::with_policy(config.delimiter, config.policy),
            log,
            metrics: Metrics::new(),
        };

        Self {
            config,
            state: Mutex::new(state),
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| Error::LockPoisoned)
    }

    /// Write path: frame `fragment` and retain whatever records it completes.
    ///
    /// # Errors
    /// - `Error::Alloc` if the fragment could not be buffered. Nothing was
    ///   written and the call may be retried.
    /// - `Error::LockPoisoned` if another holder panicked
    pub fn write(&self, fragment: &[u8]) -> Result<WriteOutcome> {
        let mut state = self.lock()?;
        let State {
            assembler,
            log,
            metrics,
        } = &mut *state;

        let records = match assembler.append(fragment) {
            Ok(result) => result.into_records(),
            Err(e) => {
                metrics.alloc_failures += 1;
                warn!(len = fragment.len(), error = %e, "fragment rejected");
                return Err(e);
            }
        };

        metrics.fragments_written += 1;
        metrics.bytes_written += fragment.len() as u64;

        let mut outcome = WriteOutcome {
            accepted: fragment.len(),
            completed: records.len(),
            evicted: 0,
        };

        for record in records {
            metrics.records_completed += 1;
            if let Some(evicted) = log.insert(record) {
                metrics.records_evicted += 1;
                metrics.bytes_evicted += evicted.len() as u64;
                outcome.evicted += 1;
                // Ownership is back with us; release it here, under the lock
                drop(evicted);
            }
        }

        trace!(
            accepted = outcome.accepted,
            completed = outcome.completed,
            evicted = outcome.evicted,
            "write"
        );
        Ok(outcome)
    }

    /// Read path: copy bytes starting at `offset` into `buf`.
    ///
    /// Returns the number of bytes copied, never more than what remains of the
    /// record holding `offset`. Returns 0 at end of data.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let mut state = self.lock()?;

        let n = match usize::try_from(offset) {
            Ok(offset) => state.log.read_at(offset, buf),
            Err(_) => 0,
        };

        state.metrics.reads += 1;
        state.metrics.bytes_read += n as u64;
        if n == 0 && !buf.is_empty() {
            state.metrics.reads_at_end += 1;
        }
        Ok(n)
    }

    /// Like [`read_at`](Self::read_at), advancing `pos` past the bytes read.
    pub fn read(&self, pos: &mut u64, buf: &mut [u8]) -> Result<usize> {
        let n = self.read_at(*pos, buf)?;
        *pos += n as u64;
        Ok(n)
    }

    /// A reader with its own position, starting at offset 0.
    pub fn cursor(&self) -> HistoryCursor<'_> {
        HistoryCursor {
            history: self,
            pos: 0,
        }
    }

    /// Every retained record concatenated, taken under a single lock.
    pub fn contents(&self) -> Result<Vec<u8>> {
        self.lock()?.log.to_bytes()
    }

    /// Total bytes currently readable.
    pub fn total_len(&self) -> Result<u64> {
        Ok(self.lock()?.log.total_len() as u64)
    }

    /// Drop an unterminated partial record, returning its length.
    pub fn discard_pending(&self) -> Result<usize> {
        let mut state = self.lock()?;
        let dropped = state.assembler.discard_pending();
        if dropped > 0 {
            state.metrics.partials_discarded += 1;
        }
        Ok(dropped)
    }

    /// Release every retained record and any partial record.
    ///
    /// Returns the retained records, oldest first.
    pub fn teardown(&self) -> Result<Vec<Record>> {
        let mut state = self.lock()?;
        let dropped = state.assembler.discard_pending();
        if dropped > 0 {
            state.metrics.partials_discarded += 1;
        }
        let released = state.log.teardown();
        debug!(records = released.len(), "command history torn down");
        Ok(released)
    }

    /// Snapshot of log and assembler state.
    pub fn stats(&self) -> Result<HistoryStats> {
        let state = self.lock()?;
        Ok(HistoryStats {
            log: state.log.stats(),
            assembler: state.assembler.stats(),
        })
    }

    /// Snapshot of the counters collected so far.
    pub fn metrics(&self) -> Result<Metrics> {
        Ok(self.lock()?.metrics.clone())
    }
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::with_log(HistoryConfig::default(), RecordLog::default())
    }
}

/// Combined statistics of a [`CommandHistory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryStats {
    pub log: LogStats,
    pub assembler: AssemblerStats,
}

/// Independent read position over a [`CommandHistory`].
///
/// Plays the role of an open file description: each cursor keeps its own
/// offset, and every `read` locks the history for a single chunk.
#[derive(Debug)]
pub struct HistoryCursor<'a> {
    history: &'a CommandHistory,
    pos: u64,
}

impl HistoryCursor<'_> {
    pub fn position(&self) -> u64 {
        self.pos
    }
}

impl Read for HistoryCursor<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.history.read(&mut self.pos, buf).map_err(into_io)
    }
}

impl Seek for HistoryCursor<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
            SeekFrom::End(delta) => {
                let end = self.history.total_len().map_err(into_io)?;
                end.checked_add_signed(delta)
            }
        };

        match target {
            Some(offset) => {
                self.pos = offset;
                Ok(offset)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative or overflowing position",
            )),
        }
    }
}

fn into_io(err: Error) -> io::Error {
    let kind = match err {
        Error::Alloc { .. } => io::ErrorKind::OutOfMemory,
        Error::InvalidCapacity(_) | Error::LockPoisoned => io::ErrorKind::Other,
    };
    io::Error::new(kind, err)
}
