//! Record assembly from arbitrarily split write fragments.
//!
//! Writers hand over bytes in whatever pieces their transport delivered. The
//! assembler concatenates them into a pending buffer until the delimiter shows
//! up, then emits the accumulated bytes (delimiter included) as a [`Record`].
//!
//! # Design
//!
//! - **Unbounded pending line**: a partial record is never truncated; it grows
//!   until a delimiter arrives or the caller discards it
//! - **Hand-off, not copy**: the pending buffer itself becomes the first record
//!   of a completing fragment, and a fresh buffer takes its place
//! - **All-or-nothing**: every allocation an append needs is made before any
//!   state changes, so an allocation failure leaves the assembler untouched
//! - **No log coupling**: completed records are returned to the caller, who
//!   decides where they go
//!
//! # Multiple Delimiters in One Fragment
//!
//! Under [`FramingPolicy::Split`] (the default) every delimiter ends a record,
//! so `"a\nb\nc"` yields `"a\n"` and `"b\n"` with `"c"` left pending. Under
//! [`FramingPolicy::FirstDelimiter`] only the first delimiter counts and the
//! rest of that fragment rides along in the same record, so the same fragment
//! yields the single record `"a\nb\nc"`.
//!
//! # Thread Safety
//!
//! This structure is NOT thread-safe. Caller must synchronize access, see
//! [`CommandHistory`](crate::device::CommandHistory).

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::record::Record;

/// Delimiter used by the reference shells: line feed.
pub const DEFAULT_DELIMITER: u8 = b'\n';

/// How a fragment containing more than one delimiter is framed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FramingPolicy {
    /// Each delimiter completes a record; trailing bytes stay pending.
    #[default]
    Split,

    /// Only the first delimiter of a fragment completes a record, and the
    /// whole fragment is folded into it.
    FirstDelimiter,
}

/// Outcome of appending one fragment.
#[derive(Debug, PartialEq, Eq)]
pub enum AssemblyResult {
    /// No delimiter in the fragment; its bytes are pending.
    Incomplete,

    /// One or more records completed, oldest first. Never empty.
    Complete(Vec<Record>),
}

impl AssemblyResult {
    pub fn is_complete(&self) -> bool {
        matches!(self, AssemblyResult::Complete(_))
    }

    /// Completed records in order (empty when incomplete).
    pub fn into_records(self) -> Vec<Record> {
        match self {
            AssemblyResult::Incomplete => Vec::new(),
            AssemblyResult::Complete(records) => records,
        }
    }
}

/// Accumulates write fragments into delimiter-terminated records.
#[derive(Debug)]
pub struct Assembler {
    /// Byte that terminates a record
    delimiter: u8,

    /// Multi-delimiter framing behavior
    policy: FramingPolicy,

    /// Bytes of the record currently being assembled
    pending: Vec<u8>,

    /// Records emitted since construction
    records_completed: u64,

    /// Fragment bytes accepted since construction
    bytes_appended: u64,
}

impl Assembler {
    /// Create an assembler splitting on every `delimiter`.
    pub fn new(delimiter: u8) -> Self {
        Self::with_policy(delimiter, FramingPolicy::default())
    }

    /// Create an assembler with an explicit multi-delimiter policy.
    pub fn with_policy(delimiter: u8, policy: FramingPolicy) -> Self {
        Self {
            delimiter,
            policy,
            pending: Vec::new(),
            records_completed: 0,
            bytes_appended: 0,
        }
    }

    /// Append a fragment and return any records it completed.
    ///
    /// # Returns
    /// - `Ok(AssemblyResult::Incomplete)` if the fragment held no delimiter
    /// - `Ok(AssemblyResult::Complete(records))` with the finished records,
    ///   each ending in the delimiter (except under `FirstDelimiter`, where
    ///   the record ends with the fragment's last byte)
    ///
    /// # Errors
    /// - `Error::Alloc` if the pending buffer or a record could not grow. The
    ///   assembler is unchanged and the fragment may be retried.
    pub fn append(&mut self, fragment: &[u8]) -> Result<AssemblyResult> {
        let first = match fragment.iter().position(|&b| b == self.delimiter) {
            Some(pos) => pos,
            None => {
                self.pending
                    .try_reserve(fragment.len())
                    .map_err(|e| Error::alloc(fragment.len(), e))?;
                self.pending.extend_from_slice(fragment);
                self.bytes_appended += fragment.len() as u64;
                return Ok(AssemblyResult::Incomplete);
            }
        };

        let records = match self.policy {
            FramingPolicy::Split => self.split_all(fragment, first)?,
            FramingPolicy::FirstDelimiter => self.fold_into_one(fragment)?,
        };

        self.bytes_appended += fragment.len() as u64;
        self.records_completed += records.len() as u64;
        for record in &records {
            debug!(len = record.len(), "record completed");
        }

        Ok(AssemblyResult::Complete(records))
    }

    /// Frame every delimiter in `fragment`; `first` is the index of the first one.
    fn split_all(&mut self, fragment: &[u8], first: usize) -> Result<Vec<Record>> {
        let (head, mut rest) = fragment.split_at(first + 1);

        // Records wholly inside this fragment are copied out up front
        let mut tail = Vec::new();
        while let Some(pos) = rest.iter().position(|&b| b == self.delimiter) {
            let (line, next) = rest.split_at(pos + 1);
            tail.try_reserve(1).map_err(|e| Error::alloc(1, e))?;
            tail.push(Record::copy_from(line)?);
            rest = next;
        }

        let mut next_pending = Vec::new();
        next_pending
            .try_reserve(rest.len())
            .map_err(|e| Error::alloc(rest.len(), e))?;
        next_pending.extend_from_slice(rest);

        let mut records = Vec::new();
        records
            .try_reserve_exact(tail.len() + 1)
            .map_err(|e| Error::alloc(tail.len() + 1, e))?;
        self.pending
            .try_reserve_exact(head.len())
            .map_err(|e| Error::alloc(head.len(), e))?;

        // Nothing below can fail
        self.pending.extend_from_slice(head);
        let completed = std::mem::replace(&mut self.pending, next_pending);
        records.push(Record::new(completed));
        records.extend(tail);

        Ok(records)
    }

    /// Close the pending record with the whole fragment.
    fn fold_into_one(&mut self, fragment: &[u8]) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        records.try_reserve_exact(1).map_err(|e| Error::alloc(1, e))?;
        self.pending
            .try_reserve_exact(fragment.len())
            .map_err(|e| Error::alloc(fragment.len(), e))?;

        self.pending.extend_from_slice(fragment);
        records.push(Record::new(std::mem::take(&mut self.pending)));

        Ok(records)
    }

    /// Bytes of the unterminated record collected so far.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// True when no partial record is buffered.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    pub fn policy(&self) -> FramingPolicy {
        self.policy
    }

    /// Drop the unterminated record, returning how many bytes were discarded.
    ///
    /// Used when a writer goes away mid-line and its partial command should
    /// not be glued onto the next writer's bytes.
    pub fn discard_pending(&mut self) -> usize {
        let dropped = self.pending.len();
        if dropped > 0 {
            warn!(bytes = dropped, "discarding unterminated record");
        }
        self.pending = Vec::new();
        dropped
    }

    /// Get statistics about assembler state.
    pub fn stats(&self) -> AssemblerStats {
        AssemblerStats {
            pending_bytes: self.pending.len(),
            records_completed: self.records_completed,
            bytes_appended: self.bytes_appended,
        }
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

/// Statistics about assembler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblerStats {
    /// Bytes waiting for a delimiter
    pub pending_bytes: usize,

    /// Records emitted so far
    pub records_completed: u64,

    /// Total fragment bytes accepted
    pub bytes_appended: u64,
}
