//! Fixed-capacity ring of the most recent records.
//!
//! The log keeps at most `capacity` records. Inserting into a full log moves
//! the oldest record out and hands it back to the caller. Readers address the
//! retained data as one flat byte stream: the concatenation of every live
//! record, oldest first.
//!
//! # Ring Layout
//!
//! ```text
//!  empty        |r/w                    |   read == write, !full
//!  partial      |r---------->w          |   live span read..write
//!  full         |------->r/w------------|   live span read..end, 0..write
//! ```
//!
//! The read-start cursor only moves when a full log evicts, so a live span
//! that wraps past the end of the slot array is always a full one. Every
//! configuration is still walked the same way: `len()` steps forward from the
//! read-start cursor, wrapping at the end of the slot array. No slot is ever
//! visited twice, and a vacant slot inside the live span is a broken invariant
//! that panics instead of yielding stale data.
//!
//! # Thread Safety
//!
//! This structure is NOT thread-safe. Caller must synchronize access or
//! use [`CommandHistory`](crate::device::CommandHistory).

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::record::{EvictedRecord, Record};

/// Number of write commands the reference shells retain.
pub const DEFAULT_CAPACITY: usize = 10;

/// Bounded, oldest-first record log with byte-offset addressing.
#[derive(Debug)]
pub struct RecordLog {
    /// One optional owned record per slot
    slots: Box<[Option<Record>]>,

    /// Next slot to fill
    write: usize,

    /// Oldest live slot
    read: usize,

    /// Disambiguates read == write between empty and full
    full: bool,

    /// Sum of the lengths of all live records
    live_bytes: usize,
}

impl RecordLog {
    /// Create an empty log retaining up to `capacity` records.
    ///
    /// # Errors
    /// Returns `Error::InvalidCapacity` if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity(capacity));
        }

        Ok(Self::with_slots(capacity))
    }

    fn with_slots(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            write: 0,
            read: 0,
            full: false,
            live_bytes: 0,
        }
    }

    /// Store `record` as the newest entry.
    ///
    /// # Returns
    /// - `None` if there was a free slot
    /// - `Some(evicted)` holding the oldest record if the log was full
    pub fn insert(&mut self, record: Record) -> Option<EvictedRecord> {
        let capacity = self.capacity();
        let incoming = record.len();

        let evicted = if self.full {
            let oldest = self.slots[self.write]
                .take()
                .expect("full log has every slot occupied");
            self.read = (self.read + 1) % capacity;
            self.live_bytes -= oldest.len();
            debug!(len = oldest.len(), "evicting oldest record");
            Some(EvictedRecord::new(oldest))
        } else {
            debug_assert!(self.slots[self.write].is_none(), "write cursor on a live slot");
            None
        };

        self.slots[self.write] = Some(record);
        self.write = (self.write + 1) % capacity;
        self.live_bytes += incoming;

        if !self.full && self.write == self.read {
            self.full = true;
        }

        trace!(
            len = incoming,
            records = self.len(),
            live_bytes = self.live_bytes,
            "record inserted"
        );
        evicted
    }

    /// Locate the byte at `global_offset` in the concatenation of live records.
    ///
    /// # Returns
    /// - `Some((record, offset_in_record))` for the record holding that byte.
    ///   A byte on a record boundary belongs to the later record, at offset 0.
    /// - `None` if `global_offset` is at or past the end of the retained data
    pub fn resolve(&self, global_offset: usize) -> Option<(&Record, usize)> {
        let mut remaining = global_offset;

        for record in self.iter() {
            if remaining < record.len() {
                return Some((record, remaining));
            }
            remaining -= record.len();
        }

        debug_assert!(
            global_offset >= self.live_bytes,
            "scan ended before the live byte count"
        );
        None
    }

    /// Copy bytes starting at `global_offset` into `buf`.
    ///
    /// At most one record is read per call, the way a character device
    /// returns one command at a time; callers loop until this returns 0.
    pub fn read_at(&self, global_offset: usize, buf: &mut [u8]) -> usize {
        let Some((record, offset)) = self.resolve(global_offset) else {
            return 0;
        };

        let available = &record.as_bytes()[offset..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        n
    }

    /// Concatenate every live record, oldest first.
    ///
    /// # Errors
    /// Returns `Error::Alloc` if the output buffer cannot be allocated.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.try_reserve_exact(self.live_bytes)
            .map_err(|e| Error::alloc(self.live_bytes, e))?;
        for record in self.iter() {
            out.extend_from_slice(record.as_bytes());
        }
        Ok(out)
    }

    /// Live records, oldest first.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Record> + '_ {
        let capacity = self.capacity();
        (0..self.len()).map(move |i| {
            self.slots[(self.read + i) % capacity]
                .as_ref()
                .expect("slot inside the live span is occupied")
        })
    }

    /// Release every record to the caller, oldest first, and reset to empty.
    pub fn teardown(&mut self) -> Vec<Record> {
        let capacity = self.capacity();
        let count = self.len();
        let mut released = Vec::with_capacity(count);

        for i in 0..count {
            let slot = &mut self.slots[(self.read + i) % capacity];
            released.push(slot.take().expect("slot inside the live span is occupied"));
        }

        debug!(records = count, bytes = self.live_bytes, "record log torn down");
        self.write = 0;
        self.read = 0;
        self.full = false;
        self.live_bytes = 0;
        released
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        if self.full {
            self.capacity()
        } else {
            (self.write + self.capacity() - self.read) % self.capacity()
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.full && self.write == self.read
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Total bytes addressable through [`resolve`](Self::resolve).
    pub fn total_len(&self) -> usize {
        self.live_bytes
    }

    pub fn state(&self) -> LogState {
        if self.full {
            LogState::Full
        } else if self.is_empty() {
            LogState::Empty
        } else {
            LogState::PartiallyFull
        }
    }

    /// Get statistics about current log state.
    pub fn stats(&self) -> LogStats {
        LogStats {
            records: self.len(),
            capacity: self.capacity(),
            live_bytes: self.live_bytes,
            state: self.state(),
        }
    }
}

impl Default for RecordLog {
    fn default() -> Self {
        Self::with_slots(DEFAULT_CAPACITY)
    }
}

/// Occupancy of the log as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogState {
    Empty,
    PartiallyFull,
    Full,
}

/// Statistics about log state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogStats {
    /// Records currently retained
    pub records: usize,

    /// Maximum records retained
    pub capacity: usize,

    /// Bytes across all retained records
    pub live_bytes: usize,

    /// Empty / partially full / full
    pub state: LogState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn rec(bytes: &[u8]) -> Record {
        Record::from(bytes.to_vec())
    }

    fn numbered(i: usize) -> Record {
        Record::from(format!("write{}\n", i).into_bytes())
    }

    fn read_all(log: &RecordLog) -> Vec<u8> {
        let mut out = Vec::new();
        let mut offset = 0;
        while let Some((record, in_record)) = log.resolve(offset) {
            out.push(record[in_record]);
            offset += 1;
        }
        out
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(RecordLog::new(0), Err(Error::InvalidCapacity(0))));
    }

    #[test]
    fn test_empty_log() {
        let log = RecordLog::new(10).unwrap();
        assert!(log.resolve(0).is_none());
        assert!(log.is_empty());
        assert_eq!(log.state(), LogState::Empty);
        assert_eq!(log.len(), 0);
        assert_eq!(log.total_len(), 0);
    }

    #[test]
    fn test_default_capacity() {
        let log = RecordLog::default();
        assert_eq!(log.capacity(), DEFAULT_CAPACITY);
        assert!(log.is_empty());
    }

    #[test]
    fn test_round_trip_two_records() {
        let mut log = RecordLog::new(2).unwrap();
        assert!(log.insert(rec(b"hello\n")).is_none());
        assert!(log.insert(rec(b"world\n")).is_none());

        assert!(log.is_full());
        assert_eq!(read_all(&log), b"hello\nworld\n");
        assert!(log.resolve(12).is_none());
    }

    #[test]
    fn test_boundary_belongs_to_next_record() {
        let mut log = RecordLog::new(4).unwrap();
        assert!(log.insert(rec(b"abc\n")).is_none());
        assert!(log.insert(rec(b"de\n")).is_none());

        let (record, offset) = log.resolve(3).unwrap();
        assert_eq!(record.as_bytes(), b"abc\n");
        assert_eq!(offset, 3);

        let (record, offset) = log.resolve(4).unwrap();
        assert_eq!(record.as_bytes(), b"de\n");
        assert_eq!(offset, 0);

        assert!(log.resolve(7).is_none());
    }

    #[test]
    fn test_eleventh_insert_evicts_first() {
        let mut log = RecordLog::new(10).unwrap();
        for i in 1..=10 {
            assert!(log.insert(numbered(i)).is_none());
        }

        let evicted = log.insert(numbered(11)).expect("full log must evict");
        assert_eq!(evicted.record().as_bytes(), b"write1\n");

        let (first, offset) = log.resolve(0).unwrap();
        assert_eq!(first.as_bytes(), b"write2\n");
        assert_eq!(offset, 0);
        assert_eq!(log.len(), 10);
    }

    #[test]
    fn test_evictions_are_fifo() {
        for capacity in 1..=6 {
            let mut log = RecordLog::new(capacity).unwrap();
            let mut evicted = Vec::new();

            for i in 0..capacity * 3 {
                if let Some(old) = log.insert(numbered(i)) {
                    evicted.push(old.into_record());
                }
            }

            let expected: Vec<Record> = (0..capacity * 2).map(numbered).collect();
            assert_eq!(evicted, expected, "capacity {}", capacity);
        }
    }

    #[test]
    fn test_capacity_invariant_keeps_newest() {
        let mut log = RecordLog::new(4).unwrap();
        for i in 0..23 {
            let _ = log.insert(numbered(i));
        }

        let kept: Vec<&Record> = log.iter().collect();
        let expected: Vec<Record> = (19..23).map(numbered).collect();
        assert_eq!(kept.len(), 4);
        for (got, want) in kept.iter().zip(expected.iter()) {
            assert_eq!(*got, want);
        }
    }

    #[test]
    fn test_evicted_bytes_unreachable() {
        let mut log = RecordLog::new(2).unwrap();
        assert!(log.insert(rec(b"secret\n")).is_none());
        assert!(log.insert(rec(b"b\n")).is_none());
        let evicted = log.insert(rec(b"c\n")).unwrap();
        assert_eq!(evicted.record().as_bytes(), b"secret\n");

        let contents = read_all(&log);
        assert_eq!(contents, b"b\nc\n");
        assert!(!contents.windows(6).any(|w| w == b"secret"));
    }

    #[test]
    fn test_refill_after_teardown() {
        let mut log = RecordLog::new(4).unwrap();
        for i in 0..6 {
            let _ = log.insert(numbered(i));
        }
        let released = log.teardown();
        assert_eq!(released.len(), 4);

        for i in 0..3 {
            assert!(log.insert(numbered(i)).is_none());
        }
        assert_eq!(log.state(), LogState::PartiallyFull);
        assert_eq!(read_all(&log), b"write0\nwrite1\nwrite2\n");
    }

    #[test]
    fn test_resolve_matches_concatenation() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for capacity in [1, 2, 3, 10] {
            let mut log = RecordLog::new(capacity).unwrap();
            let mut inserted: Vec<Vec<u8>> = Vec::new();

            for _ in 0..capacity * 4 {
                let len = rng.gen_range(0..12);
                let mut bytes: Vec<u8> = (0..len).map(|_| rng.gen_range(b'a'..=b'z')).collect();
                bytes.push(b'\n');
                inserted.push(bytes.clone());
                let _ = log.insert(Record::from(bytes));

                let live = &inserted[inserted.len().saturating_sub(capacity)..];
                let flat: Vec<u8> = live.concat();
                assert_eq!(log.total_len(), flat.len());

                // Walk every offset and compare with direct indexing
                let mut g = 0;
                for (index, bytes) in live.iter().enumerate() {
                    for in_record in 0..bytes.len() {
                        let (record, offset) = log.resolve(g).unwrap();
                        assert_eq!(record.as_bytes(), live[index].as_slice());
                        assert_eq!(offset, in_record);
                        assert_eq!(record[offset], flat[g]);
                        g += 1;
                    }
                }
                assert!(log.resolve(flat.len()).is_none());
            }
        }
    }

    #[test]
    fn test_read_at_stops_at_record_boundary() {
        let mut log = RecordLog::new(3).unwrap();
        assert!(log.insert(rec(b"first\n")).is_none());
        assert!(log.insert(rec(b"second\n")).is_none());

        let mut buf = [0u8; 64];
        let n = log.read_at(0, &mut buf);
        assert_eq!(&buf[..n], b"first\n");

        let n = log.read_at(2, &mut buf);
        assert_eq!(&buf[..n], b"rst\n");

        let mut small = [0u8; 3];
        let n = log.read_at(6, &mut small);
        assert_eq!(&small[..n], b"sec");

        assert_eq!(log.read_at(13, &mut buf), 0);
    }

    #[test]
    fn test_to_bytes() {
        let mut log = RecordLog::new(2).unwrap();
        for line in [&b"a\n"[..], b"bb\n", b"ccc\n"] {
            let _ = log.insert(rec(line));
        }
        assert_eq!(log.to_bytes().unwrap(), b"bb\nccc\n");
    }

    #[test]
    fn test_teardown_releases_oldest_first() {
        let mut log = RecordLog::new(3).unwrap();
        for i in 0..5 {
            let _ = log.insert(numbered(i));
        }

        let released = log.teardown();
        let expected: Vec<Record> = (2..5).map(numbered).collect();
        assert_eq!(released, expected);

        assert!(log.is_empty());
        assert_eq!(log.total_len(), 0);
        assert!(log.resolve(0).is_none());
        assert!(log.insert(numbered(9)).is_none());
    }

    #[test]
    fn test_stats() {
        let mut log = RecordLog::new(2).unwrap();
        assert!(log.insert(rec(b"xy\n")).is_none());

        let stats = log.stats();
        assert_eq!(stats.records, 1);
        assert_eq!(stats.capacity, 2);
        assert_eq!(stats.live_bytes, 3);
        assert_eq!(stats.state, LogState::PartiallyFull);
    }

    #[test]
    fn test_empty_records_are_skipped_by_resolve() {
        let mut log = RecordLog::new(3).unwrap();
        assert!(log.insert(rec(b"")).is_none());
        assert!(log.insert(rec(b"z\n")).is_none());

        let (record, offset) = log.resolve(0).unwrap();
        assert_eq!(record.as_bytes(), b"z\n");
        assert_eq!(offset, 0);
    }
}
