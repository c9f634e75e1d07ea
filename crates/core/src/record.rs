//! Owned record types shared by the assembler and the log.
//!
//! A [`Record`] is one complete write command, delimiter included. It is never
//! shared: the assembler moves it into the log, and the log moves it back out
//! as an [`EvictedRecord`] when a newer record takes its slot.

use std::fmt;
use std::ops::Deref;

use crate::error::{Error, Result};

/// One complete, delimiter-terminated write command.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Record {
    bytes: Vec<u8>,
}

impl Record {
    /// Wrap bytes that the caller already owns.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Copy `bytes` into a freshly allocated record.
    ///
    /// # Errors
    /// Returns `Error::Alloc` if the copy cannot be allocated.
    pub fn copy_from(bytes: &[u8]) -> Result<Self> {
        let mut owned = Vec::new();
        owned
            .try_reserve_exact(bytes.len())
            .map_err(|e| Error::alloc(bytes.len(), e))?;
        owned.extend_from_slice(bytes);
        Ok(Self { bytes: owned })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Give up the record and take its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl Deref for Record {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsRef<[u8]> for Record {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Vec<u8>> for Record {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Records are usually text lines; show them that way when possible
        match std::str::from_utf8(&self.bytes) {
            Ok(text) => f.debug_tuple("Record").field(&text).finish(),
            Err(_) => f.debug_tuple("Record").field(&self.bytes).finish(),
        }
    }
}

/// The oldest record, pushed out of a full log by a newer insertion.
///
/// Ownership of the bytes is back with the caller, who is expected to account
/// for it and then drop it exactly once.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "an evicted record should be accounted for before it is dropped"]
pub struct EvictedRecord(Record);

impl EvictedRecord {
    pub(crate) fn new(record: Record) -> Self {
        Self(record)
    }

    pub fn record(&self) -> &Record {
        &self.0
    }

    pub fn into_record(self) -> Record {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
