//! Error types for the command history.
//!
//! The error taxonomy is deliberately narrow. Running past the end of the
//! retained data is not an error (reads simply return `None` or 0 bytes), and
//! a broken ring invariant is a defect that panics. What remains is allocation
//! failure, bad construction parameters and a poisoned lock.

use std::collections::TryReserveError;

use thiserror::Error;

/// Top-level error type for all operations in the crate.
///
/// Each variant corresponds to a specific failure domain:
/// - Allocation: growing the accumulation buffer or copying record bytes
/// - Capacity: constructing a log that could never hold a record
/// - Locking: the shared history was poisoned by a panicking holder
#[derive(Debug, Error)]
pub enum Error {
    /// Memory for a record or the pending buffer could not be reserved.
    ///
    /// The assembler and log are left exactly as they were before the call,
    /// so the caller may retry or drop the fragment.
    #[error("allocation of {requested} bytes failed: {source}")]
    Alloc {
        requested: usize,
        #[source]
        source: TryReserveError,
    },

    /// A record log must retain at least one record
    #[error("invalid log capacity {0}: must be at least 1")]
    InvalidCapacity(usize),

    /// The mutex guarding a shared history was poisoned
    #[error("command history lock poisoned")]
    LockPoisoned,
}

impl Error {
    pub(crate) fn alloc(requested: usize, source: TryReserveError) -> Self {
        Error::Alloc { requested, source }
    }

    /// Whether the failed operation may succeed if simply retried.
    ///
    /// Shells map this to their "try again" status (`-ENOMEM`/`EAGAIN` style)
    /// rather than tearing the session down.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Alloc { .. })
    }
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
