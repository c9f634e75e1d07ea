//! cmdlog-core: bounded history of delimiter-terminated write commands
//!
//! This library keeps the most recent N "write commands" a device or
//! daemon has received and serves them back as one flat, byte-addressable
//! stream:
//! - Writers hand over fragments split at arbitrary points
//! - Fragments are joined until a delimiter completes a record
//! - Only the newest N records are kept; older ones are evicted
//! - Readers address the concatenation of live records by byte offset and
//!   stream it out in chunks across repeated calls
//!
//! # Architecture
//!
//! The system is designed around clear module boundaries:
//! - `record`: owned record and eviction types
//! - `assembler`: fragment accumulation and delimiter framing
//! - `record_log`: fixed-capacity ring with offset resolution
//! - `device`: the two above behind one lock, with write/read paths
//! - `metrics`: observable history behavior
//!
//! The assembler and the log know nothing of each other; `device` composes
//! them and owns the locking discipline.
//!
//! # Design Principles
//!
//! - **Single owner**: every record lives in exactly one place, and eviction
//!   moves it out rather than freeing it behind the caller's back
//! - **Bounded retention**: the log never holds more than its capacity
//! - **Recoverable allocation**: memory exhaustion is an error, not a panic,
//!   and leaves state untouched
//! - **No globals**: every history is an explicit value owned by its shell

pub mod assembler;
pub mod device;
pub mod error;
pub mod metrics;
pub mod record;
pub mod record_log;

// Re-export commonly used types
pub use assembler::{Assembler, AssemblyResult, FramingPolicy, DEFAULT_DELIMITER};
pub use device::{CommandHistory, HistoryConfig, HistoryCursor, HistoryStats, WriteOutcome};
pub use error::{Error, Result};
pub use metrics::Metrics;
pub use record::{EvictedRecord, Record};
pub use record_log::{LogState, LogStats, RecordLog, DEFAULT_CAPACITY};
