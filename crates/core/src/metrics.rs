//! Metrics collection and reporting for a command history.
//!
//! This module provides observable insights into history behavior:
//! - Write traffic (fragments and bytes accepted)
//! - Framing (records completed, partial records discarded)
//! - Retention (records and bytes evicted)
//! - Read traffic (read calls, bytes returned, reads at end of data)
//!
//! # Thread Safety
//!
//! The `Metrics` struct is NOT thread-safe. [`CommandHistory`] keeps one
//! behind its lock and hands out clones.
//!
//! [`CommandHistory`]: crate::device::CommandHistory

use std::time::{Duration, Instant};

/// Counters for one command history.
#[derive(Debug, Clone)]
pub struct Metrics {
    // === Timing ===
    /// When the history was created
    pub start_time: Instant,

    /// When the run was marked complete
    pub end_time: Option<Instant>,

    // === Write path ===
    /// Fragments handed to the assembler
    pub fragments_written: u64,

    /// Total fragment bytes accepted
    pub bytes_written: u64,

    /// Fragments rejected because memory could not be reserved
    pub alloc_failures: u64,

    // === Framing ===
    /// Records completed by the assembler
    pub records_completed: u64,

    /// Unterminated partial records thrown away
    pub partials_discarded: u64,

    // === Retention ===
    /// Records pushed out of the full log
    pub records_evicted: u64,

    /// Bytes of evicted records
    pub bytes_evicted: u64,

    // === Read path ===
    /// Read calls served
    pub reads: u64,

    /// Bytes copied out to readers
    pub bytes_read: u64,

    /// Reads that found no more data
    pub reads_at_end: u64,
}

impl Metrics {
    /// Create new metrics with start time set to now.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            end_time: None,
            fragments_written: 0,
            bytes_written: 0,
            alloc_failures: 0,
            records_completed: 0,
            partials_discarded: 0,
            records_evicted: 0,
            bytes_evicted: 0,
            reads: 0,
            bytes_read: 0,
            reads_at_end: 0,
        }
    }

    /// Mark the run as complete.
    pub fn complete(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Get total duration (or current elapsed if not complete).
    pub fn duration(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    /// Fraction of completed records that were later evicted.
    ///
    /// Returns 0.0 if nothing has completed.
    pub fn eviction_rate(&self) -> f64 {
        if self.records_completed == 0 {
            0.0
        } else {
            self.records_evicted as f64 / self.records_completed as f64
        }
    }

    /// Mean fragment length in bytes.
    pub fn mean_fragment_len(&self) -> f64 {
        if self.fragments_written == 0 {
            0.0
        } else {
            self.bytes_written as f64 / self.fragments_written as f64
        }
    }

    /// Compute write throughput in bytes/second.
    pub fn throughput_bps(&self) -> f64 {
        let duration_secs = self.duration().as_secs_f64();
        if duration_secs == 0.0 {
            0.0
        } else {
            self.bytes_written as f64 / duration_secs
        }
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n=== History Summary ===");
        println!("Duration: {} ms", self.duration().as_millis());
        println!();

        println!("=== Writes ===");
        println!("Fragments: {}", self.fragments_written);
        println!("Bytes: {}", self.bytes_written);
        println!("Mean fragment: {:.1} bytes", self.mean_fragment_len());
        println!("Allocation failures: {}", self.alloc_failures);
        println!();

        println!("=== Records ===");
        println!("Completed: {}", self.records_completed);
        println!("Evicted: {} ({:.1}%)", self.records_evicted, self.eviction_rate() * 100.0);
        println!("Evicted bytes: {}", self.bytes_evicted);
        println!("Partials discarded: {}", self.partials_discarded);
        println!();

        println!("=== Reads ===");
        println!("Calls: {}", self.reads);
        println!("Bytes: {}", self.bytes_read);
        println!("End-of-data reads: {}", self.reads_at_end);
        println!();

        println!("=== Performance ===");
        println!("Write throughput: {:.2} MB/s", self.throughput_bps() / 1_000_000.0);
        println!();
    }

    /// Export metrics as a simple text format (for parsing/testing).
    pub fn export_text(&self) -> String {
        format!(
            "duration_ms={}\n\
             fragments_written={}\n\
             bytes_written={}\n\
             alloc_failures={}\n\
             records_completed={}\n\
             partials_discarded={}\n\
             records_evicted={}\n\
             bytes_evicted={}\n\
             eviction_rate={:.4}\n\
             reads={}\n\
             bytes_read={}\n\
             reads_at_end={}\n",
            self.duration().as_millis(),
            self.fragments_written,
            self.bytes_written,
            self.alloc_failures,
            self.records_completed,
            self.partials_discarded,
            self.records_evicted,
            self.bytes_evicted,
            self.eviction_rate(),
            self.reads,
            self.bytes_read,
            self.reads_at_end,
        )
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
