//! One end-to-end pass: fragment the input, write it, read the history back.
//!
//! This is the shell around the core. It plays both transports at once: the
//! write side hands the history randomly sized fragments (as a socket or a
//! `write(2)` caller would), and the read side drains it through a cursor in
//! fixed-size chunks (as repeated `read(2)` calls would).

use std::io::Read;

use anyhow::{Context, Result};
use cmdlog_core::{CommandHistory, Metrics};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::config::Config;

/// Attempts per fragment before an allocation failure is fatal
const MAX_WRITE_ATTEMPTS: usize = 3;

/// What a run produced.
#[derive(Debug)]
pub struct RunReport {
    /// Bytes read back from the history
    pub output: Vec<u8>,

    /// Input bytes that ended up in completed records
    pub completed_input: usize,

    /// Trailing input bytes never terminated by a delimiter
    pub unterminated: usize,

    /// Records left in the history
    pub retained: usize,

    /// Counters collected by the history
    pub metrics: Metrics,
}

impl RunReport {
    /// The retained history must be exactly the tail of the completed input.
    pub fn verify(&self, input: &[u8], capacity: usize) -> bool {
        let completed = &input[..self.completed_input];
        let expected_records = (self.metrics.records_completed as usize).min(capacity);

        completed.ends_with(&self.output) && self.retained == expected_records
    }
}

/// Drive `input` through a fresh history configured from `config`.
pub fn run(config: &Config, input: &[u8]) -> Result<RunReport> {
    let history = CommandHistory::new(config.history).context("failed to create history")?;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

    // === Write path ===
    let mut rest = input;
    let mut fragments = 0usize;
    while !rest.is_empty() {
        let len = rng.gen_range(1..=config.max_fragment).min(rest.len());
        let (fragment, next) = rest.split_at(len);
        write_with_retry(&history, fragment)?;
        fragments += 1;
        rest = next;
    }
    debug!(fragments, bytes = input.len(), "input written");

    let stats = history.stats().context("failed to read history stats")?;
    let unterminated = stats.assembler.pending_bytes;
    if unterminated > 0 {
        warn!(bytes = unterminated, "input ends with an unterminated command");
    }

    // === Read path ===
    let mut output = Vec::new();
    let mut cursor = history.cursor();
    let mut buf = vec![0u8; config.read_chunk];
    loop {
        let n = cursor.read(&mut buf).context("failed to read history")?;
        if n == 0 {
            break;
        }
        output.extend_from_slice(&buf[..n]);
    }

    let mut metrics = history.metrics().context("failed to read metrics")?;
    metrics.complete();

    info!(
        retained = stats.log.records,
        bytes = output.len(),
        evicted = metrics.records_evicted,
        "history read back"
    );

    Ok(RunReport {
        output,
        completed_input: input.len() - unterminated,
        unterminated,
        retained: stats.log.records,
        metrics,
    })
}

fn write_with_retry(history: &CommandHistory, fragment: &[u8]) -> Result<()> {
    let mut attempt = 1;
    loop {
        match history.write(fragment) {
            Ok(_) => return Ok(()),
            Err(e) if e.is_retryable() && attempt < MAX_WRITE_ATTEMPTS => {
                warn!(attempt, error = %e, "write failed, retrying");
                attempt += 1;
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to write {} byte fragment", fragment.len()));
            }
        }
    }
}
