//! Sample input generation.
//!
//! When no input file is specified, we generate a stream of shell-like write
//! commands so the history has something realistic to retain.
//!
//! # Design
//!
//! Generated lines vary a lot in length:
//! - Short commands (a verb and a target)
//! - Medium commands with a few arguments
//! - Occasional long lines, so that single records span many fragments
//!
//! Every line ends with the requested delimiter.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const VERBS: &[&str] = &["echo", "set", "get", "push", "pop", "sync", "mark", "status"];
const TARGETS: &[&str] = &["alpha", "beta", "gamma", "delta", "led0", "uart1", "fifo", "log"];

/// Generate `lines` delimiter-terminated sample commands.
///
/// # Arguments
/// - `seed`: random seed for determinism
/// - `lines`: number of commands to generate
/// - `delimiter`: byte appended to each command
pub fn generate_sample_data(seed: u64, lines: usize, delimiter: u8) -> Vec<u8> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut data = Vec::new();

    for index in 0..lines {
        let verb = VERBS[rng.gen_range(0..VERBS.len())];
        let target = TARGETS[rng.gen_range(0..TARGETS.len())];
        let mut line = format!("{:04} {} {}", index, verb, target);

        match rng.gen_range(0..10) {
            // 50% bare command
            0..=4 => {}

            // 40% a few numeric arguments
            5..=8 => {
                for _ in 0..rng.gen_range(1..=4) {
                    line.push_str(&format!(" {}", rng.gen_range(0..10_000)));
                }
            }

            // 10% long payload
            _ => {
                let len = rng.gen_range(64..=512);
                line.push(' ');
                line.extend((0..len).map(|_| rng.gen_range(b'a'..=b'z') as char));
            }
        }

        // Keep generated text free of the delimiter itself
        let mut bytes = line.into_bytes();
        bytes.retain(|&b| b != delimiter);
        data.extend_from_slice(&bytes);
        data.push(delimiter);
    }

    data
}
