//! Configuration for the cmdlog application.
//!
//! Handles parsing command-line arguments and generating sensible defaults
//! (including randomized defaults that are reproducible with a seed).
//!
//! # Philosophy
//!
//! The tool should work with ZERO arguments, using intelligent defaults.
//! All defaults are printed so runs are reproducible.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::Parser;
use cmdlog_core::{FramingPolicy, HistoryConfig, DEFAULT_CAPACITY};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Command-line surface.
#[derive(Debug, Parser)]
#[command(name = "cmdlog")]
#[command(about = "Feed a byte stream through a bounded command history and read it back", long_about = None)]
struct Cli {
    /// Input file, `-` for stdin (default: generate sample commands)
    #[arg(long = "in", value_name = "PATH")]
    input: Option<PathBuf>,

    /// Output file for the retained history, `-` for stdout
    #[arg(long = "out", value_name = "PATH", default_value = "./history.out")]
    output: PathBuf,

    /// Random seed for determinism
    #[arg(long)]
    seed: Option<u64>,

    /// Write commands retained
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Record delimiter: a single character, an escape like `\n`, or hex like `0x0a`
    #[arg(long, default_value = "\\n", value_parser = parse_delimiter)]
    delimiter: u8,

    /// Honor only the first delimiter of each fragment
    #[arg(long)]
    first_delimiter_only: bool,

    /// Largest write fragment in bytes (default: random 1-64)
    #[arg(long, value_name = "N")]
    max_fragment: Option<usize>,

    /// Read chunk size in bytes (default: random 1-32)
    #[arg(long, value_name = "N")]
    read_chunk: Option<usize>,

    /// Lines of generated sample input
    #[arg(long, value_name = "N", default_value_t = 100)]
    sample_lines: usize,

    /// Print resolved configuration
    #[arg(long)]
    print_config: bool,

    /// Don't print metrics summary
    #[arg(long)]
    no_metrics: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Complete configuration for a run.
#[derive(Debug, Clone)]
pub struct Config {
    // === Files ===
    /// Input file path (None = generate sample, `-` = stdin)
    pub input_file: Option<PathBuf>,

    /// Output file path (`-` = stdout)
    pub output_file: PathBuf,

    // === History ===
    /// Capacity, delimiter and framing policy
    pub history: HistoryConfig,

    // === Traffic shape ===
    /// Seed for fragment sizes and sample data
    pub seed: u64,

    /// Largest write fragment in bytes
    pub max_fragment: usize,

    /// Read buffer size in bytes
    pub read_chunk: usize,

    /// Lines of generated sample input
    pub sample_lines: usize,

    // === Behavior ===
    /// Whether to print detailed config
    pub print_config: bool,

    /// Whether to print detailed metrics summary
    pub print_metrics: bool,

    /// Whether to log at debug level
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from the process arguments.
    ///
    /// `--help` prints usage and exits the process.
    pub fn from_env() -> Result<Self, String> {
        Self::from_args(std::env::args_os())
    }

    /// Parse configuration from an explicit argument list (first item is the
    /// program name).
    ///
    /// If --seed is provided, uses that seed for all randomness (fully deterministic).
    pub fn from_args<I, T>(args: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = match Cli::try_parse_from(args) {
            Ok(cli) => cli,
            Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                e.exit()
            }
            Err(e) => return Err(e.to_string()),
        };
        Self::from_cli(cli)
    }

    fn from_cli(cli: Cli) -> Result<Self, String> {
        if cli.capacity == 0 {
            return Err("--capacity must be at least 1".to_string());
        }
        if cli.max_fragment == Some(0) {
            return Err("--max-fragment must be at least 1".to_string());
        }
        if cli.read_chunk == Some(0) {
            return Err("--read-chunk must be at least 1".to_string());
        }

        // Determine seed (explicit or time-based)
        let seed = cli.seed.unwrap_or_else(|| {
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0)
        });

        // Generate defaults using seed
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let policy = if cli.first_delimiter_only {
            FramingPolicy::FirstDelimiter
        } else {
            FramingPolicy::Split
        };

        Ok(Config {
            input_file: cli.input,
            output_file: cli.output,
            history: HistoryConfig {
                capacity: cli.capacity,
                delimiter: cli.delimiter,
                policy,
            },
            seed,
            max_fragment: cli.max_fragment.unwrap_or_else(|| rng.gen_range(1..=64)),
            read_chunk: cli.read_chunk.unwrap_or_else(|| rng.gen_range(1..=32)),
            sample_lines: cli.sample_lines,
            print_config: cli.print_config,
            print_metrics: !cli.no_metrics,
            verbose: cli.verbose,
        })
    }

    /// Whether output goes to stdout rather than a file.
    pub fn output_is_stdout(&self) -> bool {
        self.output_file.as_os_str() == "-"
    }

    /// Print the configuration in human-readable form.
    pub fn print<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let input = match &self.input_file {
            None => "(generate sample)".to_string(),
            Some(path) => path.display().to_string(),
        };

        writeln!(out, "=== Configuration ===")?;
        writeln!(out, "Input file:  {}", input)?;
        writeln!(out, "Output file: {}", self.output_file.display())?;
        writeln!(out, "Seed: {}", self.seed)?;
        writeln!(out)?;
        writeln!(out, "=== History ===")?;
        writeln!(out, "Capacity: {} records", self.history.capacity)?;
        writeln!(out, "Delimiter: {:#04x}", self.history.delimiter)?;
        writeln!(out, "Framing: {:?}", self.history.policy)?;
        writeln!(out)?;
        writeln!(out, "=== Traffic ===")?;
        writeln!(out, "Max fragment: {} bytes", self.max_fragment)?;
        writeln!(out, "Read chunk: {} bytes", self.read_chunk)?;
        writeln!(out, "Sample lines: {}", self.sample_lines)?;
        writeln!(out)?;
        Ok(())
    }
}

/// Parse a delimiter argument into its byte.
fn parse_delimiter(s: &str) -> Result<u8, String> {
    match s {
        "\\n" => return Ok(b'\n'),
        "\\r" => return Ok(b'\r'),
        "\\t" => return Ok(b'\t'),
        "\\0" => return Ok(0),
        _ => {}
    }

    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u8::from_str_radix(hex, 16).map_err(|_| format!("invalid hex delimiter: {}", s));
    }

    match s.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(format!("delimiter must be a single byte, got {:?}", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_args(["cmdlog", "--seed", "42"]).unwrap();

        assert_eq!(config.seed, 42);
        assert_eq!(config.history, HistoryConfig::default());
        assert!(config.input_file.is_none());
        assert_eq!(config.output_file, PathBuf::from("./history.out"));
        assert!((1..=64).contains(&config.max_fragment));
        assert!((1..=32).contains(&config.read_chunk));
        assert!(config.print_metrics);
    }

    #[test]
    fn test_seeded_defaults_are_deterministic() {
        let a = Config::from_args(["cmdlog", "--seed", "7"]).unwrap();
        let b = Config::from_args(["cmdlog", "--seed", "7"]).unwrap();

        assert_eq!(a.max_fragment, b.max_fragment);
        assert_eq!(a.read_chunk, b.read_chunk);
    }

    #[test]
    fn test_explicit_values() {
        let config = Config::from_args([
            "cmdlog",
            "--in",
            "-",
            "--out",
            "-",
            "--capacity",
            "3",
            "--delimiter",
            ";",
            "--first-delimiter-only",
            "--max-fragment",
            "5",
            "--read-chunk",
            "1",
            "--no-metrics",
        ])
        .unwrap();

        assert_eq!(config.input_file, Some(PathBuf::from("-")));
        assert!(config.output_is_stdout());
        assert_eq!(config.history.capacity, 3);
        assert_eq!(config.history.delimiter, b';');
        assert_eq!(config.history.policy, FramingPolicy::FirstDelimiter);
        assert_eq!(config.max_fragment, 5);
        assert_eq!(config.read_chunk, 1);
        assert!(!config.print_metrics);
    }

    #[test]
    fn test_zero_sizes_rejected() {
        assert!(Config::from_args(["cmdlog", "--capacity", "0"]).is_err());
        assert!(Config::from_args(["cmdlog", "--max-fragment", "0"]).is_err());
        assert!(Config::from_args(["cmdlog", "--read-chunk", "0"]).is_err());
    }

    #[test]
    fn test_unknown_argument() {
        assert!(Config::from_args(["cmdlog", "--bogus"]).is_err());
    }

    #[test]
    fn test_print_config_writes_banner() {
        let config = Config::from_args(["cmdlog", "--seed", "3", "--capacity", "4"]).unwrap();

        let mut out = Vec::new();
        config.print(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("=== Configuration ==="));
        assert!(text.contains("Capacity: 4 records"));
        assert!(text.contains("Seed: 3"));
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter("\\n"), Ok(b'\n'));
        assert_eq!(parse_delimiter("\\0"), Ok(0));
        assert_eq!(parse_delimiter("0x0a"), Ok(b'\n'));
        assert_eq!(parse_delimiter("|"), Ok(b'|'));
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("0xzz").is_err());
        assert!(parse_delimiter("").is_err());
    }
}
