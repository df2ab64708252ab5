//! A simple CLI for the mulpers library.

#![warn(clippy::all, clippy::pedantic)]

extern crate mulpers_common;
use mulpers_common::benchmark::{BenchmarkMode, run_benchmark};
use mulpers_common::registry::BestRegistry;
use mulpers_common::search::{LogReporter, SearchReporter, StopSignal, run_search};
use mulpers_common::single_thread::search_single_thread;
use mulpers_common::{
    CHUNK_SIZE, CLIENT_VERSION, MulpersError, PersistenceRecord, QUEUE_CAPACITY, SearchConfig,
    WORKER_COUNT,
};

use anyhow::Context;
use clap::Parser;
use clap::error::{ContextKind, ContextValue, ErrorKind};
use log::{error, warn};
use std::ffi::OsString;

const USAGE_HINT: &str =
    "Possible args are [any positive number for digit start count] and --singleThread";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// A positive number to start searching at that many digits.
    /// Anything unrecognized is reported and ignored.
    #[arg(value_name = "ARGS")]
    args: Vec<String>,

    /// Search on a single thread, without the worker pool or per-digit records
    #[arg(long, alias = "singleThread", env = "MULPERS_SINGLE_THREAD")]
    single_thread: bool,

    /// Run the search with this many workers
    #[arg(short, long, default_value_t = WORKER_COUNT, value_parser = parse_positive, env = "MULPERS_WORKERS")]
    workers: usize,

    /// Send candidates to the workers in batches of this size
    #[arg(long, default_value_t = CHUNK_SIZE, value_parser = parse_positive, env = "MULPERS_CHUNK_SIZE")]
    chunk_size: usize,

    /// Buffer this many batches before the producer waits for the workers
    #[arg(long, default_value_t = QUEUE_CAPACITY, env = "MULPERS_QUEUE_CAPACITY")]
    queue_capacity: usize,

    /// Run an offline benchmark
    #[arg(short, long, env = "MULPERS_BENCHMARK")]
    benchmark: Option<BenchmarkMode>,

    /// Print each new best as a line of JSON
    #[arg(long, env = "MULPERS_JSON")]
    json: bool,

    /// Suppress all output except results
    #[arg(short, long, env = "MULPERS_QUIET")]
    quiet: bool,

    /// Show additional output
    #[arg(short, long, env = "MULPERS_VERBOSE")]
    verbose: bool,
}

fn parse_positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// Parse the command line, setting aside every argument clap does not know so
/// it can be reported instead of ending the process.
/// Returns the parsed options and the arguments that were set aside.
fn parse_cli<I, T>(raw: I) -> Result<(Cli, Vec<String>), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut raw: Vec<OsString> = raw.into_iter().map(Into::into).collect();
    let mut unknown = Vec::new();
    loop {
        let e = match Cli::try_parse_from(raw.iter()) {
            Ok(cli) => return Ok((cli, unknown)),
            Err(e) if e.kind() == ErrorKind::UnknownArgument => e,
            Err(e) => return Err(e),
        };
        let Some(ContextValue::String(invalid)) = e.get(ContextKind::InvalidArg) else {
            return Err(e);
        };
        let with_value = format!("{invalid}=");
        // Skip the binary name
        let Some(index) = raw.iter().skip(1).position(|arg| {
            arg.to_str()
                .is_some_and(|arg| arg == invalid.as_str() || arg.starts_with(&with_value))
        }) else {
            return Err(e);
        };
        unknown.push(raw.remove(index + 1).to_string_lossy().into_owned());
    }
}

/// The positional arguments, read the same way as older versions of the search.
#[derive(Debug, PartialEq, Eq)]
struct LegacyArgs {
    start_digits: Option<u32>,
    single_thread: bool,
    invalid: Vec<MulpersError>,
    too_many: bool,
}

/// A positive integer sets the starting digit count and anything else is collected as invalid.
/// `typed_count` is the number of arguments on the command line, options included.
fn interpret_args(args: &[String], single_thread_flag: bool, typed_count: usize) -> LegacyArgs {
    let mut parsed = LegacyArgs {
        start_digits: None,
        single_thread: single_thread_flag,
        invalid: Vec::new(),
        too_many: typed_count > 2,
    };
    for arg in args {
        match arg.parse::<u32>() {
            Ok(n) if n > 0 => parsed.start_digits = Some(n),
            _ => parsed.invalid.push(MulpersError::InvalidInput {
                argument: arg.clone(),
            }),
        }
    }
    parsed
}

/// Prints each new best to stdout as JSON, with progress going to the log.
struct JsonReporter {
    progress: LogReporter,
}

impl SearchReporter for JsonReporter {
    fn digit_count_reached(&self, digit_count: u32) {
        self.progress.digit_count_reached(digit_count);
    }

    fn new_best(&self, record: &PersistenceRecord, _digit_count: u32) {
        match serde_json::to_string(record) {
            Ok(line) => println!("{line}"),
            Err(e) => error!("Failed to serialize {record:?}: {e}"),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn print_benchmark(mode: BenchmarkMode) -> anyhow::Result<()> {
    println!("Beginning benchmark:  {mode}");
    let summary = run_benchmark(mode).context("Benchmark failed")?;
    for (digit_count, record) in &summary.best {
        println!(
            "{digit_count:>4} digits: persistence {:>2}, n = {}",
            record.persistence(),
            record.n()
        );
    }
    let elapsed = summary.elapsed.as_secs_f64();
    println!(
        "✓ Processed {} candidates in {:.2}s ({:.2e} candidates/sec)",
        summary.candidates,
        elapsed,
        summary.candidates as f64 / elapsed
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let (cli, unknown) = parse_cli(std::env::args_os()).unwrap_or_else(|e| e.exit());

    // Set up logger
    let default_level = if cli.quiet {
        "warn"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let positional: Vec<String> = cli.args.iter().chain(&unknown).cloned().collect();
    let args = interpret_args(
        &positional,
        cli.single_thread,
        std::env::args_os().skip(1).count(),
    );
    if args.too_many {
        warn!("{USAGE_HINT}");
    }
    for e in &args.invalid {
        warn!("Ignoring argument: {e}");
    }
    let start_digits = args.start_digits.unwrap_or(1);

    if let Some(mode) = cli.benchmark {
        return print_benchmark(mode);
    }

    if !cli.quiet {
        let mode = if args.single_thread {
            "single-threaded mode".to_string()
        } else {
            format!("{} workers", cli.workers)
        };
        println!("Mulpers Client v{CLIENT_VERSION} started at {start_digits} digits, using {mode}.");
    }
    if cli.verbose {
        println!("CLI Inputs: {cli:?}");
    }

    // Without the pool every digit count goes by slowly enough to announce
    let progress = if args.single_thread {
        LogReporter::every_digit_count()
    } else {
        LogReporter::default()
    };
    let reporter: Box<dyn SearchReporter> = if cli.json {
        Box::new(JsonReporter { progress })
    } else {
        Box::new(progress)
    };

    // Nothing raises this; the search runs until the process is killed
    let stop = StopSignal::new();

    if args.single_thread {
        search_single_thread(start_digits, reporter.as_ref(), &stop)
            .context("Single-threaded search failed")?;
    } else {
        let config = SearchConfig {
            start_digits,
            workers: cli.workers,
            chunk_size: cli.chunk_size,
            queue_capacity: cli.queue_capacity,
        };
        let registry = BestRegistry::new();
        run_search(&config, &registry, reporter.as_ref(), &stop).context("Search failed")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_interpret_start_digits() {
        let parsed = interpret_args(&strings(&["12"]), true, 2);
        assert_eq!(
            parsed,
            LegacyArgs {
                start_digits: Some(12),
                single_thread: true,
                invalid: Vec::new(),
                too_many: false,
            }
        );
    }

    #[test]
    fn test_interpret_invalid_arguments_are_collected() {
        let parsed = interpret_args(&strings(&["abc", "0", "7"]), false, 3);
        assert_eq!(parsed.start_digits, Some(7));
        assert!(parsed.too_many);
        assert_eq!(
            parsed.invalid,
            vec![
                MulpersError::InvalidInput {
                    argument: "abc".to_string()
                },
                MulpersError::InvalidInput {
                    argument: "0".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_interpret_nothing() {
        let parsed = interpret_args(&[], false, 0);
        assert_eq!(parsed.start_digits, None);
        assert!(!parsed.single_thread);
        assert!(!parsed.too_many);
    }

    #[test]
    fn test_cli_parses_legacy_flag() {
        let (cli, unknown) = parse_cli(["mulpers", "25", "--singleThread"]).unwrap();
        assert!(unknown.is_empty());
        let parsed = interpret_args(&cli.args, cli.single_thread, 2);
        assert_eq!(parsed.start_digits, Some(25));
        assert!(parsed.single_thread);
        assert!(!parsed.too_many);
    }

    #[test]
    fn test_cli_unknown_arguments_are_set_aside() {
        let (cli, unknown) = parse_cli(["mulpers", "5", "--foo"]).unwrap();
        assert_eq!(cli.args, vec!["5".to_string()]);
        assert_eq!(unknown, vec!["--foo".to_string()]);

        let positional: Vec<String> = cli.args.iter().chain(&unknown).cloned().collect();
        let parsed = interpret_args(&positional, cli.single_thread, 2);
        assert_eq!(parsed.start_digits, Some(5));
        assert_eq!(
            parsed.invalid,
            vec![MulpersError::InvalidInput {
                argument: "--foo".to_string()
            }]
        );

        let (cli, unknown) = parse_cli(["mulpers", "-5"]).unwrap();
        assert!(cli.args.is_empty());
        assert_eq!(unknown, vec!["-5".to_string()]);

        let (_, unknown) = parse_cli(["mulpers", "--foo=bar", "--bar", "3"]).unwrap();
        assert_eq!(unknown, vec!["--foo=bar".to_string(), "--bar".to_string()]);
    }

    #[test]
    fn test_cli_known_options_still_parse_next_to_arguments() {
        let (cli, unknown) =
            parse_cli(["mulpers", "5", "--foo", "--json", "--workers", "8"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.workers, 8);
        assert_eq!(cli.args, vec!["5".to_string()]);
        assert_eq!(unknown, vec!["--foo".to_string()]);
    }

    #[test]
    fn test_cli_bad_values_are_still_errors() {
        assert!(parse_cli(["mulpers", "--workers", "0"]).is_err());
        assert!(parse_cli(["mulpers", "--benchmark", "huge"]).is_err());
    }

    #[test]
    fn test_usage_hint_counts_typed_options() {
        let (cli, _) = parse_cli(["mulpers", "5", "7", "--json"]).unwrap();
        let parsed = interpret_args(&cli.args, cli.single_thread, 3);
        assert!(parsed.too_many);
        assert_eq!(parsed.start_digits, Some(7));

        // A flag set only through the environment was never typed
        let parsed = interpret_args(&strings(&["5"]), true, 1);
        assert!(parsed.single_thread);
        assert!(!parsed.too_many);
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["mulpers"]).unwrap();
        assert_eq!(cli.workers, WORKER_COUNT);
        assert_eq!(cli.chunk_size, CHUNK_SIZE);
        assert_eq!(cli.queue_capacity, QUEUE_CAPACITY);
        assert!(cli.benchmark.is_none());
        assert!(Cli::try_parse_from(["mulpers", "--workers", "0"]).is_err());
    }

    #[test]
    fn test_cli_benchmark_mode() {
        let cli = Cli::try_parse_from(["mulpers", "--benchmark", "small"]).unwrap();
        assert_eq!(cli.benchmark, Some(BenchmarkMode::Small));
    }
}
