//! A module to run some basic offline benchmarks.
//!
//! Unlike the real search these are finite: every candidate within a fixed
//! window of digit counts is evaluated once, in parallel, and the best record
//! for each digit count is returned.

use crate::candidates::CandidateGenerator;
use crate::persistence::get_persistence;
use crate::registry::BestRegistry;
use crate::{CHUNK_SIZE, MulpersError, PersistenceRecord, digit_count};
use clap::ValueEnum;
use log::trace;
use malachite::natural::Natural;
use rayon::prelude::*;
use std::fmt;
use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

/// Different benchmark strategies.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum BenchmarkMode {
    /// Every candidate with 1 to 12 digits.
    Small,
    /// The default benchmark range: 1 to 20 digits.
    Default,
    /// A large benchmark range: 1 to 30 digits.
    Large,
}

impl BenchmarkMode {
    /// The digit counts covered by this benchmark.
    #[must_use]
    pub fn digit_counts(self) -> RangeInclusive<u32> {
        match self {
            BenchmarkMode::Small => 1..=12,
            BenchmarkMode::Default => 1..=20,
            BenchmarkMode::Large => 1..=30,
        }
    }
}

impl fmt::Display for BenchmarkMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Results of a benchmark run.
#[derive(Debug, Clone)]
pub struct BenchmarkSummary {
    pub candidates: usize,
    pub elapsed: Duration,
    /// Best record per digit count, in order of digit count.
    pub best: Vec<(u32, PersistenceRecord)>,
}

/// Evaluate every candidate in the benchmark's digit range.
///
/// # Errors
/// Returns an error if the generator breaks one of its invariants.
pub fn run_benchmark(mode: BenchmarkMode) -> Result<BenchmarkSummary, MulpersError> {
    let digit_counts = mode.digit_counts();
    let start_time = Instant::now();

    let candidates: Vec<Natural> = CandidateGenerator::new(*digit_counts.start())
        .take_while(|candidate| {
            candidate
                .as_ref()
                .map_or(true, |n| digit_count(n) <= *digit_counts.end())
        })
        .collect::<Result<_, _>>()?;
    trace!(
        "Generated {} candidates for benchmark {mode} in {:?}",
        candidates.len(),
        start_time.elapsed()
    );

    // Every candidate is offered, so ties always resolve to the smallest number
    let registry = BestRegistry::new();
    candidates.par_chunks(CHUNK_SIZE).for_each(|chunk| {
        for n in chunk {
            registry.conditional_update(n.clone(), get_persistence(n), digit_count(n));
        }
    });

    // Carry a record forward when a digit count's own candidates can't beat the one below it
    let mut previous = PersistenceRecord::zero();
    let best = digit_counts
        .map(|digit_count| {
            let mut record = registry.get_best(digit_count);
            if previous.persistence() > record.persistence() {
                record = previous.clone();
            }
            previous = record.clone();
            (digit_count, record)
        })
        .collect();

    Ok(BenchmarkSummary {
        candidates: candidates.len(),
        elapsed: start_time.elapsed(),
        best,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn test_benchmark_small() {
        let summary = run_benchmark(BenchmarkMode::Small).unwrap();
        assert_eq!(summary.candidates, 7125);
        assert_eq!(summary.best.len(), 12);

        let persistences: Vec<u32> = summary
            .best
            .iter()
            .map(|(_, record)| record.persistence())
            .collect();
        assert_eq!(persistences, vec![0, 4, 5, 6, 7, 7, 8, 9, 9, 10, 10, 10]);

        // Ties go to the smallest number, whatever order the chunks finished in
        let numbers: Vec<u64> = summary
            .best
            .iter()
            .map(|(_, record)| u64::try_from(record.n()).unwrap())
            .collect();
        assert_eq!(
            numbers,
            vec![
                2,
                77,
                679,
                6788,
                68889,
                266_688,
                2_677_889,
                26_888_999,
                266_666_668,
                3_778_888_999,
                26_666_677_889,
                26_666_677_889,
            ]
        );
    }

    #[test]
    fn test_benchmark_modes() {
        assert_eq!(BenchmarkMode::Small.digit_counts(), 1..=12);
        assert_eq!(BenchmarkMode::Default.digit_counts(), 1..=20);
        assert_eq!(BenchmarkMode::Large.digit_counts(), 1..=30);
        assert_eq!(BenchmarkMode::Default.to_string(), "Default");
    }
}
