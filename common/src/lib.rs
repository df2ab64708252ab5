//! A library with common utilities for searching for numbers with record
//! multiplicative persistence.
//!
//! The multiplicative persistence of a number is how many times its decimal
//! digits must be multiplied together before a single digit remains. The
//! search walks a pruned, canonical stream of candidates in order of digit
//! count and keeps the best persistence seen for every digit count.

pub mod benchmark;
pub mod candidates;
pub mod error;
pub mod persistence;
pub mod registry;
pub mod search;
pub mod single_thread;

pub use error::MulpersError;

use malachite::natural::Natural;
use malachite::base::num::basic::traits::Zero;
use serde::{Serialize, Serializer};

pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of candidates grouped into each batch sent to the workers.
pub const CHUNK_SIZE: usize = 100;

/// Number of concurrent evaluator workers in the pool.
pub const WORKER_COUNT: usize = 100;

/// Number of batches the queue holds before the producer blocks.
pub const QUEUE_CAPACITY: usize = 100;

/// Get the number of decimal digits in a number. Zero has one digit.
#[must_use]
pub fn digit_count(n: &Natural) -> u32 {
    u32::try_from(n.to_string().len()).unwrap_or(u32::MAX)
}

/// A number together with its persistence.
/// The digit count is always derived from the number itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistenceRecord {
    #[serde(serialize_with = "serialize_natural_to_string")]
    n: Natural,
    persistence: u32,
    digit_count: u32,
}

impl PersistenceRecord {
    #[must_use]
    pub fn new(n: Natural, persistence: u32) -> Self {
        let digit_count = digit_count(&n);
        Self {
            n,
            persistence,
            digit_count,
        }
    }

    /// The record every search starts from: zero, with no digits and no persistence.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            n: Natural::ZERO,
            persistence: 0,
            digit_count: 0,
        }
    }

    #[must_use]
    pub fn n(&self) -> &Natural {
        &self.n
    }

    #[must_use]
    pub fn persistence(&self) -> u32 {
        self.persistence
    }

    #[must_use]
    pub fn digit_count(&self) -> u32 {
        self.digit_count
    }
}

/// Settings for the concurrent search pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    /// The first digit count to generate candidates for.
    pub start_digits: u32,
    /// Number of evaluator workers.
    pub workers: usize,
    /// Number of candidates per batch.
    pub chunk_size: usize,
    /// Number of batches buffered between the producer and the workers.
    pub queue_capacity: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            start_digits: 1,
            workers: WORKER_COUNT,
            chunk_size: CHUNK_SIZE,
            queue_capacity: QUEUE_CAPACITY,
        }
    }
}

/// Serialize arbitrarily-large numbers as decimal strings so JSON consumers never lose precision.
///
/// # Errors
/// Returns an error if the serializer rejects the string.
pub fn serialize_natural_to_string<S>(n: &Natural, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&n.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_digit_count() {
        assert_eq!(digit_count(&Natural::ZERO), 1);
        assert_eq!(digit_count(&Natural::from(9u32)), 1);
        assert_eq!(digit_count(&Natural::from(10u32)), 2);
        assert_eq!(
            digit_count(&Natural::from_str("277777788888899").unwrap()),
            15
        );
    }

    #[test]
    fn test_record_digit_count_is_derived() {
        let record = PersistenceRecord::new(Natural::from(679u32), 5);
        assert_eq!(record.digit_count(), 3);
        assert_eq!(record.persistence(), 5);
        assert_eq!(record.n(), &Natural::from(679u32));

        let zero = PersistenceRecord::zero();
        assert_eq!(zero.digit_count(), 0);
        assert_eq!(zero.persistence(), 0);
        assert_eq!(zero.n(), &Natural::ZERO);
    }

    #[test]
    fn test_record_serializes_number_as_string() {
        let record = PersistenceRecord::new(Natural::from_str("277777788888899").unwrap(), 11);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"n":"277777788888899","persistence":11,"digit_count":15}"#
        );
    }

    #[test]
    fn test_default_config() {
        let config = SearchConfig::default();
        assert_eq!(config.start_digits, 1);
        assert_eq!(config.workers, 100);
        assert_eq!(config.chunk_size, 100);
        assert_eq!(config.queue_capacity, 100);
    }
}
