//! Errors raised by the search.

use thiserror::Error;

/// Everything that can go wrong in the search.
///
/// None of these are operational failures: bad input is reported and skipped,
/// and a broken generator invariant means the candidate construction has a bug.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MulpersError {
    /// An argument or number that is neither a non-negative integer nor a known flag.
    #[error("invalid input: '{argument}'")]
    InvalidInput { argument: String },

    /// A generated digit string did not have the target length.
    #[error("generated candidate {digits} has {actual} digits, expected {expected}")]
    GeneratorInvariant {
        expected: usize,
        actual: usize,
        digits: String,
    },

    /// A generated digit string could not be parsed back into a number.
    #[error("generated candidate '{digits}' is not a decimal number")]
    UnparsableCandidate { digits: String },

    /// The producer, progress counter or worker threads could not be started.
    #[error("failed to start search threads: {reason}")]
    ThreadStart { reason: String },
}
