//! A module for generating the canonical candidates worth testing.
//!
//! Persistence does not depend on the order of the digits, so each multiset
//! of digits is only emitted once, as its smallest arrangement (non-decreasing
//! digits). Zeros and ones are never generated: a zero ends the chain at once
//! and a one only makes the number longer. The digits 2, 3, 4 and 5 each
//! appear at most once; the remaining length is split between 6, 7, 8 and 9.
//!
//! A few combinations are skipped because they can always be rewritten as a
//! candidate that is no longer:
//!  1. 2 together with 3, 4 or 5 (2*3 = 6, 2*4 = 8, 2*5 = 10).
//!  2. 3, 4 and 5 together (3*4*5 = 60).
//!  3. 5 together with any 6 or 8 (five times an even digit ends in zero).
//!
//! All candidates of one digit count are emitted before any of the next. The
//! order within one digit count is an implementation detail.

use crate::MulpersError;
use malachite::natural::Natural;
use std::str::FromStr;

/// Number of combinations of the single-use digits 2, 3, 4 and 5.
const NUM_PRESENCE_COMBINATIONS: u8 = 16;

/// Which of the single-use digits 2, 3, 4 and 5 a candidate contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Presence {
    has2: bool,
    has3: bool,
    has4: bool,
    has5: bool,
}

impl Presence {
    fn from_bits(bits: u8) -> Self {
        Self {
            has2: bits & 0b1000 != 0,
            has3: bits & 0b0100 != 0,
            has4: bits & 0b0010 != 0,
            has5: bits & 0b0001 != 0,
        }
    }

    fn len(self) -> usize {
        [self.has2, self.has3, self.has4, self.has5]
            .iter()
            .filter(|present| **present)
            .count()
    }

    /// Combinations that never need to be searched, regardless of the larger digits.
    fn is_redundant(self) -> bool {
        (self.has2 && (self.has3 || self.has4 || self.has5)) || (self.has3 && self.has4 && self.has5)
    }
}

/// How many of each repeatable digit a candidate contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Counts {
    six: usize,
    seven: usize,
    eight: usize,
    nine: usize,
}

/// Every way of splitting a length between the digits 6, 7, 8 and 9.
/// Sixes count down from the full length, then sevens, then eights; nines take the rest.
#[derive(Debug, Clone)]
struct Decompositions {
    length: usize,
    six: usize,
    seven: usize,
    eight: usize,
    done: bool,
}

impl Decompositions {
    fn new(length: usize) -> Self {
        Self {
            length,
            six: length,
            seven: 0,
            eight: 0,
            done: false,
        }
    }
}

impl Iterator for Decompositions {
    type Item = Counts;

    fn next(&mut self) -> Option<Counts> {
        if self.done {
            return None;
        }
        let counts = Counts {
            six: self.six,
            seven: self.seven,
            eight: self.eight,
            nine: self.length - self.six - self.seven - self.eight,
        };

        // Advance like an odometer: eights count down first, then sevens, then sixes.
        if self.eight > 0 {
            self.eight -= 1;
        } else if self.seven > 0 {
            self.seven -= 1;
            self.eight = self.length - self.six - self.seven;
        } else if self.six > 0 {
            self.six -= 1;
            self.seven = self.length - self.six;
            self.eight = 0;
        } else {
            self.done = true;
        }
        Some(counts)
    }
}

/// Build the canonical candidate for one digit multiset.
///
/// # Errors
/// Returns `GeneratorInvariant` if the digits do not add up to the target
/// length, or `UnparsableCandidate` if the digit string can't be parsed.
fn build_candidate(
    target_len: usize,
    presence: Presence,
    counts: Counts,
) -> Result<Natural, MulpersError> {
    let mut digits = String::with_capacity(target_len);
    for (present, digit) in [
        (presence.has2, '2'),
        (presence.has3, '3'),
        (presence.has4, '4'),
        (presence.has5, '5'),
    ] {
        if present {
            digits.push(digit);
        }
    }
    for (count, digit) in [
        (counts.six, '6'),
        (counts.seven, '7'),
        (counts.eight, '8'),
        (counts.nine, '9'),
    ] {
        digits.extend(std::iter::repeat_n(digit, count));
    }

    if digits.len() != target_len {
        return Err(MulpersError::GeneratorInvariant {
            expected: target_len,
            actual: digits.len(),
            digits,
        });
    }
    Natural::from_str(&digits).map_err(|()| MulpersError::UnparsableCandidate { digits })
}

/// A lazy, endless stream of canonical candidates in order of digit count.
#[derive(Debug, Clone)]
pub struct CandidateGenerator {
    target_len: usize,
    next_presence: u8,
    current: Option<(Presence, Decompositions)>,
}

impl CandidateGenerator {
    /// Start generating at the given digit count.
    /// A digit count of zero has no candidates and the stream moves on to one digit.
    #[must_use]
    pub fn new(start_digits: u32) -> Self {
        Self {
            target_len: start_digits as usize,
            next_presence: 0,
            current: None,
        }
    }

    /// The digit count currently being generated.
    #[must_use]
    pub fn target_len(&self) -> usize {
        self.target_len
    }
}

impl Iterator for CandidateGenerator {
    type Item = Result<Natural, MulpersError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((presence, decompositions)) = &mut self.current {
                let presence = *presence;
                for counts in decompositions.by_ref() {
                    if presence.has5 && (counts.six > 0 || counts.eight > 0) {
                        continue;
                    }
                    // The empty digit string of length zero is not a number
                    if self.target_len == 0 {
                        continue;
                    }
                    return Some(build_candidate(self.target_len, presence, counts));
                }
                self.current = None;
            }

            if self.next_presence == NUM_PRESENCE_COMBINATIONS {
                self.target_len += 1;
                self.next_presence = 0;
            }
            let presence = Presence::from_bits(self.next_presence);
            self.next_presence += 1;

            if presence.len() > self.target_len || presence.is_redundant() {
                continue;
            }
            let remaining = self.target_len - presence.len();
            self.current = Some((presence, Decompositions::new(remaining)));
        }
    }
}
