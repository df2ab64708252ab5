//! The shared table of the best persistence found for each digit count.

use crate::PersistenceRecord;
use log::trace;
use malachite::natural::Natural;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Best known record per digit count.
///
/// Looking up a digit count with no record copies the best record of the
/// nearest lower digit count forward, so the persistence never decreases as
/// the digit count grows through lookups. Records are never removed.
#[derive(Debug, Default)]
pub struct BestRegistry {
    records: Mutex<HashMap<u32, PersistenceRecord>>,
}

impl BestRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u32, PersistenceRecord>> {
        // The map is only written while the lock is held and every write is
        // a single insert, so a panicked holder never leaves it half-updated.
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a result if it beats the current record for its digit count.
    /// Higher persistence wins, and equal persistence goes to the smaller number.
    /// Returns true if the registry changed.
    pub fn conditional_update(&self, n: Natural, persistence: u32, digit_count: u32) -> bool {
        let mut records = self.lock();
        update_locked(
            &mut records,
            digit_count,
            PersistenceRecord::new(n, persistence),
        )
    }

    /// Get the best record for a digit count, filling it from lower digit
    /// counts if nothing has been recorded yet. Digit count zero always
    /// resolves to the zero record.
    pub fn get_best(&self, digit_count: u32) -> PersistenceRecord {
        let mut records = self.lock();

        // Walk down to the nearest digit count that has a record
        let mut resolved_from = digit_count;
        let best = loop {
            if resolved_from == 0 {
                break PersistenceRecord::zero();
            }
            if let Some(record) = records.get(&resolved_from) {
                break record.clone();
            }
            resolved_from -= 1;
        };

        // Then materialize it at every digit count in the gap
        for gap in (resolved_from + 1)..=digit_count {
            trace!("Filling digit count {gap} forward from {resolved_from}");
            update_locked(&mut records, gap, best.clone());
        }
        best
    }

    /// Snapshot every record, sorted by digit count.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(u32, PersistenceRecord)> {
        let mut records: Vec<(u32, PersistenceRecord)> = self
            .lock()
            .iter()
            .map(|(digit_count, record)| (*digit_count, record.clone()))
            .collect();
        records.sort_by_key(|(digit_count, _)| *digit_count);
        records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Compare-and-maybe-write against a map the caller has already locked.
fn update_locked(
    records: &mut HashMap<u32, PersistenceRecord>,
    digit_count: u32,
    candidate: PersistenceRecord,
) -> bool {
    match records.get(&digit_count) {
        Some(current)
            if candidate.persistence() < current.persistence()
                || (candidate.persistence() == current.persistence()
                    && candidate.n() >= current.n()) =>
        {
            false
        }
        _ => {
            records.insert(digit_count, candidate);
            true
        }
    }
}
