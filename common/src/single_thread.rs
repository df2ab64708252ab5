//! Search on the calling thread, without batching, workers or a registry.
//! Only one running best is kept, across all digit counts.

use crate::candidates::CandidateGenerator;
use crate::persistence::get_persistence;
use crate::search::{SearchReporter, SearchStats, StopSignal};
use crate::{MulpersError, PersistenceRecord, digit_count};

/// Walk the candidates in order, reporting each new digit count and every
/// candidate whose persistence beats everything seen before it.
///
/// The stop signal is checked before every candidate.
///
/// # Errors
/// Returns an error if the generator breaks one of its invariants.
pub fn search_single_thread(
    start_digits: u32,
    reporter: &dyn SearchReporter,
    stop: &StopSignal,
) -> Result<SearchStats, MulpersError> {
    let mut best_persistence: Option<u32> = None;
    let mut current_digit_count = 0;
    let mut evaluated = 0;

    for candidate in CandidateGenerator::new(start_digits) {
        if stop.is_stopped() {
            break;
        }
        let n = candidate?;
        let digit_count = digit_count(&n);
        if digit_count > current_digit_count {
            current_digit_count = digit_count;
            reporter.digit_count_reached(digit_count);
        }

        let persistence = get_persistence(&n);
        if best_persistence.is_none_or(|best| persistence > best) {
            best_persistence = Some(persistence);
            reporter.new_best(&PersistenceRecord::new(n, persistence), digit_count);
        }
        evaluated += 1;
    }

    Ok(SearchStats {
        candidates_evaluated: evaluated,
        highest_digit_count: current_digit_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        stop_at: u32,
        stop: StopSignal,
        digit_counts: Mutex<Vec<u32>>,
        bests: Mutex<Vec<PersistenceRecord>>,
    }

    impl SearchReporter for Recorder {
        fn digit_count_reached(&self, digit_count: u32) {
            self.digit_counts.lock().unwrap().push(digit_count);
            if digit_count >= self.stop_at {
                self.stop.stop();
            }
        }

        fn new_best(&self, record: &PersistenceRecord, _digit_count: u32) {
            self.bests.lock().unwrap().push(record.clone());
        }
    }

    fn recorder(stop_at: u32, stop: &StopSignal) -> Recorder {
        Recorder {
            stop_at,
            stop: stop.clone(),
            digit_counts: Mutex::new(Vec::new()),
            bests: Mutex::new(Vec::new()),
        }
    }

    #[test_log::test]
    fn test_single_thread_search() {
        let stop = StopSignal::new();
        let reporter = recorder(9, &stop);
        let stats = search_single_thread(1, &reporter, &stop).unwrap();

        assert_eq!(
            *reporter.digit_counts.lock().unwrap(),
            vec![1, 2, 3, 4, 5, 6, 7, 8, 9]
        );
        assert_eq!(stats.highest_digit_count, 9);
        // Everything up to eight digits, plus the first nine-digit candidate
        assert_eq!(stats.candidates_evaluated, 1787);

        let bests: Vec<(u64, u32)> = reporter
            .bests
            .lock()
            .unwrap()
            .iter()
            .map(|r| (u64::try_from(r.n()).unwrap(), r.persistence()))
            .collect();
        assert_eq!(
            bests,
            vec![
                (6, 0),
                (66, 3),
                (77, 4),
                (679, 5),
                (6788, 6),
                (68889, 7),
                (6_888_999, 8),
                (66_666_889, 9),
            ]
        );
    }

    #[test_log::test]
    fn test_single_thread_start_digits() {
        let stop = StopSignal::new();
        let reporter = recorder(5, &stop);
        search_single_thread(4, &reporter, &stop).unwrap();
        assert_eq!(*reporter.digit_counts.lock().unwrap(), vec![4, 5]);
        let bests = reporter.bests.lock().unwrap();
        assert_eq!(bests.last().map(PersistenceRecord::persistence), Some(6));
    }
}
