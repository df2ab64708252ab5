//! The concurrent search pipeline.
//!
//! One producer drains the candidate generator into fixed-size batches and
//! pushes them onto a bounded queue, blocking while it is full. A fixed pool
//! of workers pulls batches off the queue, evaluates every candidate and
//! records improvements in the shared [`BestRegistry`]. The highest digit
//! count seen so far is owned by a single progress counter thread; workers
//! only send it messages.
//!
//! Batches leave the queue in generation order, but several workers run at
//! once, so new bests may be reported out of numeric order. The registry
//! itself decides what counts as an improvement.

use crate::candidates::CandidateGenerator;
use crate::persistence::get_persistence;
use crate::registry::BestRegistry;
use crate::{MulpersError, PersistenceRecord, SearchConfig, digit_count};
use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use itertools::Itertools;
use log::{Level, debug, error, info, log, trace};
use malachite::natural::Natural;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::thread;

/// Receives progress and results from a running search.
pub trait SearchReporter: Send + Sync {
    /// Called once for every new highest digit count observed by a worker.
    fn digit_count_reached(&self, digit_count: u32);

    /// Called when a candidate becomes the best record for its digit count.
    fn new_best(&self, record: &PersistenceRecord, digit_count: u32);
}

/// Reports through the `log` facade.
///
/// By default a digit count is only logged at info when it is a multiple of
/// ten or above fifty, since the pool moves through small digit counts in a blink.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter {
    /// Log every new digit count at info.
    pub every_digit_count: bool,
}

impl LogReporter {
    /// A reporter that logs every digit count at info.
    #[must_use]
    pub fn every_digit_count() -> Self {
        Self {
            every_digit_count: true,
        }
    }

    fn progress_level(self, digit_count: u32) -> Level {
        if self.every_digit_count || digit_count % 10 == 0 || digit_count > 50 {
            Level::Info
        } else {
            Level::Debug
        }
    }
}

impl SearchReporter for LogReporter {
    fn digit_count_reached(&self, digit_count: u32) {
        log!(self.progress_level(digit_count), "Digit count: {digit_count}");
    }

    fn new_best(&self, record: &PersistenceRecord, digit_count: u32) {
        info!(
            "New best: digit count: {digit_count}, persistence: {}, n: {}",
            record.persistence(),
            record.n()
        );
    }
}

/// A flag to ask a running search to wind down.
///
/// The producer stops before its next batch and each worker stops after the
/// batch it is currently evaluating, so every batch taken off the queue is finished.
#[derive(Debug, Default, Clone)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Totals for a finished search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchStats {
    pub candidates_evaluated: u64,
    pub highest_digit_count: u32,
}

/// A worker's connection to the progress counter.
/// The published value is only ever written by the progress counter thread.
#[derive(Debug, Clone)]
struct ProgressHandle {
    updates: Sender<u32>,
    published: Arc<AtomicU32>,
}

impl ProgressHandle {
    /// Tell the progress counter about a digit count if it looks like a new maximum.
    fn observe(&self, digit_count: u32) {
        if digit_count > self.published.load(Ordering::Acquire)
            && self.updates.send(digit_count).is_err()
        {
            trace!("Progress counter has stopped, dropping digit count {digit_count}");
        }
    }
}

/// The single owner of the highest observed digit count.
/// Many workers can race past the same threshold, so each update is checked
/// again here before it is applied and reported.
fn run_progress_counter(
    updates: &Receiver<u32>,
    published: &AtomicU32,
    reporter: &dyn SearchReporter,
) -> u32 {
    let mut highest = published.load(Ordering::Acquire);
    for digit_count in updates {
        if digit_count > highest {
            highest = digit_count;
            published.store(highest, Ordering::Release);
            reporter.digit_count_reached(highest);
        }
    }
    debug!("Progress counter stopped at digit count {highest}");
    highest
}

/// Drain the generator into batches and feed them to the workers.
///
/// # Errors
/// Returns an error if the generator breaks one of its invariants.
fn run_producer<I>(
    candidates: I,
    chunk_size: usize,
    batches: &Sender<Vec<Natural>>,
    stop: &StopSignal,
) -> Result<(), MulpersError>
where
    I: Iterator<Item = Result<Natural, MulpersError>>,
{
    let chunks = candidates.chunks(chunk_size);
    for chunk in &chunks {
        if stop.is_stopped() {
            debug!("Producer stopped by request");
            break;
        }
        let batch = chunk.collect::<Result<Vec<Natural>, MulpersError>>()?;
        trace!("Queueing batch of {} candidates", batch.len());
        if batches.send(batch).is_err() {
            debug!("All workers have stopped, producer exiting");
            break;
        }
    }
    Ok(())
}

/// Evaluate batches until the queue closes or a stop is requested.
/// Returns the number of candidates evaluated.
fn run_worker(
    worker_id: usize,
    batches: &Receiver<Vec<Natural>>,
    registry: &BestRegistry,
    progress: &ProgressHandle,
    reporter: &dyn SearchReporter,
    stop: &StopSignal,
) -> u64 {
    trace!("Worker {worker_id} started");
    let mut evaluated = 0;
    while !stop.is_stopped() {
        let Ok(batch) = batches.recv() else {
            break;
        };
        for n in batch {
            let digit_count = digit_count(&n);
            progress.observe(digit_count);

            let persistence = get_persistence(&n);
            if registry.get_best(digit_count).persistence() < persistence {
                let record = PersistenceRecord::new(n, persistence);
                if registry.conditional_update(record.n().clone(), persistence, digit_count) {
                    reporter.new_best(&record, digit_count);
                }
            }
            evaluated += 1;
        }
    }
    trace!("Worker {worker_id} stopped after {evaluated} candidates");
    evaluated
}

fn thread_start_error(e: impl std::fmt::Display) -> MulpersError {
    MulpersError::ThreadStart {
        reason: e.to_string(),
    }
}

/// Run the concurrent search, recording results into the given registry.
///
/// The candidate stream never ends, so this only returns once the stop
/// signal is raised (or the generator fails).
///
/// # Errors
/// Returns an error if the configuration has no workers or empty batches, if
/// the threads cannot be started, or if the generator breaks one of its invariants.
pub fn run_search(
    config: &SearchConfig,
    registry: &BestRegistry,
    reporter: &dyn SearchReporter,
    stop: &StopSignal,
) -> Result<SearchStats, MulpersError> {
    if config.workers == 0 {
        return Err(MulpersError::InvalidInput {
            argument: format!("workers = {}", config.workers),
        });
    }
    if config.chunk_size == 0 {
        return Err(MulpersError::InvalidInput {
            argument: format!("chunk size = {}", config.chunk_size),
        });
    }
    run_pipeline(
        CandidateGenerator::new(config.start_digits),
        config,
        registry,
        reporter,
        stop,
    )
}

/// Feed any candidate stream through the producer, queue and worker pool.
fn run_pipeline<I>(
    candidates: I,
    config: &SearchConfig,
    registry: &BestRegistry,
    reporter: &dyn SearchReporter,
    stop: &StopSignal,
) -> Result<SearchStats, MulpersError>
where
    I: Iterator<Item = Result<Natural, MulpersError>> + Send,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .thread_name(|i| format!("persistence worker {i}"))
        .build()
        .map_err(thread_start_error)?;
    let evaluated = AtomicU64::new(0);

    debug!(
        "Starting search at digit count {} with {} workers, batches of {}, queue capacity {}",
        config.start_digits, config.workers, config.chunk_size, config.queue_capacity
    );

    thread::scope(|threads| -> Result<SearchStats, MulpersError> {
        let (batch_tx, batch_rx) = bounded::<Vec<Natural>>(config.queue_capacity);
        let (progress_tx, progress_rx) = unbounded::<u32>();
        let published = Arc::new(AtomicU32::new(0));

        let producer = thread::Builder::new()
            .name("candidate producer".to_string())
            .spawn_scoped(threads, move || {
                let result = run_producer(candidates, config.chunk_size, &batch_tx, stop);
                if let Err(e) = &result {
                    error!("Candidate generation failed: {e}");
                    stop.stop();
                }
                result
            })
            .map_err(thread_start_error)?;

        let counter = thread::Builder::new()
            .name("progress counter".to_string())
            .spawn_scoped(threads, {
                let published = Arc::clone(&published);
                move || run_progress_counter(&progress_rx, &published, reporter)
            })
            .map_err(thread_start_error)?;

        // Each worker owns its own handles so the channels close as soon as the last one exits
        let workers: Vec<(Receiver<Vec<Natural>>, ProgressHandle)> = (0..config.workers)
            .map(|_| {
                (
                    batch_rx.clone(),
                    ProgressHandle {
                        updates: progress_tx.clone(),
                        published: Arc::clone(&published),
                    },
                )
            })
            .collect();
        drop(batch_rx);
        drop(progress_tx);

        pool.scope(|scope| {
            for (worker_id, (batches, progress)) in workers.into_iter().enumerate() {
                let evaluated = &evaluated;
                scope.spawn(move |_| {
                    let count = run_worker(worker_id, &batches, registry, &progress, reporter, stop);
                    evaluated.fetch_add(count, Ordering::Relaxed);
                });
            }
        });
        debug!("All workers stopped");

        producer
            .join()
            .unwrap_or_else(|e| std::panic::resume_unwind(e))?;
        let highest_digit_count = counter
            .join()
            .unwrap_or_else(|e| std::panic::resume_unwind(e));

        Ok(SearchStats {
            candidates_evaluated: evaluated.load(Ordering::Relaxed),
            highest_digit_count,
        })
    })
}
