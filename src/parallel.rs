// Parallel fan-out of per-class detector tasks.
//
// Tasks are pure functions over the shared read-only chunk text. They run on
// the global rayon pool and fan their results into a crossbeam channel; the
// calling thread gathers exactly one message per task. There is no mid-scan
// interruption: the timeout sets a cooperative cancel flag, tasks that have
// not started yet observe it and return empty, and tasks already running are
// allowed to finish (their results are still kept). Completion order never
// leaks into output because the scanner sorts downstream.

use crate::error::ScanError;
use crate::motif::CandidateMotif;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[cfg(test)]
#[path = "parallel_test.rs"]
mod parallel_test;

enum TaskOutcome {
    Done(Vec<CandidateMotif>, Vec<String>),
    Panicked(String),
    Skipped,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelExecutor {
    pub timeout: Option<Duration>,
}

impl ParallelExecutor {
    pub fn new(timeout: Option<Duration>) -> Self {
        ParallelExecutor { timeout }
    }

    /// Execute the per-class tasks concurrently and gather their motifs.
    /// One task's panic is converted into an empty result for that class
    /// plus a logged warning; it never cancels sibling tasks. Returns the
    /// merged motifs and whether the batch is incomplete (timeout hit or
    /// tasks skipped).
    pub fn run_all<F>(
        &self,
        tasks: Vec<(String, F)>,
        warnings: &mut Vec<String>,
    ) -> (Vec<CandidateMotif>, bool)
    where
        F: FnOnce() -> (Vec<CandidateMotif>, Vec<String>) + Send,
    {
        let task_count = tasks.len();
        if task_count == 0 {
            return (Vec::new(), false);
        }

        let (tx, rx) = crossbeam_channel::unbounded::<(String, TaskOutcome)>();
        let cancel = AtomicBool::new(false);
        let deadline = self.timeout.map(|t| Instant::now() + t);

        let mut motifs: Vec<CandidateMotif> = Vec::new();
        let mut incomplete = false;
        // (class, warning) pairs, sorted before surfacing so that the
        // report is independent of completion order.
        let mut task_warnings: Vec<(String, String)> = Vec::new();

        rayon::scope(|s| {
            for (class, task) in tasks {
                let tx = tx.clone();
                let cancel = &cancel;
                s.spawn(move |_| {
                    if cancel.load(Ordering::Relaxed) {
                        let _ = tx.send((class, TaskOutcome::Skipped));
                        return;
                    }
                    let outcome = match panic::catch_unwind(AssertUnwindSafe(task)) {
                        Ok((found, task_warn)) => TaskOutcome::Done(found, task_warn),
                        Err(payload) => {
                            TaskOutcome::Panicked(crate::engine::panic_message(payload))
                        }
                    };
                    let _ = tx.send((class, outcome));
                });
            }
            drop(tx);

            // Fan-in: exactly one message per task. Every spawned task sends,
            // so the plain recv() drain after a deadline miss always
            // terminates.
            for _ in 0..task_count {
                let message = match deadline {
                    Some(d) if !cancel.load(Ordering::Relaxed) => match rx.recv_deadline(d) {
                        Ok(msg) => msg,
                        Err(_) => {
                            let err = ScanError::TimeoutExceeded;
                            log::warn!("{}", err);
                            task_warnings.push((String::new(), err.to_string()));
                            cancel.store(true, Ordering::Relaxed);
                            incomplete = true;
                            match rx.recv() {
                                Ok(msg) => msg,
                                Err(_) => break,
                            }
                        }
                    },
                    _ => match rx.recv() {
                        Ok(msg) => msg,
                        Err(_) => break,
                    },
                };

                let (class, outcome) = message;
                match outcome {
                    TaskOutcome::Done(found, task_warn) => {
                        log::trace!("executor: class '{}' produced {} motifs", class, found.len());
                        motifs.extend(found);
                        for w in task_warn {
                            task_warnings.push((class.clone(), w));
                        }
                    }
                    TaskOutcome::Panicked(cause) => {
                        let err = ScanError::Detector {
                            class: class.clone(),
                            cause: format!("task panicked: {}", cause),
                        };
                        log::warn!("{}", err);
                        task_warnings.push((class, err.to_string()));
                    }
                    TaskOutcome::Skipped => {
                        log::debug!("executor: class '{}' skipped after cancellation", class);
                        incomplete = true;
                    }
                }
            }
        });

        task_warnings.sort();
        warnings.extend(task_warnings.into_iter().map(|(_, w)| w));

        (motifs, incomplete)
    }
}
