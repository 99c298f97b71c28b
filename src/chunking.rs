// Chunked scanner: processes arbitrarily long input in bounded-memory
// overlapping windows and stitches boundary-crossing results.
//
// Windows are [offset, min(len, offset + chunk_size + overlap)), advancing
// offset by chunk_size; the final window runs to the sequence end. Each
// genomic position is owned by exactly one chunk: a motif found in chunk i
// is kept only if its global start lies inside [offset, offset + chunk_size),
// except that the final chunk owns its whole remaining span. The overlap
// extension exists so motifs crossing a window boundary are seen whole by
// the owning chunk; callers must configure overlap >= the longest motif
// span the registry can produce.
//
// Chunk processing is sequential, so peak memory is one window's text plus
// the in-flight candidate list. Detector classes fan out in parallel within
// a chunk when requested.

use crate::dispatch::Dispatcher;
use crate::engine::{panic_message, MatchEngine};
use crate::error::ScanError;
use crate::motif::{CandidateMotif, Chunk, RawMatch, ScanReport};
use crate::parallel::ParallelExecutor;
use crate::scan_opt::ScanOpt;
use crate::secondary::SecondaryMatcher;
use std::cmp::Ordering;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

#[cfg(test)]
#[path = "chunking_test.rs"]
mod chunking_test;

pub struct ChunkedScanner<'a> {
    opt: &'a ScanOpt,
    engine: &'a MatchEngine,
    dispatcher: &'a Dispatcher,
    executor: ParallelExecutor,
    // Cooperative "stop after current chunk" flag; there is no mid-chunk
    // cancellation.
    stop: Arc<AtomicBool>,
}

impl<'a> ChunkedScanner<'a> {
    pub fn new(opt: &'a ScanOpt, engine: &'a MatchEngine, dispatcher: &'a Dispatcher) -> Self {
        ChunkedScanner {
            opt,
            engine,
            dispatcher,
            executor: ParallelExecutor::new(opt.task_timeout_ms.map(Duration::from_millis)),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for requesting a cooperative stop; checked between chunks.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Scan the whole sequence chunk by chunk, returning stitched,
    /// deduplicated, position-sorted candidates (pre-resolution) plus all
    /// recovered warnings. Requires a compiled engine.
    pub fn run(&self, sequence: &str, name: &str) -> ScanReport {
        let mut report = ScanReport::default();
        let len = sequence.len();
        if len == 0 {
            return report;
        }

        let compiled = match self.engine.compiled() {
            Some(c) => c,
            None => {
                // Caller contract: analyze() compiles before running.
                let warning = "match engine not compiled, skipping scan".to_string();
                log::warn!("{}: {}", name, warning);
                report.warnings.push(warning);
                return report;
            }
        };

        // Secondary matchers are detector-supplied and read-only; gather
        // them once per run.
        let matchers: Vec<Box<dyn SecondaryMatcher>> = self
            .dispatcher
            .detectors()
            .flat_map(|d| d.secondary_matchers())
            .collect();

        let chunk_count = len.div_ceil(self.opt.chunk_size);
        log::debug!(
            "{}: {} bp in {} chunks (chunk_size={}, overlap={})",
            name,
            len,
            chunk_count,
            self.opt.chunk_size,
            self.opt.overlap
        );

        let mut all_motifs: Vec<CandidateMotif> = Vec::new();

        for index in 0..chunk_count {
            if self.stop.load(AtomicOrdering::Relaxed) {
                log::info!("{}: stop requested, halting after chunk {}", name, index);
                report.partial = true;
                break;
            }

            let offset = index * self.opt.chunk_size;
            let window_end = len.min(offset + self.opt.chunk_size + self.opt.overlap);
            let chunk = Chunk {
                index,
                global_offset: offset,
                local_text: &sequence[offset..window_end],
                is_last: index + 1 == chunk_count,
            };

            // A catastrophic per-chunk failure is reported and skipped; the
            // scanner continues with the next chunk and the result is
            // flagged partial.
            let attempted = panic::catch_unwind(AssertUnwindSafe(|| {
                self.scan_chunk(&chunk, compiled, &matchers)
            }));
            match attempted {
                Ok((motifs, warnings, incomplete)) => {
                    all_motifs.extend(motifs);
                    report.warnings.extend(warnings);
                    report.incomplete |= incomplete;
                }
                Err(payload) => {
                    let err = ScanError::Chunk {
                        index,
                        cause: panic_message(payload),
                    };
                    log::warn!("{}: {}", name, err);
                    report.warnings.push(err.to_string());
                    report.partial = true;
                }
            }
        }

        report.motifs = stitch(all_motifs);
        report
    }

    /// Scan one window: primary engine pass, secondary matchers, dispatch,
    /// coordinate translation, boundary ownership.
    fn scan_chunk(
        &self,
        chunk: &Chunk,
        compiled: &crate::engine::CompiledPatterns,
        matchers: &[Box<dyn SecondaryMatcher>],
    ) -> (Vec<CandidateMotif>, Vec<String>, bool) {
        let mut warnings: Vec<String> = Vec::new();

        // Primary multi-pattern scan. An internal engine failure surfaces as
        // a warning and the chunk proceeds with whatever was collected.
        let mut raw = compiled.scan(chunk.local_text, &mut warnings, chunk.index);

        // Deferred patterns through the per-detector secondary matchers.
        for matcher in matchers {
            let found = panic::catch_unwind(AssertUnwindSafe(|| {
                matcher.find(chunk.local_text.as_bytes())
            }));
            match found {
                Ok(found) => raw.extend(found),
                Err(payload) => {
                    let err = ScanError::EngineScan {
                        chunk: chunk.index,
                        cause: format!(
                            "secondary matcher for pattern {} panicked: {}",
                            matcher.pattern_id(),
                            panic_message(payload)
                        ),
                    };
                    log::warn!("{}", err);
                    warnings.push(err.to_string());
                }
            }
        }

        raw.sort_by_key(|m: &RawMatch| (m.start, m.end, m.pattern_id));
        log::trace!(
            "chunk {}: {} raw matches at offset {}",
            chunk.index,
            raw.len(),
            chunk.global_offset
        );

        let (mut motifs, incomplete) = if self.opt.parallel {
            let groups = self.dispatcher.group_by_class(&raw);
            let tasks: Vec<(String, _)> = groups
                .into_iter()
                .map(|(class_tag, matches)| {
                    let text = chunk.local_text;
                    let dispatcher = self.dispatcher;
                    let tag = class_tag.clone();
                    (class_tag, move || {
                        dispatcher.dispatch_class(&tag, &matches, text)
                    })
                })
                .collect();
            self.executor.run_all(tasks, &mut warnings)
        } else {
            (
                self.dispatcher.dispatch(&raw, chunk.local_text, &mut warnings),
                false,
            )
        };

        // Local -> global, then boundary ownership: keep a motif iff this
        // chunk owns its start position.
        let owned_end = chunk.global_offset + self.opt.chunk_size;
        for m in &mut motifs {
            m.translate(chunk.global_offset);
        }
        motifs.retain(|m| chunk.is_last || m.start - 1 < owned_end);

        // Dispatch completion order is scheduling-dependent; normalize here
        // so stitching sees a deterministic stream.
        motifs.sort_by(full_order);

        (motifs, warnings, incomplete)
    }
}

/// Total order used for stitching and dedup: position first, then the
/// remaining fields so equal-position motifs compare stably.
fn full_order(a: &CandidateMotif, b: &CandidateMotif) -> Ordering {
    a.start
        .cmp(&b.start)
        .then(a.end.cmp(&b.end))
        .then_with(|| a.class_tag.cmp(&b.class_tag))
        .then_with(|| a.subclass_tag.cmp(&b.subclass_tag))
        .then_with(|| b.score.total_cmp(&a.score))
        .then_with(|| a.method.cmp(&b.method))
}

/// Sort the accumulated motifs by position and drop exact duplicate
/// (class, subclass, start, end) tuples. Residual duplicates arise when the
/// same motif is detected from two chunk perspectives before ownership
/// filtering fully applies.
fn stitch(mut motifs: Vec<CandidateMotif>) -> Vec<CandidateMotif> {
    motifs.sort_by(full_order);
    motifs.dedup_by(|b, a| a.dedup_key() == b.dedup_key());
    motifs
}
