// Dispatcher: routes raw matches to per-class detector handlers with
// failure isolation. Detectors report failure as an explicit Result value;
// the dispatcher additionally guards against contract violations (panics)
// with catch_unwind. Either way the failing class degrades to fallback
// motifs built straight from the raw match spans, and never disturbs the
// other classes.

use crate::engine::panic_message;
use crate::error::ScanError;
use crate::motif::{CandidateMotif, RawMatch};
use crate::registry::PatternRegistry;
use crate::secondary::SecondaryMatcher;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

#[cfg(test)]
#[path = "dispatch_test.rs"]
mod dispatch_test;

pub const FALLBACK_SUBCLASS: &str = "Generic";
pub const FALLBACK_SCORE: f64 = 1.0;
pub const FALLBACK_METHOD: &str = "fallback";

/// Structured failure a detector hands back instead of raising.
#[derive(Debug, Clone)]
pub struct DetectorFailure {
    pub cause: String,
}

impl DetectorFailure {
    pub fn new(cause: impl Into<String>) -> Self {
        DetectorFailure {
            cause: cause.into(),
        }
    }
}

/// Per-class validator/scorer. Pure over (matches, chunk text); detectors
/// must not mutate shared state, which lets the executor fan classes out
/// across threads.
pub trait Detector: Send + Sync {
    fn class_tag(&self) -> &str;

    /// Matchers for this class's deferred (non-engine-expressible) patterns.
    fn secondary_matchers(&self) -> Vec<Box<dyn SecondaryMatcher>> {
        Vec::new()
    }

    /// Validate and score this class's raw matches. Coordinates in the
    /// returned motifs are chunk-local 1-based inclusive; the scanner
    /// translates them to global.
    fn detect(
        &self,
        raw: &[RawMatch],
        chunk_text: &str,
        registry: &PatternRegistry,
    ) -> Result<Vec<CandidateMotif>, DetectorFailure>;
}

pub struct Dispatcher {
    registry: Arc<PatternRegistry>,
    detectors: BTreeMap<String, Arc<dyn Detector>>,
}

impl Dispatcher {
    pub fn new(registry: Arc<PatternRegistry>) -> Self {
        Dispatcher {
            registry,
            detectors: BTreeMap::new(),
        }
    }

    pub fn register_detector(&mut self, detector: Arc<dyn Detector>) {
        let tag = detector.class_tag().to_string();
        if self.detectors.insert(tag.clone(), detector).is_some() {
            log::warn!("dispatcher: detector for class '{}' replaced", tag);
        }
    }

    pub fn registry(&self) -> &Arc<PatternRegistry> {
        &self.registry
    }

    pub fn detectors(&self) -> impl Iterator<Item = &Arc<dyn Detector>> {
        self.detectors.values()
    }

    /// Group raw matches by class tag via the registry. BTreeMap keeps the
    /// class order deterministic regardless of match order. Matches whose
    /// pattern id is unknown to the registry are dropped with a warning.
    pub fn group_by_class(&self, raw_matches: &[RawMatch]) -> BTreeMap<String, Vec<RawMatch>> {
        let mut groups: BTreeMap<String, Vec<RawMatch>> = BTreeMap::new();
        for m in raw_matches {
            match self.registry.class_of(m.pattern_id) {
                Some(tag) => groups.entry(tag.to_string()).or_default().push(*m),
                None => {
                    log::warn!(
                        "dispatcher: raw match for unregistered pattern {} dropped",
                        m.pattern_id
                    );
                }
            }
        }
        groups
    }

    /// Run one class group through its handler inside the isolation
    /// boundary. Missing handler, Err return, and panic all take the
    /// fallback path; failures come back as warning strings so the parallel
    /// path can merge them at fan-in.
    pub fn dispatch_class(
        &self,
        class_tag: &str,
        matches: &[RawMatch],
        chunk_text: &str,
    ) -> (Vec<CandidateMotif>, Vec<String>) {
        let Some(detector) = self.detectors.get(class_tag) else {
            log::debug!(
                "dispatcher: no detector for class '{}', using fallback for {} matches",
                class_tag,
                matches.len()
            );
            return (self.fallback_motifs(class_tag, matches, chunk_text), Vec::new());
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            detector.detect(matches, chunk_text, &self.registry)
        }));

        let failure = match outcome {
            Ok(Ok(motifs)) => return (motifs, Vec::new()),
            Ok(Err(failure)) => failure.cause,
            Err(payload) => format!("panicked: {}", panic_message(payload)),
        };

        let err = ScanError::Detector {
            class: class_tag.to_string(),
            cause: failure,
        };
        log::warn!("{}", err);
        (
            self.fallback_motifs(class_tag, matches, chunk_text),
            vec![err.to_string()],
        )
    }

    /// Route all raw matches through their class handlers sequentially.
    pub fn dispatch(
        &self,
        raw_matches: &[RawMatch],
        chunk_text: &str,
        warnings: &mut Vec<String>,
    ) -> Vec<CandidateMotif> {
        let mut motifs: Vec<CandidateMotif> = Vec::new();
        for (class_tag, matches) in self.group_by_class(raw_matches) {
            let (found, class_warnings) = self.dispatch_class(&class_tag, &matches, chunk_text);
            motifs.extend(found);
            warnings.extend(class_warnings);
        }
        motifs
    }

    /// Minimal stub motifs built directly from the raw spans: default score,
    /// subclass "Generic". Used when no handler exists or a handler failed.
    fn fallback_motifs(
        &self,
        class_tag: &str,
        matches: &[RawMatch],
        chunk_text: &str,
    ) -> Vec<CandidateMotif> {
        matches
            .iter()
            .map(|m| {
                CandidateMotif::from_span(
                    m,
                    chunk_text,
                    class_tag,
                    FALLBACK_SUBCLASS,
                    FALLBACK_SCORE,
                    FALLBACK_METHOD,
                )
            })
            .collect()
    }
}
