// Built-in pattern catalog and detectors.
//
// The core is agnostic about what these motifs are; everything here is
// configuration fed into the registry/dispatcher: expressions, class tags,
// scoring callables and thresholds. The scoring formulas are deliberately
// simple run/step arithmetic exposed through the opaque ScoreFn handle.

use crate::dispatch::{Detector, DetectorFailure, Dispatcher};
use crate::motif::{CandidateMotif, RawMatch};
use crate::registry::{Pattern, PatternRegistry};
use crate::secondary::{
    DirectRepeatFinder, InvertedRepeatFinder, SecondaryLimits, SecondaryMatcher,
};
use std::sync::Arc;

#[cfg(test)]
#[path = "builtin_test.rs"]
mod builtin_test;

// Pattern ids in the default catalog.
pub const PAT_G4_CANONICAL: u32 = 1;
pub const PAT_G4_RELAXED: u32 = 2;
pub const PAT_G4_TWO_TETRAD: u32 = 3;
pub const PAT_IMOTIF: u32 = 4;
pub const PAT_ZDNA_GC: u32 = 5;
pub const PAT_A_TRACT: u32 = 6;
pub const PAT_TRIPLEX_PURINE: u32 = 7;
pub const PAT_DIRECT_REPEAT: u32 = 8;
pub const PAT_INVERTED_REPEAT: u32 = 9;

/// Build the default registry. Ids are distinct literals, so registration
/// cannot fail.
pub fn default_registry() -> PatternRegistry {
    let mut registry = PatternRegistry::new();
    let patterns = vec![
        Pattern {
            id: PAT_G4_CANONICAL,
            expression: "G{3,}[ACGT]{1,7}G{3,}[ACGT]{1,7}G{3,}[ACGT]{1,7}G{3,}".to_string(),
            class_tag: "G_Quadruplex".to_string(),
            subclass_tag: "Canonical_G4".to_string(),
            scoring: g_run_score,
            min_threshold: 1.0,
        },
        Pattern {
            id: PAT_G4_RELAXED,
            expression: "G{3,}[ACGT]{8,12}G{3,}[ACGT]{1,12}G{3,}[ACGT]{1,12}G{3,}".to_string(),
            class_tag: "G_Quadruplex".to_string(),
            subclass_tag: "Relaxed_G4".to_string(),
            scoring: g_run_score,
            min_threshold: 0.8,
        },
        Pattern {
            id: PAT_G4_TWO_TETRAD,
            expression: "G{2}[ACGT]{1,7}G{2}[ACGT]{1,7}G{2}[ACGT]{1,7}G{2}".to_string(),
            class_tag: "G_Quadruplex".to_string(),
            subclass_tag: "Two_Tetrad_G4".to_string(),
            scoring: g_run_score,
            min_threshold: 0.5,
        },
        Pattern {
            id: PAT_IMOTIF,
            expression: "C{3,}[ACGT]{1,7}C{3,}[ACGT]{1,7}C{3,}[ACGT]{1,7}C{3,}".to_string(),
            class_tag: "i_Motif".to_string(),
            subclass_tag: "Canonical_iMotif".to_string(),
            scoring: c_run_score,
            min_threshold: 1.0,
        },
        Pattern {
            id: PAT_ZDNA_GC,
            expression: "(?:GC|CG){6,}".to_string(),
            class_tag: "Z_DNA".to_string(),
            subclass_tag: "GC_Alternating".to_string(),
            scoring: dinucleotide_step_score,
            min_threshold: 8.0,
        },
        Pattern {
            id: PAT_A_TRACT,
            expression: "A{7,}|T{7,}".to_string(),
            class_tag: "Curved_DNA".to_string(),
            subclass_tag: "A_Tract".to_string(),
            scoring: tract_score,
            min_threshold: 7.0,
        },
        Pattern {
            id: PAT_TRIPLEX_PURINE,
            expression: "[GA]{15,}".to_string(),
            class_tag: "Triplex".to_string(),
            subclass_tag: "Purine_Tract".to_string(),
            scoring: purine_score,
            min_threshold: 12.0,
        },
        // Back-reference expressions are documentation only: the registry
        // defers them to the seed-and-extend secondary matchers.
        Pattern {
            id: PAT_DIRECT_REPEAT,
            expression: r"([ACGT]{10,300})[ACGT]{0,100}\1".to_string(),
            class_tag: "Repeat".to_string(),
            subclass_tag: "Direct_Repeat".to_string(),
            scoring: repeat_score,
            min_threshold: 0.0,
        },
        Pattern {
            id: PAT_INVERTED_REPEAT,
            expression: r"([ACGT]{10,300})[ACGT]{0,100}revcomp(\1)".to_string(),
            class_tag: "Repeat".to_string(),
            subclass_tag: "Inverted_Repeat".to_string(),
            scoring: repeat_score,
            min_threshold: 0.0,
        },
    ];
    for p in patterns {
        registry
            .register(p)
            .expect("builtin pattern ids are distinct");
    }
    registry
}

/// Default detector set matching the catalog's class tags.
pub fn default_detectors(limits: SecondaryLimits) -> Vec<Arc<dyn Detector>> {
    vec![
        Arc::new(RunDensityDetector {
            class: "G_Quadruplex",
            run_base: b'G',
        }),
        Arc::new(RunDensityDetector {
            class: "i_Motif",
            run_base: b'C',
        }),
        Arc::new(ZDnaDetector),
        Arc::new(TractDetector),
        Arc::new(TriplexDetector),
        Arc::new(RepeatDetector { limits }),
    ]
}

/// Registry + detectors wired into a ready dispatcher.
pub fn default_dispatcher(limits: SecondaryLimits) -> Dispatcher {
    let mut dispatcher = Dispatcher::new(Arc::new(default_registry()));
    for d in default_detectors(limits) {
        dispatcher.register_detector(d);
    }
    dispatcher
}

// ---------------------------------------------------------------------------
// Scoring callables (ScoreFn)
// ---------------------------------------------------------------------------

/// Mean run-weighted G content: each G contributes the length of its run
/// capped at 4, each C the negative equivalent. Positive means G-rich.
fn run_weighted_mean(text: &str) -> f64 {
    let bytes = text.as_bytes();
    if bytes.is_empty() {
        return 0.0;
    }
    let mut total = 0f64;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i].to_ascii_uppercase();
        let mut j = i + 1;
        while j < bytes.len() && bytes[j].to_ascii_uppercase() == b {
            j += 1;
        }
        let run = (j - i).min(4) as f64;
        match b {
            b'G' => total += run * (j - i) as f64,
            b'C' => total -= run * (j - i) as f64,
            _ => {}
        }
        i = j;
    }
    total / bytes.len() as f64
}

pub fn g_run_score(text: &str, _pattern: &Pattern) -> f64 {
    run_weighted_mean(text)
}

pub fn c_run_score(text: &str, _pattern: &Pattern) -> f64 {
    -run_weighted_mean(text)
}

/// Count alternating purine/pyrimidine dinucleotide steps; GC/CG steps
/// weigh 1.0, GT/TG/CA/AC steps 0.5.
pub fn dinucleotide_step_score(text: &str, _pattern: &Pattern) -> f64 {
    let bytes: Vec<u8> = text.bytes().map(|b| b.to_ascii_uppercase()).collect();
    let mut score = 0f64;
    for w in bytes.windows(2) {
        score += match (w[0], w[1]) {
            (b'G', b'C') | (b'C', b'G') => 1.0,
            (b'G', b'T') | (b'T', b'G') | (b'C', b'A') | (b'A', b'C') => 0.5,
            _ => 0.0,
        };
    }
    score
}

pub fn tract_score(text: &str, _pattern: &Pattern) -> f64 {
    text.len() as f64
}

pub fn purine_score(text: &str, _pattern: &Pattern) -> f64 {
    let purines = text
        .bytes()
        .filter(|b| matches!(b.to_ascii_uppercase(), b'G' | b'A'))
        .count();
    purines as f64 * purines as f64 / text.len().max(1) as f64
}

pub fn repeat_score(text: &str, _pattern: &Pattern) -> f64 {
    text.len() as f64 / 2.0
}

// ---------------------------------------------------------------------------
// Detectors
// ---------------------------------------------------------------------------

/// Shared detector loop: look up the pattern, score the matched text with
/// its scoring callable, drop sub-threshold motifs, then let the caller
/// decorate the survivor (normalized score, attributes).
fn score_matches(
    raw: &[RawMatch],
    chunk_text: &str,
    registry: &PatternRegistry,
    method: &str,
    decorate: impl Fn(&mut CandidateMotif, &str),
) -> Result<Vec<CandidateMotif>, DetectorFailure> {
    let mut motifs = Vec::with_capacity(raw.len());
    for m in raw {
        let pattern = registry
            .get(m.pattern_id)
            .ok_or_else(|| DetectorFailure::new(format!("unknown pattern {}", m.pattern_id)))?;
        let text = &chunk_text[m.start..m.end];
        let score = (pattern.scoring)(text, pattern);
        if score < pattern.min_threshold {
            continue;
        }
        let mut motif = CandidateMotif::from_span(
            m,
            chunk_text,
            &pattern.class_tag,
            &pattern.subclass_tag,
            score,
            method,
        );
        decorate(&mut motif, text);
        motifs.push(motif);
    }
    Ok(motifs)
}

/// Validates and scores run-density motifs (G-quadruplex and i-motif share
/// the shape, differing only in the tracked base).
struct RunDensityDetector {
    class: &'static str,
    run_base: u8,
}

impl RunDensityDetector {
    fn count_runs(&self, text: &str) -> usize {
        let bytes = text.as_bytes();
        let mut runs = 0;
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i].to_ascii_uppercase() == self.run_base {
                let mut j = i + 1;
                while j < bytes.len() && bytes[j].to_ascii_uppercase() == self.run_base {
                    j += 1;
                }
                if j - i >= 2 {
                    runs += 1;
                }
                i = j;
            } else {
                i += 1;
            }
        }
        runs
    }
}

impl Detector for RunDensityDetector {
    fn class_tag(&self) -> &str {
        self.class
    }

    fn detect(
        &self,
        raw: &[RawMatch],
        chunk_text: &str,
        registry: &PatternRegistry,
    ) -> Result<Vec<CandidateMotif>, DetectorFailure> {
        score_matches(raw, chunk_text, registry, "pattern_regex", |motif, text| {
            motif.normalized_score = Some(motif.score / 4.0);
            motif
                .attributes
                .push(("Runs".to_string(), self.count_runs(text).to_string()));
        })
    }
}

struct ZDnaDetector;

impl Detector for ZDnaDetector {
    fn class_tag(&self) -> &str {
        "Z_DNA"
    }

    fn detect(
        &self,
        raw: &[RawMatch],
        chunk_text: &str,
        registry: &PatternRegistry,
    ) -> Result<Vec<CandidateMotif>, DetectorFailure> {
        score_matches(raw, chunk_text, registry, "pattern_regex", |motif, text| {
            motif.normalized_score = Some(motif.score / text.len().max(1) as f64);
        })
    }
}

struct TractDetector;

impl Detector for TractDetector {
    fn class_tag(&self) -> &str {
        "Curved_DNA"
    }

    fn detect(
        &self,
        raw: &[RawMatch],
        chunk_text: &str,
        registry: &PatternRegistry,
    ) -> Result<Vec<CandidateMotif>, DetectorFailure> {
        score_matches(raw, chunk_text, registry, "pattern_regex", |motif, text| {
            let base = text
                .bytes()
                .next()
                .map(|b| (b.to_ascii_uppercase() as char).to_string())
                .unwrap_or_default();
            motif.attributes.push(("Tract_Base".to_string(), base));
        })
    }
}

struct TriplexDetector;

impl Detector for TriplexDetector {
    fn class_tag(&self) -> &str {
        "Triplex"
    }

    fn detect(
        &self,
        raw: &[RawMatch],
        chunk_text: &str,
        registry: &PatternRegistry,
    ) -> Result<Vec<CandidateMotif>, DetectorFailure> {
        score_matches(raw, chunk_text, registry, "pattern_regex", |motif, text| {
            motif.normalized_score = Some(motif.score / text.len().max(1) as f64);
        })
    }
}

/// Repeat class: all of its patterns are deferred, found by the
/// seed-and-extend matchers this detector supplies.
struct RepeatDetector {
    limits: SecondaryLimits,
}

impl Detector for RepeatDetector {
    fn class_tag(&self) -> &str {
        "Repeat"
    }

    fn secondary_matchers(&self) -> Vec<Box<dyn SecondaryMatcher>> {
        vec![
            Box::new(DirectRepeatFinder::new(PAT_DIRECT_REPEAT, 10, 100, self.limits)),
            Box::new(InvertedRepeatFinder::new(
                PAT_INVERTED_REPEAT,
                10,
                100,
                self.limits,
            )),
        ]
    }

    fn detect(
        &self,
        raw: &[RawMatch],
        chunk_text: &str,
        registry: &PatternRegistry,
    ) -> Result<Vec<CandidateMotif>, DetectorFailure> {
        score_matches(raw, chunk_text, registry, "seed_extend", |motif, text| {
            motif
                .attributes
                .push(("Span".to_string(), text.len().to_string()));
        })
    }
}
