// Core data model shared by the engine, dispatcher, scanner and resolver.
//
// Coordinate conventions, applied consistently across the crate:
// - RawMatch: 0-based, half-open, chunk-local byte offsets (what the regex
//   engine reports). Transient per scan call, never persisted.
// - CandidateMotif and all output: 1-based, inclusive, global coordinates,
//   length = end - start + 1.

use crate::registry::Pattern;

/// An unvalidated match of one pattern against one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMatch {
    pub pattern_id: u32,
    pub start: usize, // 0-based, inclusive, chunk-local
    pub end: usize,   // 0-based, exclusive, chunk-local
}

/// A bounded window of the input sequence, processed independently.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    pub index: usize,
    pub global_offset: usize,
    pub local_text: &'a str,
    pub is_last: bool,
}

/// A scored, classified, coordinate-resolved annotation produced by a
/// detector. Output record fields are stable: downstream export consumes
/// Class, Subclass, Start, End, Length, Sequence, Score, NormalizedScore,
/// Method, Pattern_ID plus class-specific attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateMotif {
    pub class_tag: String,
    pub subclass_tag: String,
    pub start: usize, // 1-based, inclusive, global after chunk translation
    pub end: usize,   // 1-based, inclusive
    pub length: usize,
    pub matched_text: String,
    pub score: f64,
    pub normalized_score: Option<f64>,
    pub method: String,
    pub pattern_id: Option<u32>,
    pub attributes: Vec<(String, String)>,
}

impl CandidateMotif {
    /// Build a motif from a chunk-local raw match span. Coordinates stay
    /// chunk-local (1-based inclusive) until the scanner translates them.
    pub fn from_span(
        raw: &RawMatch,
        chunk_text: &str,
        class_tag: &str,
        subclass_tag: &str,
        score: f64,
        method: &str,
    ) -> Self {
        let text = &chunk_text[raw.start..raw.end];
        CandidateMotif {
            class_tag: class_tag.to_string(),
            subclass_tag: subclass_tag.to_string(),
            start: raw.start + 1,
            end: raw.end,
            length: raw.end - raw.start,
            matched_text: text.to_string(),
            score,
            normalized_score: None,
            method: method.to_string(),
            pattern_id: Some(raw.pattern_id),
            attributes: Vec::new(),
        }
    }

    /// Shift chunk-local coordinates into global coordinates.
    pub fn translate(&mut self, global_offset: usize) {
        self.start += global_offset;
        self.end += global_offset;
    }

    /// Key used for exact-duplicate removal during stitching.
    pub fn dedup_key(&self) -> (String, String, usize, usize) {
        (
            self.class_tag.clone(),
            self.subclass_tag.clone(),
            self.start,
            self.end,
        )
    }

    /// Serialize as a TSV row matching the stable output schema.
    pub fn to_tsv_row(&self, sequence_name: &str) -> String {
        let norm = self
            .normalized_score
            .map(|n| format!("{:.3}", n))
            .unwrap_or_else(|| ".".to_string());
        let pid = self
            .pattern_id
            .map(|p| p.to_string())
            .unwrap_or_else(|| ".".to_string());
        let attrs = if self.attributes.is_empty() {
            ".".to_string()
        } else {
            self.attributes
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(";")
        };
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{:.3}\t{}\t{}\t{}",
            sequence_name,
            self.class_tag,
            self.subclass_tag,
            self.start,
            self.end,
            self.length,
            self.matched_text,
            self.score,
            norm,
            self.method,
            pid
        ) + "\t"
            + &attrs
    }
}

/// Overlap length between two motifs under the inclusive convention,
/// divided by the shorter of the two lengths. A(1,10) vs B(5,15) gives
/// 6/10 = 0.6.
pub fn overlap_fraction(a: &CandidateMotif, b: &CandidateMotif) -> f64 {
    let lo = a.start.max(b.start);
    let hi = a.end.min(b.end);
    if hi < lo {
        return 0.0;
    }
    let overlap = hi - lo + 1;
    let min_len = a.length.min(b.length).max(1);
    overlap as f64 / min_len as f64
}

/// Result carrier for analyze(): recovered errors surface here as warnings
/// alongside the (possibly partial) motif list.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub motifs: Vec<CandidateMotif>,
    pub warnings: Vec<String>,
    /// One or more chunks failed catastrophically and were skipped.
    pub partial: bool,
    /// The parallel executor's timeout expired during at least one chunk.
    pub incomplete: bool,
}

/// The opaque per-class scoring callable. Pure, no side effects, must
/// tolerate any text of length >= 1. The core never interprets the value.
pub type ScoreFn = fn(&str, &Pattern) -> f64;
