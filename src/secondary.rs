// Secondary matchers for patterns the primary engine cannot express
// (back-reference style repeats). Instead of a backtracking regex engine,
// these are explicit seed-and-extend finders over byte arrays: a k-mer
// index locates candidate position pairs, and each pair is extended to the
// maximal repeat arms. Expected sub-quadratic on chunk-sized input; on
// pathological sequences the finders self-limit with a logged truncation
// rather than blowing up.

use crate::motif::RawMatch;
use std::collections::{BTreeMap, BTreeSet};

#[cfg(test)]
#[path = "secondary_test.rs"]
mod secondary_test;

/// Per-detector matcher for deferred patterns. Returns RawMatch-compatible
/// spans in chunk-local 0-based half-open coordinates, like the primary
/// engine.
pub trait SecondaryMatcher: Send + Sync {
    fn pattern_id(&self) -> u32;
    fn find(&self, text: &[u8]) -> Vec<RawMatch>;
}

/// Self-limiting caps shared by the repeat finders.
#[derive(Debug, Clone, Copy)]
pub struct SecondaryLimits {
    pub max_seeds: usize,
    pub max_candidates: usize,
}

impl Default for SecondaryLimits {
    fn default() -> Self {
        SecondaryLimits {
            max_seeds: 200_000,
            max_candidates: 20_000,
        }
    }
}

// Skip k-mers occurring more often than this; they are repetitive noise and
// would dominate the pair budget without adding distinct repeat loci.
const MAX_KMER_OCC: usize = 64;

/// Finds direct (tandem or spaced) repeats: two identical arms separated by
/// a bounded spacer.
#[derive(Debug, Clone)]
pub struct DirectRepeatFinder {
    pub pattern_id: u32,
    pub seed_len: usize,
    pub min_arm: usize,
    pub max_spacer: usize,
    pub max_arm: usize,
    pub limits: SecondaryLimits,
}

impl DirectRepeatFinder {
    pub fn new(pattern_id: u32, min_arm: usize, max_spacer: usize, limits: SecondaryLimits) -> Self {
        DirectRepeatFinder {
            pattern_id,
            seed_len: min_arm.min(12).max(4),
            min_arm,
            max_spacer,
            max_arm: 300,
            limits,
        }
    }
}

/// Finds inverted repeats: a left arm whose reverse complement reappears
/// downstream within a bounded spacer (cruciform/hairpin geometry).
#[derive(Debug, Clone)]
pub struct InvertedRepeatFinder {
    pub pattern_id: u32,
    pub seed_len: usize,
    pub min_arm: usize,
    pub max_spacer: usize,
    pub limits: SecondaryLimits,
}

impl InvertedRepeatFinder {
    pub fn new(pattern_id: u32, min_arm: usize, max_spacer: usize, limits: SecondaryLimits) -> Self {
        InvertedRepeatFinder {
            pattern_id,
            seed_len: min_arm.min(12).max(4),
            min_arm,
            max_spacer,
            limits,
        }
    }
}

fn complement(b: u8) -> u8 {
    match b {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' => b'A',
        // Sentinel that matches no text byte: an ambiguous base must stop
        // arm extension, otherwise N "pairs" with N and the inner walk can
        // cross an odd-length spacer's center.
        _ => 0,
    }
}

/// Build a k-mer position index over the uppercased text. K-mers containing
/// non-ACGT bytes are skipped. Keyed by a BTreeMap so the finders walk
/// k-mers in sorted order; when the candidate budget trips, which spans
/// survive truncation must not depend on hash seeding.
fn kmer_index(text: &[u8], k: usize, max_seeds: usize) -> (BTreeMap<&[u8], Vec<usize>>, bool) {
    let mut index: BTreeMap<&[u8], Vec<usize>> = BTreeMap::new();
    let mut total = 0usize;
    let mut truncated = false;

    if text.len() < k {
        return (index, false);
    }
    for pos in 0..=(text.len() - k) {
        let kmer = &text[pos..pos + k];
        if !kmer.iter().all(|&b| matches!(b, b'A' | b'C' | b'G' | b'T')) {
            continue;
        }
        index.entry(kmer).or_default().push(pos);
        total += 1;
        if total >= max_seeds {
            log::warn!(
                "secondary: seed budget {} exhausted at position {}, truncating seed index",
                max_seeds,
                pos
            );
            truncated = true;
            break;
        }
    }
    (index, truncated)
}

impl SecondaryMatcher for DirectRepeatFinder {
    fn pattern_id(&self) -> u32 {
        self.pattern_id
    }

    fn find(&self, text: &[u8]) -> Vec<RawMatch> {
        let upper: Vec<u8> = text.iter().map(|b| b.to_ascii_uppercase()).collect();
        let k = self.seed_len;
        let (index, _) = kmer_index(&upper, k, self.limits.max_seeds);

        // A pair (p1, p2) can only yield a valid repeat when the period
        // p2 - p1 fits min_arm..=max_arm + max_spacer.
        let max_period = self.max_arm + self.max_spacer;
        let mut spans: BTreeSet<(usize, usize)> = BTreeSet::new();

        'outer: for positions in index.values() {
            if positions.len() > MAX_KMER_OCC {
                continue;
            }
            for (i, &p1) in positions.iter().enumerate() {
                for &p2 in &positions[i + 1..] {
                    let period = p2 - p1;
                    if period > max_period {
                        break;
                    }
                    if period < self.min_arm {
                        continue;
                    }

                    // Extend the exact match outward from the seed.
                    let mut back = 0usize;
                    while p1 > back && upper[p1 - back - 1] == upper[p2 - back - 1] {
                        back += 1;
                    }
                    let mut fwd = k;
                    while p2 + fwd < upper.len() && upper[p1 + fwd] == upper[p2 + fwd] {
                        fwd += 1;
                    }

                    // Arms must not overlap: cap at the period.
                    let arm = (back + fwd).min(period);
                    let spacer = period - arm;
                    if arm < self.min_arm || arm > self.max_arm || spacer > self.max_spacer {
                        continue;
                    }

                    let start = p1 - back;
                    let end = p2 - back + arm;
                    spans.insert((start, end));
                    if spans.len() >= self.limits.max_candidates {
                        log::warn!(
                            "secondary: direct repeat candidate budget {} exhausted, truncating",
                            self.limits.max_candidates
                        );
                        break 'outer;
                    }
                }
            }
        }

        dominant_spans(spans)
            .into_iter()
            .map(|(start, end)| RawMatch {
                pattern_id: self.pattern_id,
                start,
                end,
            })
            .collect()
    }
}

impl SecondaryMatcher for InvertedRepeatFinder {
    fn pattern_id(&self) -> u32 {
        self.pattern_id
    }

    fn find(&self, text: &[u8]) -> Vec<RawMatch> {
        let upper: Vec<u8> = text.iter().map(|b| b.to_ascii_uppercase()).collect();
        let k = self.seed_len;
        let (index, _) = kmer_index(&upper, k, self.limits.max_seeds);

        let mut spans: BTreeSet<(usize, usize)> = BTreeSet::new();
        let mut rc_buf: Vec<u8> = vec![0; k];

        'outer: for (&kmer, positions) in index.iter() {
            if positions.len() > MAX_KMER_OCC {
                continue;
            }
            // Reverse complement of the seed; its occurrences are candidate
            // right arms for each left-arm occurrence of `kmer`.
            for (dst, &src) in rc_buf.iter_mut().zip(kmer.iter().rev()) {
                *dst = complement(src);
            }
            let Some(partners) = index.get(rc_buf.as_slice()) else {
                continue;
            };

            for &p1 in positions {
                for &p2 in partners {
                    // Right arm strictly downstream, arms disjoint.
                    if p2 < p1 + k {
                        continue;
                    }
                    if p2 - (p1 + k) > self.max_spacer + 2 * k {
                        continue;
                    }

                    // Outer extension: grow both arms away from the spacer.
                    let mut out = 0usize;
                    while p1 > out
                        && p2 + k + out < upper.len()
                        && upper[p1 - out - 1] == complement(upper[p2 + k + out])
                    {
                        out += 1;
                    }
                    // Inner extension: grow both arms into the spacer.
                    let mut inn = 0usize;
                    while p1 + k + inn < p2 - inn
                        && upper[p1 + k + inn] == complement(upper[p2 - inn - 1])
                    {
                        inn += 1;
                    }

                    let arm = k + out + inn;
                    let spacer = (p2 - inn) - (p1 + k + inn);
                    if arm < self.min_arm || spacer > self.max_spacer {
                        continue;
                    }

                    let start = p1 - out;
                    let end = p2 + k + out;
                    spans.insert((start, end));
                    if spans.len() >= self.limits.max_candidates {
                        log::warn!(
                            "secondary: inverted repeat candidate budget {} exhausted, truncating",
                            self.limits.max_candidates
                        );
                        break 'outer;
                    }
                }
            }
        }

        dominant_spans(spans)
            .into_iter()
            .map(|(start, end)| RawMatch {
                pattern_id: self.pattern_id,
                start,
                end,
            })
            .collect()
    }
}

/// Multiple seeds inside one repeat extend to nested spans. Keep only spans
/// not contained in another reported span; a single sweep over the ordered
/// set is enough.
fn dominant_spans(spans: BTreeSet<(usize, usize)>) -> Vec<(usize, usize)> {
    let mut kept: Vec<(usize, usize)> = Vec::new();
    for (start, end) in spans {
        match kept.last() {
            // Ordered by (start, end): a span is contained in the previous
            // kept span iff it starts inside it and ends no later.
            Some(&(_, kept_end)) if end <= kept_end => continue,
            Some(&(kept_start, kept_end)) if start == kept_start && end > kept_end => {
                // Same start, longer span supersedes.
                kept.pop();
                kept.push((start, end));
            }
            _ => kept.push((start, end)),
        }
    }
    kept
}
