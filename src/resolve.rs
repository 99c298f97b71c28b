// Overlap resolution: deduplicate and select among candidate motifs by
// configurable strategy.
//
// The selection strategies run in O(n log n): candidates are visited in
// priority order, and accepted intervals are kept in a BTreeMap keyed by
// start position so each acceptance test is a range query over a bounded
// neighborhood (widest accepted length) instead of a scan of everything
// accepted so far. Genome-scale candidate counts stay tractable.

use crate::motif::{overlap_fraction, CandidateMotif};
use crate::scan_opt::OverlapStrategy;
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[cfg(test)]
#[path = "resolve_test.rs"]
mod resolve_test;

#[derive(Debug, Clone, Copy)]
pub struct OverlapResolver {
    pub strategy: OverlapStrategy,
    pub overlap_threshold: f64,
}

impl OverlapResolver {
    pub fn new(strategy: OverlapStrategy, overlap_threshold: f64) -> Self {
        OverlapResolver {
            strategy,
            overlap_threshold,
        }
    }

    /// Apply the configured strategy. Output is always sorted ascending by
    /// (start, end, class, subclass); for the selection strategies it is
    /// guaranteed overlap-free within its comparison scope at the configured
    /// threshold. Re-running the resolver on its own output is a no-op.
    pub fn resolve(&self, candidates: Vec<CandidateMotif>) -> Vec<CandidateMotif> {
        let mut resolved = match self.strategy {
            OverlapStrategy::KeepAll => candidates,
            OverlapStrategy::KeepHighestScore => {
                select_non_overlapping(candidates, self.overlap_threshold, false)
            }
            OverlapStrategy::KeepLongest => {
                select_non_overlapping(candidates, self.overlap_threshold, true)
            }
            OverlapStrategy::RemoveWithinGroupOnly => {
                let mut groups: BTreeMap<(String, String), Vec<CandidateMotif>> = BTreeMap::new();
                for c in candidates {
                    groups
                        .entry((c.class_tag.clone(), c.subclass_tag.clone()))
                        .or_default()
                        .push(c);
                }
                let mut out = Vec::new();
                for (_, group) in groups {
                    out.extend(select_non_overlapping(group, self.overlap_threshold, false));
                }
                out
            }
            OverlapStrategy::MergeOverlapping => merge_overlapping(candidates),
        };

        resolved.sort_by(position_order);
        resolved
    }
}

fn position_order(a: &CandidateMotif, b: &CandidateMotif) -> Ordering {
    a.start
        .cmp(&b.start)
        .then(a.end.cmp(&b.end))
        .then_with(|| a.class_tag.cmp(&b.class_tag))
        .then_with(|| a.subclass_tag.cmp(&b.subclass_tag))
}

/// Priority order for the selection strategies. Single deterministic
/// tie-break: primary key descending, the other of (score, length)
/// descending, then ascending start/end and class tags so equal candidates
/// compare stably.
fn selection_order(a: &CandidateMotif, b: &CandidateMotif, longest_first: bool) -> Ordering {
    let primary = if longest_first {
        b.length
            .cmp(&a.length)
            .then_with(|| b.score.total_cmp(&a.score))
    } else {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.length.cmp(&a.length))
    };
    primary
        .then(a.start.cmp(&b.start))
        .then(a.end.cmp(&b.end))
        .then_with(|| a.class_tag.cmp(&b.class_tag))
        .then_with(|| a.subclass_tag.cmp(&b.subclass_tag))
}

/// Greedy acceptance in priority order: a candidate is accepted iff its
/// overlap fraction with every already-accepted candidate in scope stays
/// below the threshold.
fn select_non_overlapping(
    mut candidates: Vec<CandidateMotif>,
    threshold: f64,
    longest_first: bool,
) -> Vec<CandidateMotif> {
    candidates.sort_by(|a, b| selection_order(a, b, longest_first));

    // (start, insertion seq) -> index into `accepted`; the seq component
    // permits several accepted intervals sharing a start.
    let mut by_start: BTreeMap<(usize, usize), usize> = BTreeMap::new();
    let mut accepted: Vec<CandidateMotif> = Vec::new();
    let mut widest = 0usize;

    'candidate: for cand in candidates {
        // Any accepted interval overlapping cand starts no earlier than
        // cand.start - (widest - 1) and no later than cand.end.
        let lo = (cand.start.saturating_sub(widest), 0usize);
        let hi = (cand.end, usize::MAX);
        for (_, &idx) in by_start.range(lo..=hi) {
            if overlap_fraction(&accepted[idx], &cand) >= threshold {
                continue 'candidate;
            }
        }
        by_start.insert((cand.start, accepted.len()), accepted.len());
        widest = widest.max(cand.length);
        accepted.push(cand);
    }

    accepted
}

/// Coalesce candidates with non-zero overlap into one motif spanning their
/// union, scoring the sum of constituents and recording the merged sources
/// in the attributes. Candidates that overlap nothing pass through
/// untouched, which keeps the operation idempotent.
fn merge_overlapping(mut candidates: Vec<CandidateMotif>) -> Vec<CandidateMotif> {
    candidates.sort_by(position_order);

    let mut out: Vec<CandidateMotif> = Vec::new();
    let mut group: Vec<CandidateMotif> = Vec::new();
    let mut group_end = 0usize;

    for cand in candidates {
        if group.is_empty() || cand.start <= group_end {
            group_end = group_end.max(cand.end);
            group.push(cand);
        } else {
            out.push(flush_group(std::mem::take(&mut group)));
            group_end = cand.end;
            group.push(cand);
        }
    }
    if !group.is_empty() {
        out.push(flush_group(group));
    }
    out
}

fn flush_group(mut group: Vec<CandidateMotif>) -> CandidateMotif {
    if group.len() == 1 {
        return group.pop().unwrap();
    }

    let span_start = group[0].start;
    let span_end = group.iter().map(|m| m.end).max().unwrap_or(group[0].end);

    // Members are position-sorted and each overlaps the running union, so
    // the union text can be stitched from constituent texts.
    let mut text = group[0].matched_text.clone();
    let mut covered_end = group[0].end;
    for m in &group[1..] {
        if m.end > covered_end {
            let suffix_from = covered_end + 1 - m.start;
            text.push_str(&m.matched_text[suffix_from..]);
            covered_end = m.end;
        }
    }

    let uniform = |pick: fn(&CandidateMotif) -> &str| -> String {
        let first = pick(&group[0]);
        if group.iter().all(|m| pick(m) == first) {
            first.to_string()
        } else {
            "Mixed".to_string()
        }
    };

    let sources = group
        .iter()
        .map(|m| format!("{}:{}:{}-{}", m.class_tag, m.subclass_tag, m.start, m.end))
        .collect::<Vec<_>>()
        .join(",");

    CandidateMotif {
        class_tag: uniform(|m| &m.class_tag),
        subclass_tag: uniform(|m| &m.subclass_tag),
        start: span_start,
        end: span_end,
        length: span_end - span_start + 1,
        matched_text: text,
        score: group.iter().map(|m| m.score).sum(),
        normalized_score: None,
        method: "merge".to_string(),
        pattern_id: None,
        attributes: vec![
            ("Merged_Count".to_string(), group.len().to_string()),
            ("Merged_From".to_string(), sources),
        ],
    }
}
