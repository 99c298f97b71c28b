// Primary multi-pattern match engine.
//
// Compiles every engine-expressible registry expression into one shared,
// read-only pattern set: a RegexSet prefilter answers "which patterns occur
// at all in this chunk" in a single pass, and only those patterns are then
// walked with find_iter for positions. Back-reference patterns never reach
// this module; they go through the per-detector secondary matchers.

use crate::error::ScanError;
use crate::motif::RawMatch;
use crate::registry::PatternRegistry;
use regex::{Regex, RegexSet};
use std::panic::{self, AssertUnwindSafe};

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Compiled pattern database. Treated as a cached, shared, read-only
/// resource once built (safe for concurrent scans without locking).
#[derive(Debug)]
pub struct CompiledPatterns {
    regexes: Vec<(u32, Regex)>,
    prefilter: RegexSet,
    /// Pattern ids dropped at compile time with a warning.
    pub skipped: Vec<u32>,
}

#[derive(Debug, Default)]
pub struct MatchEngine {
    compiled: Option<CompiledPatterns>,
    case_insensitive: bool,
}

impl MatchEngine {
    pub fn new(case_insensitive: bool) -> Self {
        MatchEngine {
            compiled: None,
            case_insensitive,
        }
    }

    /// Compile the registry's engine-expressible patterns. An invalid
    /// expression is skipped with a warning, not a hard failure, unless the
    /// surviving set is empty. Compile-time warnings are appended to
    /// `warnings` so the caller can surface them on the report.
    pub fn compile(
        &mut self,
        registry: &PatternRegistry,
        warnings: &mut Vec<String>,
    ) -> Result<(), ScanError> {
        if registry.is_empty() {
            return Err(ScanError::EmptyRegistry);
        }
        self.compiled = Some(compile_patterns(
            registry,
            self.case_insensitive,
            warnings,
        )?);
        Ok(())
    }

    /// Drop the cached database so the next compile rebuilds it.
    pub fn force_recompile(&mut self) {
        self.compiled = None;
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.is_some()
    }

    pub fn compiled(&self) -> Option<&CompiledPatterns> {
        self.compiled.as_ref()
    }
}

fn compile_patterns(
    registry: &PatternRegistry,
    case_insensitive: bool,
    warnings: &mut Vec<String>,
) -> Result<CompiledPatterns, ScanError> {
    let candidates = registry.engine_patterns();
    let mut regexes: Vec<(u32, Regex)> = Vec::with_capacity(candidates.len());
    let mut accepted_exprs: Vec<String> = Vec::with_capacity(candidates.len());
    let mut skipped: Vec<u32> = Vec::new();

    for (expression, id) in candidates {
        let expr = if case_insensitive {
            format!("(?i){}", expression)
        } else {
            expression.clone()
        };
        match Regex::new(&expr) {
            Ok(re) => {
                regexes.push((id, re));
                accepted_exprs.push(expr);
            }
            Err(e) => {
                let err = ScanError::PatternCompile { id, source: e };
                log::warn!("{}", err);
                warnings.push(err.to_string());
                skipped.push(id);
            }
        }
    }

    if regexes.is_empty() {
        return Err(ScanError::EmptyRegistry);
    }

    // The set and the per-pattern vector are index-aligned.
    let prefilter = RegexSet::new(&accepted_exprs).map_err(|e| ScanError::PatternCompile {
        id: 0,
        source: e,
    })?;

    log::info!(
        "engine: compiled {} patterns ({} skipped, {} deferred to secondary matchers)",
        regexes.len(),
        skipped.len(),
        registry.deferred_patterns().len()
    );

    Ok(CompiledPatterns {
        regexes,
        prefilter,
        skipped,
    })
}

impl CompiledPatterns {
    pub fn pattern_count(&self) -> usize {
        self.regexes.len()
    }

    /// Scan one chunk of text, reporting every match of every compiled
    /// pattern. Overlapping matches from different patterns are expected and
    /// not deduplicated here. Engine-native iteration order is per pattern,
    /// so the result is explicitly sorted by (start, end, pattern_id) before
    /// return; downstream determinism depends on that ordering.
    ///
    /// An internal error while walking one pattern aborts only the remainder
    /// of this primary scan; matches collected so far are returned together
    /// with a warning, and the chunk continues through the secondary and
    /// dispatch paths.
    pub fn scan(&self, text: &str, warnings: &mut Vec<String>, chunk_index: usize) -> Vec<RawMatch> {
        let mut matches: Vec<RawMatch> = Vec::new();

        let live = self.prefilter.matches(text);
        for set_idx in live.iter() {
            let (id, re) = &self.regexes[set_idx];
            let walked = panic::catch_unwind(AssertUnwindSafe(|| {
                let mut found: Vec<RawMatch> = Vec::new();
                for m in re.find_iter(text) {
                    found.push(RawMatch {
                        pattern_id: *id,
                        start: m.start(),
                        end: m.end(),
                    });
                }
                found
            }));
            match walked {
                Ok(found) => matches.extend(found),
                Err(payload) => {
                    let cause = panic_message(payload);
                    let err = crate::error::ScanError::EngineScan {
                        chunk: chunk_index,
                        cause,
                    };
                    log::warn!("{}", err);
                    warnings.push(err.to_string());
                    break;
                }
            }
        }

        matches.sort_by_key(|m| (m.start, m.end, m.pattern_id));
        matches
    }
}

pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
