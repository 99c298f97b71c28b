// Pattern registry: immutable-after-build catalog mapping a unique integer
// pattern id to (expression, class tag, subclass tag, scoring handle,
// threshold). Built once at startup, then shared read-only across all
// workers without locking.

use crate::error::ScanError;
use crate::motif::ScoreFn;
use std::collections::BTreeMap;

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;

/// A registered sub-expression used to find candidate regions.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub id: u32,
    pub expression: String,
    pub class_tag: String,
    pub subclass_tag: String,
    pub scoring: ScoreFn,
    pub min_threshold: f64,
}

#[derive(Debug, Default)]
pub struct PatternRegistry {
    // BTreeMap keeps iteration ordered by id, which keeps downstream
    // compilation and grouping deterministic.
    patterns: BTreeMap<u32, Pattern>,
}

impl PatternRegistry {
    pub fn new() -> Self {
        PatternRegistry {
            patterns: BTreeMap::new(),
        }
    }

    /// Register one pattern. Fails without mutating state if the id is
    /// already present.
    pub fn register(&mut self, pattern: Pattern) -> Result<(), ScanError> {
        if self.patterns.contains_key(&pattern.id) {
            return Err(ScanError::DuplicateId(pattern.id));
        }
        log::debug!(
            "registry: pattern {} ({}/{}) registered",
            pattern.id,
            pattern.class_tag,
            pattern.subclass_tag
        );
        self.patterns.insert(pattern.id, pattern);
        Ok(())
    }

    pub fn get(&self, id: u32) -> Option<&Pattern> {
        self.patterns.get(&id)
    }

    pub fn class_of(&self, id: u32) -> Option<&str> {
        self.patterns.get(&id).map(|p| p.class_tag.as_str())
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Ordered (expression, id) list of every pattern the primary engine's
    /// grammar supports: no back-references, no lookaround.
    pub fn engine_patterns(&self) -> Vec<(String, u32)> {
        self.patterns
            .values()
            .filter(|p| expressible_for_engine(&p.expression))
            .map(|p| (p.expression.clone(), p.id))
            .collect()
    }

    /// Patterns the primary engine cannot express; handled by per-detector
    /// secondary matchers instead.
    pub fn deferred_patterns(&self) -> Vec<&Pattern> {
        self.patterns
            .values()
            .filter(|p| !expressible_for_engine(&p.expression))
            .collect()
    }

    /// Distinct class tags present in the registry, in sorted order.
    pub fn class_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self
            .patterns
            .values()
            .map(|p| p.class_tag.clone())
            .collect();
        tags.sort();
        tags.dedup();
        tags
    }
}

/// The primary engine compiles a regex subset: back-references and
/// lookaround are out. A conservative textual scan is enough because
/// registered expressions are short, hand-written motif patterns.
pub fn expressible_for_engine(expression: &str) -> bool {
    let bytes = expression.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() => {
                // \1 .. \9 are back-references
                if bytes[i + 1].is_ascii_digit() && bytes[i + 1] != b'0' {
                    return false;
                }
                i += 2;
                continue;
            }
            b'(' if i + 2 < bytes.len() && bytes[i + 1] == b'?' => {
                // (?= (?! lookahead, (?<= (?<! lookbehind; (?: (?i and
                // named groups (?<name> are fine
                let c = bytes[i + 2];
                if c == b'='
                    || c == b'!'
                    || (c == b'<'
                        && i + 3 < bytes.len()
                        && (bytes[i + 3] == b'=' || bytes[i + 3] == b'!'))
                {
                    return false;
                }
            }
            _ => {}
        }
        i += 1;
    }
    true
}
