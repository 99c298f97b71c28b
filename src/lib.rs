// Streaming multi-pattern motif scanner for genomic sequences.
//
// Pipeline: PatternRegistry -> MatchEngine (plus per-detector secondary
// matchers for back-reference-style patterns) -> Dispatcher -> ChunkedScanner
// -> OverlapResolver. The registry and compiled engine are read-only after
// construction and shared freely across workers; everything per-scan is
// transient.

pub mod analyze;
pub mod builtin; // Default motif catalog + detectors (configuration, not core)
pub mod chunking;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod fasta_reader; // FASTA input for the CLI wrapper
pub mod motif;
pub mod parallel;
pub mod registry;
pub mod resolve;
pub mod scan_opt;
pub mod secondary; // Seed-and-extend matchers for deferred patterns

pub use crate::analyze::analyze;
pub use crate::error::ScanError;
pub use crate::motif::{CandidateMotif, RawMatch, ScanReport};
pub use crate::registry::{Pattern, PatternRegistry};
pub use crate::scan_opt::{OverlapStrategy, ScanOpt};
