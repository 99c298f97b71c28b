// Error taxonomy for the scanning core.
//
// Only registry construction errors (duplicate id, empty pattern set) are
// fatal to the caller. Everything else is recovered locally and surfaced as
// a warning string on the ScanReport.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    /// A pattern id was registered twice. The failing call leaves the
    /// registry unchanged.
    #[error("duplicate pattern id {0}")]
    DuplicateId(u32),

    /// Compile was requested with zero usable patterns.
    #[error("pattern registry is empty")]
    EmptyRegistry,

    /// One expression failed to compile. Non-fatal: the expression is
    /// dropped and the rest of the set proceeds.
    #[error("pattern {id} failed to compile: {source}")]
    PatternCompile {
        id: u32,
        #[source]
        source: regex::Error,
    },

    /// The primary engine aborted mid-scan. Only that chunk's primary scan
    /// phase is lost; matches collected before the failure are kept.
    #[error("primary scan aborted in chunk {chunk}: {cause}")]
    EngineScan { chunk: usize, cause: String },

    /// A detector returned a failure or violated its no-panic contract.
    /// Isolated per class per chunk; the raw matches fall back to generic
    /// motifs.
    #[error("detector for class '{class}' failed: {cause}")]
    Detector { class: String, cause: String },

    /// A whole chunk failed catastrophically. The scanner continues with
    /// the next chunk and the run is reported as partial.
    #[error("chunk {index} failed: {cause}")]
    Chunk { index: usize, cause: String },

    /// The parallel executor's global timeout expired. Completed task
    /// results are kept and the batch is flagged incomplete.
    #[error("detector tasks exceeded the configured timeout")]
    TimeoutExceeded,
}
