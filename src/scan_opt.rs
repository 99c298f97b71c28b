// Scanner options structure.
//
// One explicit, constructor-injected configuration object passed through the
// call chain; there is no global mutable state, so isolated tests and several
// concurrent configurations can coexist in one process.

use clap::ValueEnum;

/// Policy for selecting among conflicting candidate motifs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OverlapStrategy {
    /// Accept by descending score; reject candidates overlapping an
    /// accepted one at or above the threshold.
    KeepHighestScore,
    /// Same acceptance loop, ordered by descending length.
    KeepLongest,
    /// Coalesce any non-zero overlap into a single union-span motif.
    MergeOverlapping,
    /// No resolution, position sort only.
    KeepAll,
    /// KeepHighestScore applied independently per (class, subclass) group.
    RemoveWithinGroupOnly,
}

#[derive(Debug, Clone)]
pub struct ScanOpt {
    // Chunking parameters
    pub chunk_size: usize, // Non-overlap-extended window size in bases
    pub overlap: usize,    // Window extension; must be >= the longest motif span the registry can produce

    // Matching parameters
    pub case_insensitive: bool, // Compile patterns with (?i)

    // Dispatch parameters
    pub parallel: bool,                       // Fan detector classes out across the rayon pool
    pub task_timeout_ms: Option<u64>,         // Global per-chunk timeout for detector tasks
    pub strategy: OverlapStrategy,            // Overlap resolution policy
    pub overlap_threshold: f64,               // Conflict threshold for the selection strategies

    // Secondary matcher self-limits (runaway guards, documented truncation)
    pub max_secondary_seeds: usize,      // Cap on k-mer seed positions per chunk
    pub max_secondary_candidates: usize, // Cap on extended repeat candidates per chunk
}

impl Default for ScanOpt {
    fn default() -> Self {
        ScanOpt {
            chunk_size: 1_000_000,
            overlap: 500,
            case_insensitive: true,
            parallel: true,
            task_timeout_ms: None,
            strategy: OverlapStrategy::KeepHighestScore,
            overlap_threshold: 0.5,
            max_secondary_seeds: 200_000,
            max_secondary_candidates: 20_000,
        }
    }
}

impl ScanOpt {
    /// Sanity-check the chunking parameters. The overlap >= longest-motif
    /// invariant is a configuration contract and cannot be auto-detected;
    /// only structural mistakes are rejected here.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be positive".to_string());
        }
        if self.overlap >= self.chunk_size {
            return Err(format!(
                "overlap {} must be smaller than chunk_size {}",
                self.overlap, self.chunk_size
            ));
        }
        if !(0.0..=1.0).contains(&self.overlap_threshold) {
            return Err(format!(
                "overlap_threshold {} must be within [0, 1]",
                self.overlap_threshold
            ));
        }
        Ok(())
    }
}
