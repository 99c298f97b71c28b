// Primary entry point: compile, chunked scan, overlap resolution.
//
// No error originating inside a single pattern, detector, or chunk aborts
// this call; such errors are recovered locally and surfaced as warnings on
// the report. Only registry-level problems (empty usable pattern set) fail
// outright, before any scanning begins.

use crate::dispatch::Dispatcher;
use crate::engine::MatchEngine;
use crate::motif::ScanReport;
use crate::resolve::OverlapResolver;
use crate::chunking::ChunkedScanner;
use crate::scan_opt::ScanOpt;
use anyhow::Result;
use std::time::Instant;

/// Analyze one sequence and return the final annotated interval set.
///
/// The engine is compiled from the dispatcher's registry on first use and
/// cached across calls; use `MatchEngine::force_recompile` to rebuild it.
/// Two runs with identical inputs and options produce identical ordered
/// output regardless of thread scheduling.
pub fn analyze(
    sequence: &str,
    name: &str,
    opt: &ScanOpt,
    dispatcher: &Dispatcher,
    engine: &mut MatchEngine,
) -> Result<ScanReport> {
    opt.validate().map_err(|e| anyhow::anyhow!("invalid scan options: {}", e))?;

    let start_time = Instant::now();
    let mut report = ScanReport::default();

    if !engine.is_compiled() {
        engine.compile(dispatcher.registry(), &mut report.warnings)?;
    }

    let scanner = ChunkedScanner::new(opt, engine, dispatcher);
    let scanned = scanner.run(sequence, name);

    let candidate_count = scanned.motifs.len();
    report.warnings.extend(scanned.warnings);
    report.partial = scanned.partial;
    report.incomplete = scanned.incomplete;

    let resolver = OverlapResolver::new(opt.strategy, opt.overlap_threshold);
    report.motifs = resolver.resolve(scanned.motifs);

    log::info!(
        "{}: {} bp, {} candidates -> {} motifs ({:?}) in {:.2} sec{}{}",
        name,
        sequence.len(),
        candidate_count,
        report.motifs.len(),
        opt.strategy,
        start_time.elapsed().as_secs_f64(),
        if report.partial { " [partial]" } else { "" },
        if report.incomplete { " [incomplete]" } else { "" }
    );

    Ok(report)
}
