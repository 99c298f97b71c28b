// End-to-end scans through analyze() with the built-in catalog.

use motif_scan::analyze::analyze;
use motif_scan::builtin;
use motif_scan::engine::MatchEngine;
use motif_scan::motif::CandidateMotif;
use motif_scan::scan_opt::{OverlapStrategy, ScanOpt};
use motif_scan::secondary::SecondaryLimits;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const G4_ISLAND: &str = "GGGTTAGGGTTAGGGTTAGGG";

fn scan(sequence: &str, opt: &ScanOpt) -> Vec<CandidateMotif> {
    let dispatcher = builtin::default_dispatcher(SecondaryLimits::default());
    let mut engine = MatchEngine::new(opt.case_insensitive);
    let report = analyze(sequence, "test", opt, &dispatcher, &mut engine).unwrap();
    assert!(!report.partial && !report.incomplete);
    report.motifs
}

fn random_sequence(len: usize, seed: u64) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| ['A', 'C', 'G', 'T'][rng.gen_range(0..4)])
        .collect()
}

#[test]
fn canonical_g4_wins_over_weaker_subclasses() {
    // The 21-mer matches both the canonical and the two-tetrad expression
    // over the same span; the default strategy keeps exactly one.
    let motifs = scan(G4_ISLAND, &ScanOpt::default());
    assert_eq!(motifs.len(), 1);
    let m = &motifs[0];
    assert_eq!(m.class_tag, "G_Quadruplex");
    assert_eq!(m.subclass_tag, "Canonical_G4");
    assert_eq!((m.start, m.end, m.length), (1, 21, 21));
    assert_eq!(m.matched_text, G4_ISLAND);
    assert_eq!(m.method, "pattern_regex");
}

#[test]
fn keep_all_exposes_every_validated_candidate() {
    let mut opt = ScanOpt::default();
    opt.strategy = OverlapStrategy::KeepAll;
    let motifs = scan(G4_ISLAND, &opt);
    let subclasses: Vec<&str> = motifs.iter().map(|m| m.subclass_tag.as_str()).collect();
    assert_eq!(subclasses, vec!["Canonical_G4", "Two_Tetrad_G4"]);
}

#[test]
fn matching_is_case_insensitive_by_default() {
    let upper = scan(G4_ISLAND, &ScanOpt::default());
    let lower = scan(&G4_ISLAND.to_lowercase(), &ScanOpt::default());
    assert_eq!(upper.len(), lower.len());
    assert_eq!(
        (upper[0].start, upper[0].end),
        (lower[0].start, lower[0].end)
    );
}

#[test]
fn motif_straddling_a_window_boundary_is_reported_once() {
    // AC background never validates as any catalog class; its own k-mers are
    // over the repeat finders' occurrence cap, and their reverse complements
    // (GT-alternating) never occur in the text.
    let mut seq: Vec<u8> = "AC".repeat(125).into_bytes();
    seq[94..115].copy_from_slice(G4_ISLAND.as_bytes());
    let seq = String::from_utf8(seq).unwrap();

    let mut opt = ScanOpt::default();
    opt.chunk_size = 100;
    opt.overlap = 50;
    let motifs = scan(&seq, &opt);

    assert_eq!(motifs.len(), 1);
    assert_eq!((motifs[0].start, motifs[0].end), (95, 115));

    // Same result when the whole sequence fits one window.
    let whole = scan(&seq, &ScanOpt::default());
    assert_eq!(motifs, whole);
}

#[test]
fn direct_repeat_found_through_full_pipeline() {
    let arm = "ATCGGATTCAGAGGCTTACG"; // 20 bp
    let mut seq = "AC".repeat(40);
    seq.push_str(arm);
    seq.push_str("CACATG");
    seq.push_str(arm);
    seq.push_str(&"AC".repeat(40));

    let motifs = scan(&seq, &ScanOpt::default());
    assert_eq!(motifs.len(), 1);
    let m = &motifs[0];
    assert_eq!(m.class_tag, "Repeat");
    assert_eq!(m.subclass_tag, "Direct_Repeat");
    assert_eq!(m.method, "seed_extend");
    // Arm + 6 bp spacer + arm, 1-based inclusive.
    assert_eq!((m.start, m.end, m.length), (81, 126, 46));
}

#[test]
fn parallel_dispatch_is_deterministic() {
    let seq = random_sequence(3000, 7);
    let mut serial = ScanOpt::default();
    serial.parallel = false;
    serial.chunk_size = 800;
    serial.overlap = 200;
    let mut parallel = serial.clone();
    parallel.parallel = true;

    let serial_motifs = scan(&seq, &serial);
    let parallel_once = scan(&seq, &parallel);
    let parallel_again = scan(&seq, &parallel);

    assert_eq!(serial_motifs, parallel_once);
    assert_eq!(parallel_once, parallel_again);
}

#[test]
fn invalid_configuration_is_rejected() {
    let mut opt = ScanOpt::default();
    opt.chunk_size = 100;
    opt.overlap = 100; // must be smaller than chunk_size

    let dispatcher = builtin::default_dispatcher(SecondaryLimits::default());
    let mut engine = MatchEngine::new(true);
    assert!(analyze("ACGT", "test", &opt, &dispatcher, &mut engine).is_err());
}

#[test]
fn empty_sequence_produces_empty_report() {
    let motifs = scan("", &ScanOpt::default());
    assert!(motifs.is_empty());
}
