#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::registry::Pattern;

    fn flat_score(_text: &str, _pattern: &Pattern) -> f64 {
        1.0
    }

    fn pattern(id: u32, class: &str) -> Pattern {
        Pattern {
            id,
            expression: "G{3,}".to_string(),
            class_tag: class.to_string(),
            subclass_tag: "Test".to_string(),
            scoring: flat_score,
            min_threshold: 0.0,
        }
    }

    fn raw(pattern_id: u32, start: usize, end: usize) -> RawMatch {
        RawMatch {
            pattern_id,
            start,
            end,
        }
    }

    struct ScoringDetector;

    impl Detector for ScoringDetector {
        fn class_tag(&self) -> &str {
            "Alpha"
        }

        fn detect(
            &self,
            raw: &[RawMatch],
            chunk_text: &str,
            _registry: &PatternRegistry,
        ) -> Result<Vec<CandidateMotif>, DetectorFailure> {
            Ok(raw
                .iter()
                .map(|m| CandidateMotif::from_span(m, chunk_text, "Alpha", "Scored", 2.5, "test"))
                .collect())
        }
    }

    struct FailingDetector;

    impl Detector for FailingDetector {
        fn class_tag(&self) -> &str {
            "Beta"
        }

        fn detect(
            &self,
            _raw: &[RawMatch],
            _chunk_text: &str,
            _registry: &PatternRegistry,
        ) -> Result<Vec<CandidateMotif>, DetectorFailure> {
            Err(DetectorFailure::new("validation rejected the batch"))
        }
    }

    struct PanickingDetector;

    impl Detector for PanickingDetector {
        fn class_tag(&self) -> &str {
            "Gamma"
        }

        fn detect(
            &self,
            _raw: &[RawMatch],
            _chunk_text: &str,
            _registry: &PatternRegistry,
        ) -> Result<Vec<CandidateMotif>, DetectorFailure> {
            panic!("contract violation");
        }
    }

    fn dispatcher_with(detectors: Vec<Arc<dyn Detector>>) -> Dispatcher {
        let mut registry = PatternRegistry::new();
        registry.register(pattern(1, "Alpha")).unwrap();
        registry.register(pattern(2, "Beta")).unwrap();
        registry.register(pattern(3, "Gamma")).unwrap();
        let mut dispatcher = Dispatcher::new(Arc::new(registry));
        for d in detectors {
            dispatcher.register_detector(d);
        }
        dispatcher
    }

    #[test]
    fn test_group_by_class_drops_unknown_ids() {
        let dispatcher = dispatcher_with(vec![]);
        let groups = dispatcher.group_by_class(&[
            raw(1, 0, 3),
            raw(2, 5, 9),
            raw(1, 10, 14),
            raw(99, 0, 2), // not in the registry
        ]);
        let keys: Vec<&str> = groups.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["Alpha", "Beta"]);
        assert_eq!(groups["Alpha"].len(), 2);
        assert_eq!(groups["Beta"].len(), 1);
    }

    #[test]
    fn test_missing_handler_takes_fallback() {
        let dispatcher = dispatcher_with(vec![]);
        let (motifs, warnings) =
            dispatcher.dispatch_class("Alpha", &[raw(1, 2, 7)], "AAGGGGGTT");
        assert!(warnings.is_empty());
        assert_eq!(motifs.len(), 1);
        let m = &motifs[0];
        assert_eq!(m.class_tag, "Alpha");
        assert_eq!(m.subclass_tag, FALLBACK_SUBCLASS);
        assert_eq!(m.score, FALLBACK_SCORE);
        assert_eq!(m.method, FALLBACK_METHOD);
        assert_eq!(m.pattern_id, Some(1));
        // Chunk-local 1-based inclusive from the 0-based half-open span.
        assert_eq!((m.start, m.end, m.length), (3, 7, 5));
        assert_eq!(m.matched_text, "GGGGG");
    }

    #[test]
    fn test_failing_detector_degrades_to_fallback() {
        let dispatcher = dispatcher_with(vec![Arc::new(FailingDetector)]);
        let (motifs, warnings) = dispatcher.dispatch_class("Beta", &[raw(2, 0, 4)], "ACGTACGT");
        assert_eq!(motifs.len(), 1);
        assert_eq!(motifs[0].subclass_tag, FALLBACK_SUBCLASS);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("detector for class 'Beta' failed"));
        assert!(warnings[0].contains("validation rejected the batch"));
    }

    #[test]
    fn test_panicking_detector_is_contained() {
        let dispatcher = dispatcher_with(vec![Arc::new(PanickingDetector)]);
        let (motifs, warnings) = dispatcher.dispatch_class("Gamma", &[raw(3, 0, 4)], "ACGTACGT");
        assert_eq!(motifs.len(), 1);
        assert_eq!(motifs[0].method, FALLBACK_METHOD);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("panicked"));
        assert!(warnings[0].contains("contract violation"));
    }

    #[test]
    fn test_one_failing_class_never_disturbs_the_others() {
        let dispatcher = dispatcher_with(vec![
            Arc::new(ScoringDetector),
            Arc::new(FailingDetector),
        ]);
        let text = "GGGGACGTGGGG";
        let mut warnings = Vec::new();
        let motifs = dispatcher.dispatch(
            &[raw(1, 0, 4), raw(2, 4, 8), raw(1, 8, 12)],
            text,
            &mut warnings,
        );

        let alpha: Vec<&CandidateMotif> =
            motifs.iter().filter(|m| m.class_tag == "Alpha").collect();
        let beta: Vec<&CandidateMotif> =
            motifs.iter().filter(|m| m.class_tag == "Beta").collect();
        assert_eq!(alpha.len(), 2);
        assert!(alpha.iter().all(|m| m.method == "test" && m.score == 2.5));
        assert_eq!(beta.len(), 1);
        assert_eq!(beta[0].method, FALLBACK_METHOD);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Beta"));
    }
}
