#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::engine::MatchEngine;

    #[test]
    fn test_default_registry_shape() {
        let registry = default_registry();
        assert_eq!(registry.len(), 9);
        assert_eq!(
            registry.class_tags(),
            vec![
                "Curved_DNA",
                "G_Quadruplex",
                "Repeat",
                "Triplex",
                "Z_DNA",
                "i_Motif"
            ]
        );
        // Both repeat expressions carry back-references and are deferred.
        let deferred: Vec<u32> = registry.deferred_patterns().iter().map(|p| p.id).collect();
        assert_eq!(deferred, vec![PAT_DIRECT_REPEAT, PAT_INVERTED_REPEAT]);
    }

    #[test]
    fn test_catalog_compiles_cleanly() {
        let registry = default_registry();
        let mut engine = MatchEngine::new(true);
        let mut warnings = Vec::new();
        engine.compile(&registry, &mut warnings).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(engine.compiled().unwrap().pattern_count(), 7);
    }

    #[test]
    fn test_every_class_has_a_detector() {
        let dispatcher = default_dispatcher(SecondaryLimits::default());
        let detector_tags: Vec<&str> =
            dispatcher.detectors().map(|d| d.class_tag()).collect();
        for tag in dispatcher.registry().class_tags() {
            assert!(detector_tags.contains(&tag.as_str()), "no detector for {}", tag);
        }
    }

    #[test]
    fn test_g_run_score() {
        let registry = default_registry();
        let pattern = registry.get(PAT_G4_CANONICAL).unwrap();
        // Four G3 runs contribute 3 * 3 each over 21 bases.
        let score = g_run_score("GGGTTAGGGTTAGGGTTAGGG", pattern);
        assert!((score - 36.0 / 21.0).abs() < 1e-9);
        // C runs pull the mean down symmetrically.
        assert!(g_run_score("CCCTTACCCTTACCCTTACCC", pattern) < 0.0);
    }

    #[test]
    fn test_c_run_score_mirrors_g_run_score() {
        let registry = default_registry();
        let pattern = registry.get(PAT_IMOTIF).unwrap();
        let score = c_run_score("CCCTTACCCTTACCCTTACCC", pattern);
        assert!((score - 36.0 / 21.0).abs() < 1e-9);
    }

    #[test]
    fn test_dinucleotide_step_score() {
        let registry = default_registry();
        let pattern = registry.get(PAT_ZDNA_GC).unwrap();
        // 11 GC/CG steps at weight 1.0.
        assert_eq!(dinucleotide_step_score("GCGCGCGCGCGC", pattern), 11.0);
        // CA/AC steps weigh half.
        assert_eq!(dinucleotide_step_score("CACA", pattern), 1.5);
    }

    #[test]
    fn test_purine_score() {
        let registry = default_registry();
        let pattern = registry.get(PAT_TRIPLEX_PURINE).unwrap();
        // Pure purine tract: score equals its length.
        assert_eq!(purine_score("GAGAGAGAGAGAGAG", pattern), 15.0);
    }
}
