#[cfg(test)]
mod tests {
    use super::super::*;
    use std::thread;

    type Task = Box<dyn FnOnce() -> (Vec<CandidateMotif>, Vec<String>) + Send>;

    fn mk(class: &str, start: usize) -> CandidateMotif {
        CandidateMotif {
            class_tag: class.to_string(),
            subclass_tag: "Test".to_string(),
            start,
            end: start + 9,
            length: 10,
            matched_text: "N".repeat(10),
            score: 1.0,
            normalized_score: None,
            method: "test".to_string(),
            pattern_id: None,
            attributes: Vec::new(),
        }
    }

    fn done(class: &'static str, start: usize) -> (String, Task) {
        (
            class.to_string(),
            Box::new(move || (vec![mk(class, start)], Vec::new())),
        )
    }

    #[test]
    fn test_no_tasks() {
        let executor = ParallelExecutor::new(None);
        let mut warnings = Vec::new();
        let (motifs, incomplete) = executor.run_all(Vec::<(String, Task)>::new(), &mut warnings);
        assert!(motifs.is_empty());
        assert!(!incomplete);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_all_tasks_gathered() {
        let executor = ParallelExecutor::new(None);
        let mut warnings = Vec::new();
        let tasks = vec![done("A", 1), done("B", 20), done("C", 40)];
        let (motifs, incomplete) = executor.run_all(tasks, &mut warnings);
        assert_eq!(motifs.len(), 3);
        assert!(!incomplete);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_panicking_task_isolated() {
        let executor = ParallelExecutor::new(None);
        let mut warnings = Vec::new();
        let tasks: Vec<(String, Task)> = vec![
            done("A", 1),
            ("B".to_string(), Box::new(|| panic!("detector bug"))),
            done("C", 40),
        ];
        let (motifs, incomplete) = executor.run_all(tasks, &mut warnings);
        assert_eq!(motifs.len(), 2);
        assert!(!incomplete);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("class 'B'"));
        assert!(warnings[0].contains("detector bug"));
    }

    #[test]
    fn test_task_warnings_surface_in_stable_order() {
        let executor = ParallelExecutor::new(None);
        let mut warnings = Vec::new();
        let tasks: Vec<(String, Task)> = vec![
            (
                "B".to_string(),
                Box::new(|| (Vec::new(), vec!["beta warning".to_string()])),
            ),
            (
                "A".to_string(),
                Box::new(|| (Vec::new(), vec!["alpha warning".to_string()])),
            ),
        ];
        let (_, _) = executor.run_all(tasks, &mut warnings);
        assert_eq!(warnings, vec!["alpha warning", "beta warning"]);
    }

    #[test]
    fn test_timeout_flags_incomplete_but_keeps_late_results() {
        let executor = ParallelExecutor::new(Some(Duration::from_millis(20)));
        let mut warnings = Vec::new();
        let tasks: Vec<(String, Task)> = vec![
            done("A", 1),
            (
                "B".to_string(),
                Box::new(|| {
                    thread::sleep(Duration::from_millis(300));
                    (vec![mk("B", 20)], Vec::new())
                }),
            ),
        ];
        let (motifs, incomplete) = executor.run_all(tasks, &mut warnings);
        assert!(incomplete);
        assert!(warnings.iter().any(|w| w.contains("timeout")));
        // The in-flight task is drained, not abandoned; its motifs are kept.
        assert!(motifs.iter().any(|m| m.class_tag == "B"));
    }
}
