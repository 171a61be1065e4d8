use proptest::prelude::*;
use qgenv::harness::Aggregator;
use qgenv::output::compose_report;

fn check() -> impl Strategy<Value = (String, bool, String)> {
    (".{0,24}", any::<bool>(), ".{0,40}")
}

proptest! {
    #[test]
    fn summary_counts_every_result(checks in prop::collection::vec(check(), 0..64)) {
        let mut agg = Aggregator::new();
        for (name, passed, message) in &checks {
            agg.add_result(name.clone(), *passed, message.clone());
        }
        let s = agg.summarize();
        prop_assert_eq!(s.total, checks.len());
        prop_assert_eq!(s.passed + s.failed, s.total);
        prop_assert_eq!(s.passed, checks.iter().filter(|c| c.1).count());
        prop_assert_eq!(s.success, s.failed == 0);
        prop_assert!((0.0..=100.0).contains(&s.success_rate));
    }

    #[test]
    fn report_failures_are_the_failing_results_in_order(checks in prop::collection::vec(check(), 0..64)) {
        let mut agg = Aggregator::new();
        for (name, passed, message) in &checks {
            agg.add_result(name.clone(), *passed, message.clone());
        }
        let report = compose_report(&agg, "2024-05-01T10:00:00.000000", "env");
        let expected: Vec<(String, String)> = checks
            .iter()
            .filter(|c| !c.1)
            .map(|c| (c.0.clone(), c.2.clone()))
            .collect();
        let got: Vec<(String, String)> = report
            .failures
            .iter()
            .map(|f| (f.test.clone(), f.message.clone()))
            .collect();
        prop_assert_eq!(got, expected);
        prop_assert_eq!(report.total_tests, checks.len());
        prop_assert_eq!(report.failed, report.failures.len());
    }
}

#[test]
fn empty_run_summary() {
    let s = Aggregator::new().summarize();
    assert_eq!((s.total, s.passed, s.failed), (0, 0, 0));
    assert!(s.success);
}
