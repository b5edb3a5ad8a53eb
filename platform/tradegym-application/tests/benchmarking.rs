use tradegym_application::benchmarking::{run_bench, synthetic_prices};

#[test]
fn synthetic_prices_are_deterministic_and_positive() {
    let a = synthetic_prices(500);
    let b = synthetic_prices(500);
    assert_eq!(a, b);
    assert_eq!(a[0], 100.0);
    assert!(a.iter().all(|p| p.is_finite() && *p > 0.0));
}

#[test]
fn run_bench_processes_every_requested_step() {
    for policy in ["hold", "buy_and_hold", "sma"] {
        let summary = run_bench(1_000, policy, 10_000.0).expect("bench");
        assert_eq!(summary.policy, policy);
        assert_eq!(summary.steps_requested, 1_000);
        assert_eq!(summary.steps_processed, 1_000);
        assert_eq!(summary.result.history.len(), 1_000);
    }
}

#[test]
fn run_bench_rejects_bad_arguments() {
    assert!(run_bench(0, "hold", 10_000.0).is_err());
    assert!(run_bench(10, "martingale", 10_000.0).is_err());
    assert!(run_bench(10, "hold", 0.0).is_err());
}
