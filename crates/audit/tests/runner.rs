//! Target iteration across the page registry

mod common;

use std::sync::atomic::Ordering;

use test_case::test_case;

use common::{FakeNavigator, FakePage, CERT_ADDRESS, SITE_ADDRESS};
use pagecheck_audit::runner::write_results;
use pagecheck_audit::{
    AuditCategory, AuditConfig, AuditEngine, AuditRunner, AuditSummary, RunnerConfig, Target,
};

fn registry() -> Vec<Target> {
    AuditConfig::default().targets
}

fn runner(navigator: FakeNavigator, concurrency: usize) -> AuditRunner<FakeNavigator> {
    let engine = AuditEngine::from_config(&AuditConfig::default()).unwrap();
    AuditRunner::new(
        navigator,
        engine,
        RunnerConfig {
            concurrency,
            ..Default::default()
        },
    )
}

fn labels(summary: &AuditSummary) -> Vec<(String, AuditCategory)> {
    summary
        .outcomes
        .iter()
        .map(|o| (o.target.label.clone(), o.category))
        .collect()
}

#[tokio::test]
async fn every_target_runs_both_audits_in_registry_order() {
    let navigator = FakeNavigator::new()
        .page(CERT_ADDRESS, FakePage::clean())
        .page(SITE_ADDRESS, FakePage::clean());
    let opened = navigator.opened.clone();
    let released = navigator.released.clone();

    let summary = runner(navigator, 4).run(&registry()).await;

    assert_eq!(summary.total, 4);
    assert_eq!(summary.passed, 4);
    assert!(summary.success());
    assert_eq!(
        labels(&summary),
        vec![
            ("Certificação".to_string(), AuditCategory::Quality),
            ("Certificação".to_string(), AuditCategory::Functional),
            ("Site".to_string(), AuditCategory::Quality),
            ("Site".to_string(), AuditCategory::Functional),
        ]
    );
    assert_eq!(opened.load(Ordering::SeqCst), 4);
    assert_eq!(released.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn findings_never_fail_the_run() {
    let noisy = FakePage::new()
        .image(None)
        .violations(12)
        .body("lorem ipsum dolor sit amet");
    let navigator = FakeNavigator::new()
        .page(CERT_ADDRESS, noisy.clone())
        .page(SITE_ADDRESS, noisy);

    let summary = runner(navigator, 4).run(&registry()).await;

    assert!(summary.success());
    assert!(summary.finding_count() > 0);
    assert!(summary.outcomes.iter().all(|o| o.failure.is_none()));
}

#[tokio::test]
async fn broken_link_fails_only_its_own_target() {
    let navigator = FakeNavigator::new()
        .page(CERT_ADDRESS, FakePage::clean().link("Saiba mais", Some("")))
        .page(SITE_ADDRESS, FakePage::clean().link("Saiba mais", Some("")));

    let summary = runner(navigator, 4).run(&registry()).await;

    assert!(!summary.success());
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.passed, 3);

    let failed: Vec<_> = summary.outcomes.iter().filter(|o| !o.passed()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].target.label, "Certificação");
    assert_eq!(failed[0].category, AuditCategory::Functional);
}

#[tokio::test]
async fn navigation_failure_is_isolated_and_non_fatal() {
    // No page registered for the certification address
    let navigator = FakeNavigator::new().page(SITE_ADDRESS, FakePage::clean().violations(2));
    let released = navigator.released.clone();

    let summary = runner(navigator, 4).run(&registry()).await;

    assert!(summary.success());
    assert_eq!(summary.outcomes.len(), 4);

    for outcome in summary.outcomes.iter().filter(|o| o.target.label == "Certificação") {
        let nav = outcome.report.findings_for("navigation");
        assert_eq!(nav.len(), 1);
        assert_eq!(outcome.report.findings.len(), 1);
    }

    let site_quality = summary
        .outcomes
        .iter()
        .find(|o| o.target.label == "Site" && o.category == AuditCategory::Quality)
        .unwrap();
    assert_eq!(site_quality.report.findings_for("accessibility-scan")[0].count, Some(2));
    assert_eq!(released.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn sequential_and_concurrent_runs_agree() {
    let make = || {
        FakeNavigator::new()
            .page(CERT_ADDRESS, FakePage::clean().image(None).link("Saiba mais", None))
            .page(SITE_ADDRESS, FakePage::new().title("Site").body("Lorem Ipsum"))
    };

    let sequential = runner(make(), 1).run(&registry()).await;
    let concurrent = runner(make(), 8).run(&registry()).await;

    assert_eq!(labels(&sequential), labels(&concurrent));
    assert_eq!(sequential.failed, 1);
    assert_eq!(concurrent.failed, 1);
    for (a, b) in sequential.outcomes.iter().zip(&concurrent.outcomes) {
        assert_eq!(a.report, b.report);
        assert_eq!(a.failure, b.failure);
    }
}

#[tokio::test]
async fn single_category_run() {
    let navigator = FakeNavigator::new()
        .page(CERT_ADDRESS, FakePage::clean())
        .page(SITE_ADDRESS, FakePage::clean());
    let engine = AuditEngine::from_config(&AuditConfig::default()).unwrap();
    let runner = AuditRunner::new(
        navigator,
        engine,
        RunnerConfig {
            categories: vec![AuditCategory::Functional],
            ..Default::default()
        },
    );

    let summary = runner.run(&registry()).await;
    assert_eq!(summary.total, 2);
    assert!(summary
        .outcomes
        .iter()
        .all(|o| o.category == AuditCategory::Functional));
}

#[tokio::test]
async fn results_are_written_as_json() {
    let navigator = FakeNavigator::new()
        .page(CERT_ADDRESS, FakePage::clean())
        .page(SITE_ADDRESS, FakePage::clean().violations(3));
    let summary = runner(navigator, 2).run(&registry()).await;

    let dir = tempfile::tempdir().unwrap();
    let path = write_results(&dir.path().join("out"), &summary).unwrap();
    assert!(path.ends_with("audit-results.json"));

    let written: AuditSummary =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written.total, 4);
    assert_eq!(written.finding_count(), 1);
    assert_eq!(written.outcomes[2].report.findings[0].count, Some(3));
}

#[test_case(1 ; "sequential")]
#[test_case(4 ; "concurrent")]
#[tokio::test]
async fn crashed_unit_is_aborted_not_failed(concurrency: usize) {
    let navigator = FakeNavigator::new()
        .page(SITE_ADDRESS, FakePage::clean())
        .crash_on(CERT_ADDRESS);

    let summary = runner(navigator, concurrency).run(&registry()).await;

    assert!(summary.success());
    assert_eq!(summary.total, 4);
    assert_eq!(summary.aborted, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.passed, 2);
    assert!(summary.outcomes.iter().all(|o| o.target.label == "Site"));
}
