//! Target iteration: opens every page, runs the engine and collects outcomes

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::engine::{AuditEngine, PageAudit};
use crate::error::AuditResult;
use crate::model::{AuditCategory, Report, Severity, Target};
use crate::page::Navigator;

/// Result of one (target, category) unit of work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditOutcome {
    pub target: Target,
    pub category: AuditCategory,
    pub report: Report,

    /// Hard failure message, if a link assertion failed
    pub failure: Option<String>,
    pub duration_ms: u64,
}

impl AuditOutcome {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

/// Result of a whole audit run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSummary {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,

    /// Units whose task died before producing an outcome
    #[serde(default)]
    pub aborted: usize,
    pub duration_ms: u64,
    pub outcomes: Vec<AuditOutcome>,
}

impl AuditSummary {
    /// True unless a link assertion failed; aborted units do not count
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    pub fn finding_count(&self) -> usize {
        self.outcomes.iter().map(|o| o.report.findings.len()).sum()
    }
}

/// Configuration for the audit runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Categories to run for every target
    pub categories: Vec<AuditCategory>,

    /// Maximum units of work in flight (1 = sequential)
    pub concurrency: usize,

    /// Output directory for results
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            categories: AuditCategory::ALL.to_vec(),
            concurrency: 4,
            output_dir: PathBuf::from("test-results"),
        }
    }
}

pub struct AuditRunner<N: Navigator> {
    navigator: Arc<N>,
    engine: Arc<AuditEngine>,
    config: RunnerConfig,
}

impl<N: Navigator> AuditRunner<N> {
    pub fn new(navigator: N, engine: AuditEngine, config: RunnerConfig) -> Self {
        Self {
            navigator: Arc::new(navigator),
            engine: Arc::new(engine),
            config,
        }
    }

    /// Audit every target in every configured category
    ///
    /// Outcomes come back in registry order regardless of completion order.
    pub async fn run(&self, targets: &[Target]) -> AuditSummary {
        let started_at = Utc::now();
        let start = Instant::now();

        let units: Vec<(Target, AuditCategory)> = targets
            .iter()
            .flat_map(|t| self.config.categories.iter().map(move |c| (t.clone(), *c)))
            .collect();

        info!("Auditing {} page(s), {} unit(s)...", targets.len(), units.len());

        let mut slots: Vec<Option<AuditOutcome>> = vec![None; units.len()];
        let mut aborted = 0;

        // One permit means one page at a time
        let permits = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (i, (target, category)) in units.iter().cloned().enumerate() {
            let navigator = Arc::clone(&self.navigator);
            let engine = Arc::clone(&self.engine);
            let permits = Arc::clone(&permits);

            tasks.spawn(async move {
                // The semaphore is never closed
                let _permit = permits.acquire_owned().await.ok();
                (i, audit_unit(navigator.as_ref(), &engine, &target, category).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((i, outcome)) => slots[i] = Some(outcome),
                Err(e) => {
                    error!("Audit task aborted: {}", e);
                    aborted += 1;
                }
            }
        }

        let outcomes: Vec<AuditOutcome> = slots.into_iter().flatten().collect();
        let passed = outcomes.iter().filter(|o| o.passed()).count();
        let failed = outcomes.len() - passed;
        let duration_ms = start.elapsed().as_millis() as u64;

        let summary = AuditSummary {
            started_at,
            total: units.len(),
            passed,
            failed,
            aborted,
            duration_ms,
            outcomes,
        };

        info!("");
        info!(
            "Audit Results: {} passed, {} failed, {} aborted, {} finding(s) ({} ms)",
            summary.passed,
            summary.failed,
            summary.aborted,
            summary.finding_count(),
            summary.duration_ms
        );

        summary
    }

    /// Write the run summary to JSON
    pub fn write_results(&self, summary: &AuditSummary) -> AuditResult<PathBuf> {
        write_results(&self.config.output_dir, summary)
    }
}

/// Audit one page for one category; never fails
pub async fn audit_unit<N: Navigator>(
    navigator: &N,
    engine: &AuditEngine,
    target: &Target,
    category: AuditCategory,
) -> AuditOutcome {
    let start = Instant::now();
    debug!("Opening {} for {} audit", target.address, category);

    let audit = match navigator.open(&target.address).await {
        Ok(page) => {
            let audit = engine.audit(target, category, &page, &page).await;
            navigator.release(page).await;
            audit
        }
        Err(e) => PageAudit::navigation_failed(target, category, &e),
    };

    emit_report(&audit.report);

    let failure = audit.failure.map(|e| e.to_string());
    let duration_ms = start.elapsed().as_millis() as u64;

    match &failure {
        None => info!("✓ {} audit - {} ({} ms)", category, target.label, duration_ms),
        Some(reason) => error!("✗ {} audit - {} - {}", category, target.label, reason),
    }

    AuditOutcome {
        target: target.clone(),
        category,
        report: audit.report,
        failure,
        duration_ms,
    }
}

/// Log every finding of a report
pub fn emit_report(report: &Report) {
    for finding in &report.findings {
        match finding.severity {
            Severity::Warning => warn!(
                "Warning: {} [{}] {}",
                report.target.label, finding.rule_id, finding.message
            ),
            Severity::Info => info!(
                "Note: {} [{}] {}",
                report.target.label, finding.rule_id, finding.message
            ),
        }
    }
}

/// Write a run summary as pretty JSON to `<output_dir>/audit-results.json`
pub fn write_results(output_dir: &Path, summary: &AuditSummary) -> AuditResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let path = output_dir.join("audit-results.json");
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}
