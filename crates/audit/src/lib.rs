//! pagecheck page audit
//!
//! Loads a fixed list of pages through Playwright and runs a set of
//! independent quality rules against each one. Findings are advisory and only
//! logged; the one hard assertion is the target-specific link check.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     AuditRunner                             │
//! │    for each (Target × AuditCategory), concurrently:         │
//! │      Navigator::open(address) -> Page + AccessibilityScanner │
//! │      AuditEngine::audit(...)  -> PageAudit                  │
//! │      emit_report(report)                                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  AuditEngine                                                │
//! │    quality:    title, h1, meta description, img alt, axe    │
//! │    functional: placeholder text, link integrity (hard)      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PlaywrightNavigator                                        │
//! │    node driver.js  <- JSON lines ->  PlaywrightSession      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod page;
pub mod playwright;
pub mod rules;
pub mod runner;

pub use config::{AuditConfig, LinkCheck};
pub use engine::{AuditEngine, PageAudit};
pub use error::{AuditError, AuditResult};
pub use model::{AuditCategory, Finding, Report, Severity, Target, Violation};
pub use page::{AccessibilityScanner, Navigator, Page};
pub use runner::{AuditOutcome, AuditRunner, AuditSummary, RunnerConfig};
