//! Rule engine: runs the ordered rule set against one loaded page

use tracing::{debug, warn};

use crate::config::AuditConfig;
use crate::error::{AuditError, AuditResult};
use crate::model::{AuditCategory, Finding, Report, Target};
use crate::page::{AccessibilityScanner, Page};
use crate::rules::{
    AccessibilityScan, HeadingPresence, ImageAltText, LinkIntegrity, LinkVerdict,
    MetaDescriptionPresence, PageContext, PlaceholderText, Rule, TitlePresence,
};

/// Result of auditing one page for one category
#[derive(Debug)]
pub struct PageAudit {
    pub report: Report,

    /// Hard failure raised by a link assertion
    pub failure: Option<AuditError>,
}

impl PageAudit {
    /// Audit of a page that never loaded
    pub fn navigation_failed(target: &Target, category: AuditCategory, err: &AuditError) -> Self {
        Self {
            report: Report {
                target: target.clone(),
                category,
                findings: vec![Finding::warning(
                    "navigation",
                    format!("page could not be loaded: {}", err),
                )],
            },
            failure: None,
        }
    }
}

pub struct AuditEngine {
    rules: Vec<Box<dyn Rule>>,
    link_checks: Vec<LinkIntegrity>,
}

impl AuditEngine {
    pub fn new(rules: Vec<Box<dyn Rule>>, link_checks: Vec<LinkIntegrity>) -> Self {
        Self { rules, link_checks }
    }

    /// Build the standard rule set tuned by `config`
    pub fn from_config(config: &AuditConfig) -> AuditResult<Self> {
        let rules: Vec<Box<dyn Rule>> = vec![
            Box::new(TitlePresence),
            Box::new(HeadingPresence),
            Box::new(MetaDescriptionPresence),
            Box::new(ImageAltText),
            Box::new(AccessibilityScan::new(config.accessibility_tags.clone())),
            Box::new(PlaceholderText::new(config.placeholder_markers.clone())),
        ];

        let link_checks = config
            .link_checks
            .iter()
            .map(LinkIntegrity::new)
            .collect::<AuditResult<Vec<_>>>()?;

        Ok(Self::new(rules, link_checks))
    }

    /// Rule ids of a category in execution order
    pub fn rule_ids(&self, category: AuditCategory) -> Vec<&'static str> {
        self.rules
            .iter()
            .filter(|r| r.category() == category)
            .map(|r| r.id())
            .collect()
    }

    /// Run every rule of `category` in declaration order
    ///
    /// Link assertions belong to the functional category and are the only
    /// source of `PageAudit::failure`.
    pub async fn audit(
        &self,
        target: &Target,
        category: AuditCategory,
        page: &dyn Page,
        scanner: &dyn AccessibilityScanner,
    ) -> PageAudit {
        let ctx = PageContext { target, page, scanner };
        let mut findings = Vec::new();

        for rule in &self.rules {
            if rule.category() != category {
                continue;
            }
            let produced = rule.check(&ctx).await;
            debug!("{} [{}]: {} finding(s)", target.label, rule.id(), produced.len());
            findings.extend(produced);
        }

        let mut failure = None;
        if category == AuditCategory::Functional {
            for check in &self.link_checks {
                match check.verify(target, page).await {
                    LinkVerdict::NotApplicable => {}
                    LinkVerdict::Absent => {
                        debug!("{}: no '{}' link present", target.label, check.link_text());
                    }
                    LinkVerdict::Valid => {
                        debug!("{}: '{}' link ok", target.label, check.link_text());
                    }
                    LinkVerdict::Broken(reason) => {
                        if failure.is_none() {
                            failure = Some(AuditError::AssertionFailed(reason));
                        } else {
                            warn!("{}: additional link failure: {}", target.label, reason);
                        }
                    }
                    LinkVerdict::Unknown(reason) => {
                        findings.push(Finding::warning(
                            LinkIntegrity::RULE_ID,
                            format!("link '{}' could not be checked: {}", check.link_text(), reason),
                        ));
                    }
                }
            }
        }

        PageAudit {
            report: Report {
                target: target.clone(),
                category,
                findings,
            },
            failure,
        }
    }
}
