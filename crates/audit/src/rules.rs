//! Page quality rules
//!
//! Every rule is independent and never fails: a broken query is logged and
//! turned into a warning (or skipped) at the rule boundary.

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::config::LinkCheck;
use crate::error::{AuditError, AuditResult};
use crate::model::{AuditCategory, Finding, Target};
use crate::page::{AccessibilityScanner, Page};

pub const HEADING_SELECTOR: &str = "h1";
pub const META_DESCRIPTION_SELECTOR: &str = r#"meta[name="description"]"#;
pub const IMAGE_SELECTOR: &str = "img";
pub const BODY_SELECTOR: &str = "body";

/// Everything a rule may look at
pub struct PageContext<'a> {
    pub target: &'a Target,
    pub page: &'a dyn Page,
    pub scanner: &'a dyn AccessibilityScanner,
}

#[async_trait]
pub trait Rule: Send + Sync {
    /// Stable identifier carried by every finding of this rule
    fn id(&self) -> &'static str;

    fn category(&self) -> AuditCategory;

    async fn check(&self, ctx: &PageContext<'_>) -> Vec<Finding>;
}

fn lookup_failed(rule_id: &str, err: &AuditError) -> Finding {
    debug!("{} lookup failed: {}", rule_id, err);
    Finding::warning(rule_id, format!("could not be checked: {}", err))
}

pub struct TitlePresence;

#[async_trait]
impl Rule for TitlePresence {
    fn id(&self) -> &'static str {
        "title-presence"
    }

    fn category(&self) -> AuditCategory {
        AuditCategory::Quality
    }

    async fn check(&self, ctx: &PageContext<'_>) -> Vec<Finding> {
        match ctx.page.title().await {
            Ok(title) if !title.is_empty() => vec![],
            Ok(_) => vec![Finding::warning(self.id(), "page title is empty")],
            Err(e) => vec![lookup_failed(self.id(), &e)],
        }
    }
}

pub struct HeadingPresence;

#[async_trait]
impl Rule for HeadingPresence {
    fn id(&self) -> &'static str {
        "heading-presence"
    }

    fn category(&self) -> AuditCategory {
        AuditCategory::Quality
    }

    async fn check(&self, ctx: &PageContext<'_>) -> Vec<Finding> {
        match ctx.page.count(HEADING_SELECTOR).await {
            Ok(0) => vec![Finding::warning(self.id(), "page is missing an H1 tag")],
            Ok(_) => vec![],
            Err(e) => vec![lookup_failed(self.id(), &e)],
        }
    }
}

pub struct MetaDescriptionPresence;

impl MetaDescriptionPresence {
    async fn description(page: &dyn Page) -> AuditResult<Option<String>> {
        // A missing tag is a normal outcome, not a lookup error
        if page.count(META_DESCRIPTION_SELECTOR).await? == 0 {
            return Ok(None);
        }
        page.attribute(META_DESCRIPTION_SELECTOR, 0, "content").await
    }
}

#[async_trait]
impl Rule for MetaDescriptionPresence {
    fn id(&self) -> &'static str {
        "meta-description"
    }

    fn category(&self) -> AuditCategory {
        AuditCategory::Quality
    }

    async fn check(&self, ctx: &PageContext<'_>) -> Vec<Finding> {
        match Self::description(ctx.page).await {
            Ok(Some(content)) if !content.is_empty() => vec![],
            Ok(_) => vec![Finding::warning(self.id(), "page is missing a meta description")],
            Err(e) => vec![lookup_failed(self.id(), &e)],
        }
    }
}

pub struct ImageAltText;

#[async_trait]
impl Rule for ImageAltText {
    fn id(&self) -> &'static str {
        "image-alt-text"
    }

    fn category(&self) -> AuditCategory {
        AuditCategory::Quality
    }

    async fn check(&self, ctx: &PageContext<'_>) -> Vec<Finding> {
        let count = match ctx.page.count(IMAGE_SELECTOR).await {
            Ok(count) => count,
            Err(e) => return vec![lookup_failed(self.id(), &e)],
        };

        let mut findings = Vec::new();
        for index in 0..count {
            match ctx.page.attribute(IMAGE_SELECTOR, index, "alt").await {
                Ok(Some(alt)) if !alt.is_empty() => {}
                Ok(_) => findings.push(
                    Finding::warning(self.id(), format!("image {} is missing alt text", index))
                        .with_index(index),
                ),
                Err(e) => findings.push(lookup_failed(self.id(), &e).with_index(index)),
            }
        }
        findings
    }
}

pub struct AccessibilityScan {
    tags: Vec<String>,
}

impl AccessibilityScan {
    pub fn new(tags: Vec<String>) -> Self {
        Self { tags }
    }
}

#[async_trait]
impl Rule for AccessibilityScan {
    fn id(&self) -> &'static str {
        "accessibility-scan"
    }

    fn category(&self) -> AuditCategory {
        AuditCategory::Quality
    }

    async fn check(&self, ctx: &PageContext<'_>) -> Vec<Finding> {
        match ctx.scanner.analyze(&self.tags).await {
            Ok(violations) if violations.is_empty() => vec![],
            Ok(violations) => {
                for v in &violations {
                    debug!(
                        "{}: {} ({} nodes, impact {})",
                        ctx.target.label,
                        v.id,
                        v.nodes,
                        v.impact.as_deref().unwrap_or("unknown")
                    );
                }
                vec![Finding::warning(
                    self.id(),
                    format!("accessibility violations found: {}", violations.len()),
                )
                .with_count(violations.len())]
            }
            Err(e) => vec![lookup_failed(self.id(), &e)],
        }
    }
}

pub struct PlaceholderText {
    markers: Vec<String>,
}

impl PlaceholderText {
    pub fn new(markers: Vec<String>) -> Self {
        Self {
            markers: markers.iter().map(|m| m.to_lowercase()).collect(),
        }
    }

    /// First configured marker contained in `text`, ignoring case
    pub fn find_marker(&self, text: &str) -> Option<&str> {
        let text = text.to_lowercase();
        self.markers
            .iter()
            .find(|m| text.contains(m.as_str()))
            .map(String::as_str)
    }
}

#[async_trait]
impl Rule for PlaceholderText {
    fn id(&self) -> &'static str {
        "placeholder-text"
    }

    fn category(&self) -> AuditCategory {
        AuditCategory::Functional
    }

    async fn check(&self, ctx: &PageContext<'_>) -> Vec<Finding> {
        let text = match ctx.page.inner_text(BODY_SELECTOR).await {
            Ok(text) => text,
            Err(e) => {
                debug!("{}: body text unavailable: {}", ctx.target.label, e);
                return vec![];
            }
        };

        match self.find_marker(&text) {
            Some(marker) => vec![Finding::info(
                self.id(),
                format!("page contains placeholder text ({})", marker),
            )],
            None => vec![],
        }
    }
}

/// Outcome of a target-specific link assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkVerdict {
    /// Target address does not match the pattern
    NotApplicable,
    /// No link with the expected text on the page
    Absent,
    /// Link present with a destination
    Valid,
    /// Link present without a destination
    Broken(String),
    /// The page could not be queried
    Unknown(String),
}

/// Asserts that a named link carries a destination on matching targets
pub struct LinkIntegrity {
    pattern: Regex,
    link_text: String,
    attribute: String,
    selector: String,
}

impl LinkIntegrity {
    pub const RULE_ID: &'static str = "link-integrity";

    pub fn new(check: &LinkCheck) -> AuditResult<Self> {
        let quoted = serde_json::to_string(&check.link_text)?;
        Ok(Self {
            pattern: Regex::new(&check.address_pattern)?,
            link_text: check.link_text.clone(),
            attribute: check.attribute.clone(),
            selector: format!("a:text-is({})", quoted),
        })
    }

    /// Playwright selector matching the link by its exact visible text
    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn link_text(&self) -> &str {
        &self.link_text
    }

    pub fn applies_to(&self, target: &Target) -> bool {
        self.pattern.is_match(&target.address)
    }

    pub async fn verify(&self, target: &Target, page: &dyn Page) -> LinkVerdict {
        if !self.applies_to(target) {
            return LinkVerdict::NotApplicable;
        }

        match page.count(&self.selector).await {
            Ok(0) => return LinkVerdict::Absent,
            Ok(_) => {}
            Err(e) => return LinkVerdict::Unknown(e.to_string()),
        }

        match page.attribute(&self.selector, 0, &self.attribute).await {
            Ok(Some(dest)) if !dest.is_empty() => LinkVerdict::Valid,
            Ok(Some(_)) => LinkVerdict::Broken(format!(
                "link '{}' on {} has an empty {}",
                self.link_text, target.label, self.attribute
            )),
            Ok(None) => LinkVerdict::Broken(format!(
                "link '{}' on {} has no {}",
                self.link_text, target.label, self.attribute
            )),
            Err(e) => LinkVerdict::Unknown(e.to_string()),
        }
    }
}
