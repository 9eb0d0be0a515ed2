//! In-memory page doubles shared by the integration tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use pagecheck_audit::rules::{BODY_SELECTOR, HEADING_SELECTOR, IMAGE_SELECTOR, META_DESCRIPTION_SELECTOR};
use pagecheck_audit::{AccessibilityScanner, AuditError, AuditResult, Navigator, Page, Violation};

pub const CERT_ADDRESS: &str = "https://qualidade.apprbs.com.br/certificacao";
pub const SITE_ADDRESS: &str = "https://qualidade.apprbs.com.br/site";

pub fn link_selector(text: &str) -> String {
    format!("a:text-is({})", serde_json::to_string(text).unwrap())
}

fn query_error(query: &str, reason: &str) -> AuditError {
    AuditError::Query {
        query: query.to_string(),
        reason: reason.to_string(),
    }
}

/// A page described by selector -> element attributes
#[derive(Clone, Default)]
pub struct FakePage {
    title: Option<String>,
    elements: HashMap<String, Vec<HashMap<String, String>>>,
    texts: HashMap<String, String>,
    violations: Vec<Violation>,
    failing: HashSet<String>,
    pub scanned_tags: Arc<Mutex<Vec<Vec<String>>>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A page every quality and functional rule is happy with
    pub fn clean() -> Self {
        Self::new()
            .title("Qualidade")
            .heading()
            .meta_description("Página de qualidade")
            .body("Conteúdo real da página")
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn element(mut self, selector: &str, attrs: &[(&str, &str)]) -> Self {
        let attrs = attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.elements.entry(selector.to_string()).or_default().push(attrs);
        self
    }

    pub fn heading(self) -> Self {
        self.element(HEADING_SELECTOR, &[])
    }

    pub fn meta_description(self, content: &str) -> Self {
        self.element(META_DESCRIPTION_SELECTOR, &[("name", "description"), ("content", content)])
    }

    pub fn image(self, alt: Option<&str>) -> Self {
        match alt {
            Some(alt) => self.element(IMAGE_SELECTOR, &[("src", "/img.png"), ("alt", alt)]),
            None => self.element(IMAGE_SELECTOR, &[("src", "/img.png")]),
        }
    }

    pub fn link(self, text: &str, href: Option<&str>) -> Self {
        let selector = link_selector(text);
        match href {
            Some(href) => self.element(&selector, &[("href", href)]),
            None => self.element(&selector, &[]),
        }
    }

    pub fn body(mut self, text: &str) -> Self {
        self.texts.insert(BODY_SELECTOR.to_string(), text.to_string());
        self
    }

    pub fn violations(mut self, count: usize) -> Self {
        self.violations = (0..count)
            .map(|i| Violation {
                id: format!("rule-{}", i),
                impact: Some("serious".to_string()),
                description: String::new(),
                help_url: String::new(),
                nodes: 1,
            })
            .collect();
        self
    }

    /// Make every query for `key` (a selector, "title" or "axe") fail
    pub fn failing(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    fn check(&self, key: &str) -> AuditResult<()> {
        if self.failing.contains(key) {
            Err(query_error(key, "simulated browser failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Page for FakePage {
    async fn title(&self) -> AuditResult<String> {
        self.check("title")?;
        Ok(self.title.clone().unwrap_or_default())
    }

    async fn count(&self, selector: &str) -> AuditResult<usize> {
        self.check(selector)?;
        Ok(self.elements.get(selector).map_or(0, Vec::len))
    }

    async fn attribute(&self, selector: &str, index: usize, name: &str) -> AuditResult<Option<String>> {
        self.check(selector)?;
        let element = self
            .elements
            .get(selector)
            .and_then(|els| els.get(index))
            .ok_or_else(|| query_error(selector, "element not found"))?;
        Ok(element.get(name).cloned())
    }

    async fn inner_text(&self, selector: &str) -> AuditResult<String> {
        self.check(selector)?;
        self.texts
            .get(selector)
            .cloned()
            .ok_or_else(|| query_error(selector, "element not found"))
    }
}

#[async_trait]
impl AccessibilityScanner for FakePage {
    async fn analyze(&self, tags: &[String]) -> AuditResult<Vec<Violation>> {
        self.scanned_tags.lock().unwrap().push(tags.to_vec());
        self.check("axe")?;
        Ok(self.violations.clone())
    }
}

/// Serves fake pages by address; unknown addresses fail to load
#[derive(Default)]
pub struct FakeNavigator {
    pages: HashMap<String, FakePage>,
    crashing: HashSet<String>,
    pub opened: Arc<AtomicUsize>,
    pub released: Arc<AtomicUsize>,
}

impl FakeNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, address: &str, page: FakePage) -> Self {
        self.pages.insert(address.to_string(), page);
        self
    }

    /// Opening `address` panics instead of returning
    pub fn crash_on(mut self, address: &str) -> Self {
        self.crashing.insert(address.to_string());
        self
    }
}

#[async_trait]
impl Navigator for FakeNavigator {
    type Page = FakePage;

    async fn open(&self, address: &str) -> AuditResult<FakePage> {
        // Yield so concurrent units genuinely interleave
        tokio::task::yield_now().await;
        if self.crashing.contains(address) {
            panic!("browser crashed opening {}", address);
        }
        match self.pages.get(address) {
            Some(page) => {
                self.opened.fetch_add(1, Ordering::SeqCst);
                Ok(page.clone())
            }
            None => Err(AuditError::Navigation {
                address: address.to_string(),
                reason: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            }),
        }
    }

    async fn release(&self, _page: FakePage) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}
