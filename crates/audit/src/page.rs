//! Collaborator seams: navigation, DOM queries and accessibility scanning

use async_trait::async_trait;

use crate::error::AuditResult;
use crate::model::Violation;

/// DOM queries against a loaded page
///
/// Selectors use Playwright selector syntax. An absent attribute is
/// `Ok(None)`; `Err` is reserved for failures of the browser itself.
#[async_trait]
pub trait Page: Send + Sync {
    /// Document title
    async fn title(&self) -> AuditResult<String>;

    /// Number of elements matching `selector`
    async fn count(&self, selector: &str) -> AuditResult<usize>;

    /// Attribute `name` of the `index`-th element matching `selector`
    async fn attribute(&self, selector: &str, index: usize, name: &str) -> AuditResult<Option<String>>;

    /// Rendered text of the first element matching `selector`
    async fn inner_text(&self, selector: &str) -> AuditResult<String>;
}

/// Automated accessibility scan of a loaded page
#[async_trait]
pub trait AccessibilityScanner: Send + Sync {
    /// Run the scan restricted to the given rule tags
    async fn analyze(&self, tags: &[String]) -> AuditResult<Vec<Violation>>;
}

/// Loads pages for auditing
#[async_trait]
pub trait Navigator: Send + Sync + 'static {
    type Page: Page + AccessibilityScanner + 'static;

    /// Load `address` and return a handle to the settled page
    async fn open(&self, address: &str) -> AuditResult<Self::Page>;

    /// Release a page handle once its audit is done
    async fn release(&self, _page: Self::Page) {}
}
