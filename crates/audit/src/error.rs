//! Error types for page audits

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Navigation to {address} failed: {reason}")]
    Navigation { address: String, reason: String },

    #[error("Query failed: {query} - {reason}")]
    Query { query: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

pub type AuditResult<T> = Result<T, AuditError>;
