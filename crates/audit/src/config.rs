//! Declarative YAML audit configuration

use std::collections::HashSet;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AuditError, AuditResult};
use crate::model::Target;

/// Which pages to audit and how the rules are tuned
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Pages to audit, in order
    #[serde(default = "default_targets")]
    pub targets: Vec<Target>,

    /// Tag filters handed to the accessibility scanner
    #[serde(default = "default_accessibility_tags")]
    pub accessibility_tags: Vec<String>,

    /// Placeholder strings that should never reach production copy
    #[serde(default = "default_placeholder_markers")]
    pub placeholder_markers: Vec<String>,

    /// Target-specific link assertions
    #[serde(default = "default_link_checks")]
    pub link_checks: Vec<LinkCheck>,
}

/// A link that must carry a destination on matching targets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkCheck {
    /// Regex matched against the target address
    pub address_pattern: String,

    /// Exact visible text of the link
    pub link_text: String,

    /// Attribute holding the destination
    #[serde(default = "default_link_attribute")]
    pub attribute: String,
}

fn default_targets() -> Vec<Target> {
    vec![
        Target::new("Certificação", "https://qualidade.apprbs.com.br/certificacao"),
        Target::new("Site", "https://qualidade.apprbs.com.br/site"),
    ]
}

fn default_accessibility_tags() -> Vec<String> {
    vec!["wcag2a".to_string(), "wcag2aa".to_string()]
}

fn default_placeholder_markers() -> Vec<String> {
    vec!["lorem ipsum".to_string()]
}

fn default_link_checks() -> Vec<LinkCheck> {
    vec![LinkCheck {
        address_pattern: "certificacao".to_string(),
        link_text: "Saiba mais".to_string(),
        attribute: default_link_attribute(),
    }]
}

fn default_link_attribute() -> String {
    "href".to_string()
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            targets: default_targets(),
            accessibility_tags: default_accessibility_tags(),
            placeholder_markers: default_placeholder_markers(),
            link_checks: default_link_checks(),
        }
    }
}

impl AuditConfig {
    /// Parse and validate a config from a YAML string
    pub fn from_yaml(yaml: &str) -> AuditResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a config from a YAML file
    pub fn from_file(path: &Path) -> AuditResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn validate(&self) -> AuditResult<()> {
        if self.targets.is_empty() {
            return Err(AuditError::Config("no targets configured".to_string()));
        }

        let mut labels = HashSet::new();
        for target in &self.targets {
            if target.label.trim().is_empty() {
                return Err(AuditError::Config(format!(
                    "target {} has an empty label",
                    target.address
                )));
            }
            if target.address.trim().is_empty() {
                return Err(AuditError::Config(format!(
                    "target '{}' has an empty address",
                    target.label
                )));
            }
            if !labels.insert(target.label.as_str()) {
                return Err(AuditError::Config(format!(
                    "duplicate target label '{}'",
                    target.label
                )));
            }
        }

        if self.placeholder_markers.iter().any(|m| m.trim().is_empty()) {
            return Err(AuditError::Config("empty placeholder marker".to_string()));
        }

        for check in &self.link_checks {
            Regex::new(&check.address_pattern)?;
            if check.link_text.is_empty() {
                return Err(AuditError::Config(format!(
                    "link check for '{}' has empty link text",
                    check.address_pattern
                )));
            }
        }

        Ok(())
    }

    /// Targets whose label is in `labels`, or all of them when `labels` is empty
    pub fn select_targets(&self, labels: &[String]) -> Vec<Target> {
        self.targets
            .iter()
            .filter(|t| labels.is_empty() || labels.iter().any(|l| l == &t.label))
            .cloned()
            .collect()
    }
}
