//! Scanner adapter over an accessibility rule engine
//!
//! The engine itself is external (axe-core in a browser page, see [`axe`]).
//! This module owns the boundary: it asks an engine for its raw payload and
//! normalizes that payload into a [`ScanResult`].
//!
//! Normalization never fails on malformed entries. Missing or unknown impact
//! values become [`Impact::Minor`], missing text becomes empty, and every such
//! substitution is logged with `warn!`.
//!
//! # Example
//!
//! ```no_run
//! use a11y_audit::scanner::{axe::AxeEngine, Scanner};
//! # use chromiumoxide::Page;
//!
//! # async fn example(page: &Page) -> a11y_audit::error::Result<()> {
//! let scanner = Scanner::new(AxeEngine::new()).with_disabled_rules(["page-has-heading-one"]);
//! let tags = vec!["wcag2a".to_string(), "wcag2aa".to_string()];
//! let result = scanner.scan(page, "login-page", &tags).await?;
//! println!("{} violations", result.violations.len());
//! # Ok(())
//! # }
//! ```

pub mod axe;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, instrument, warn};

use crate::error::{AuditError, Result};
use crate::model::{CheckOutcome, Impact, NodeRef, ScanResult, Violation};

/// Snippets longer than this are cut and suffixed with `...`
pub const SNIPPET_LIMIT: usize = 100;

/// What to ask the rule engine for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Guideline tags restricting which rules run
    pub tags: Vec<String>,
    /// Rule ids switched off for this scan
    pub disabled_rules: Vec<String>,
}

impl ScanOptions {
    /// Options object understood by `axe.run`
    pub fn to_engine_options(&self) -> serde_json::Value {
        let rules: serde_json::Map<String, serde_json::Value> = self
            .disabled_rules
            .iter()
            .map(|id| (id.clone(), serde_json::json!({ "enabled": false })))
            .collect();

        let mut options = serde_json::json!({
            "runOnly": { "type": "tag", "values": self.tags },
        });
        if !rules.is_empty() {
            options["rules"] = serde_json::Value::Object(rules);
        }
        options
    }
}

/// Raw engine output, shaped like axe-core results
///
/// Every field is optional so that partial payloads still deserialize.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawScan {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub violations: Vec<RawRule>,
    #[serde(default)]
    pub passes: Vec<RawRule>,
    #[serde(default)]
    pub incomplete: Vec<RawRule>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRule {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub impact: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub help: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub nodes: Vec<RawNode>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawNode {
    /// Selector path; shadow-DOM targets arrive as nested arrays
    #[serde(default)]
    pub target: Vec<serde_json::Value>,
    #[serde(default)]
    pub html: Option<String>,
}

impl RawScan {
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| AuditError::InvalidPayload(e.to_string()))
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AuditError::InvalidPayload(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
            .map_err(|e| AuditError::InvalidPayload(format!("{}: {}", path.display(), e)))
    }

    /// Convert into the crate's data model
    ///
    /// `fallback_url` and `fallback_time` are used when the payload lacks a
    /// url or a parseable RFC 3339 timestamp.
    pub fn normalize(
        self,
        page_label: &str,
        fallback_url: &str,
        fallback_time: DateTime<Utc>,
    ) -> ScanResult {
        let timestamp = self
            .timestamp
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc))
            .unwrap_or(fallback_time);

        let url = self
            .url
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| fallback_url.to_string());

        let violations = normalize_violations(page_label, self.violations);
        let violated: HashSet<&str> = violations.iter().map(|v| v.rule_id.as_str()).collect();

        let passes = normalize_outcomes(page_label, "pass", self.passes, &violated);
        let mut settled = violated.clone();
        settled.extend(passes.iter().map(|p| p.rule_id.as_str()));
        let incomplete = normalize_outcomes(page_label, "incomplete", self.incomplete, &settled);

        ScanResult {
            page_label: page_label.to_string(),
            url,
            timestamp,
            violations,
            passes,
            incomplete,
        }
    }
}

fn normalize_violations(page_label: &str, raw: Vec<RawRule>) -> Vec<Violation> {
    let mut out: Vec<Violation> = Vec::with_capacity(raw.len());
    let mut by_id: BTreeMap<String, usize> = BTreeMap::new();

    for rule in raw {
        let Some(rule_id) = rule.id.filter(|id| !id.trim().is_empty()) else {
            warn!(page = page_label, "Dropping violation without a rule id");
            continue;
        };

        let impact = normalize_impact(page_label, &rule_id, rule.impact.as_deref());
        let nodes: Vec<NodeRef> = rule.nodes.into_iter().map(normalize_node).collect();

        // A rule id appears once per scan; fold repeats into the first entry.
        if let Some(&index) = by_id.get(&rule_id) {
            warn!(page = page_label, rule = %rule_id, "Merging duplicate violation entry");
            let existing = &mut out[index];
            existing.affected_nodes.extend(nodes);
            existing.impact = existing.impact.max(impact);
            existing.tags.extend(rule.tags);
            continue;
        }

        if rule.description.is_none() {
            warn!(page = page_label, rule = %rule_id, "Violation has no description");
        }

        by_id.insert(rule_id.clone(), out.len());
        out.push(Violation {
            rule_id,
            impact,
            description: rule.description.unwrap_or_default(),
            help_text: rule.help.unwrap_or_default(),
            tags: rule.tags.into_iter().collect(),
            affected_nodes: nodes,
        });
    }

    out
}

fn normalize_outcomes(
    page_label: &str,
    kind: &str,
    raw: Vec<RawRule>,
    exclude: &HashSet<&str>,
) -> Vec<CheckOutcome> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(raw.len());

    for rule in raw {
        let Some(rule_id) = rule.id.filter(|id| !id.trim().is_empty()) else {
            warn!(page = page_label, kind, "Dropping check without a rule id");
            continue;
        };
        if exclude.contains(rule_id.as_str()) {
            warn!(
                page = page_label,
                rule = %rule_id,
                kind,
                "Rule already reported with a stronger outcome, ignoring"
            );
            continue;
        }
        if !seen.insert(rule_id.clone()) {
            continue;
        }
        out.push(CheckOutcome {
            rule_id,
            description: rule.description.unwrap_or_default(),
        });
    }

    out
}

/// Map an engine impact onto the four tiers, failing closed to `Minor`
pub fn normalize_impact(page_label: &str, rule_id: &str, raw: Option<&str>) -> Impact {
    match raw {
        Some(value) => Impact::parse(value).unwrap_or_else(|| {
            warn!(
                page = page_label,
                rule = rule_id,
                impact = value,
                "Unrecognized impact, treating as minor"
            );
            Impact::Minor
        }),
        None => {
            warn!(page = page_label, rule = rule_id, "Missing impact, treating as minor");
            Impact::Minor
        }
    }
}

fn normalize_node(node: RawNode) -> NodeRef {
    let selector = node.target.first().map(target_to_selector).unwrap_or_default();
    NodeRef {
        selector,
        html_snippet: truncate_snippet(node.html.as_deref().unwrap_or_default()),
    }
}

fn target_to_selector(target: &serde_json::Value) -> String {
    match target {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(parts) => parts
            .iter()
            .filter_map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(" >>> "),
        other => other.to_string(),
    }
}

/// Cut a snippet to [`SNIPPET_LIMIT`] characters
pub fn truncate_snippet(html: &str) -> String {
    let html = html.trim();
    match html.char_indices().nth(SNIPPET_LIMIT) {
        Some((cut, _)) => format!("{}...", &html[..cut]),
        None => html.to_string(),
    }
}

/// An accessibility rule engine that can evaluate a page
#[async_trait]
pub trait ScanEngine: Send + Sync {
    /// Handle to the live page state the engine evaluates
    type Page: Send + Sync + ?Sized;

    /// Run the engine once
    ///
    /// Fails with [`AuditError::ScanUnavailable`] when the page cannot be
    /// evaluated (mid-navigation, detached frame, engine missing).
    async fn analyze(&self, page: &Self::Page, options: &ScanOptions) -> Result<RawScan>;
}

/// Runs an engine and normalizes its output
///
/// The scanner never retries and never touches the filesystem.
pub struct Scanner<E> {
    engine: E,
    disabled_rules: Vec<String>,
}

impl<E: ScanEngine> Scanner<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            disabled_rules: Vec::new(),
        }
    }

    pub fn with_disabled_rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled_rules = rules.into_iter().map(Into::into).collect();
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Scan the current page state, restricted to `tags`
    #[instrument(skip(self, page, tags), fields(page = %page_label))]
    pub async fn scan(
        &self,
        page: &E::Page,
        page_label: &str,
        tags: &[String],
    ) -> Result<ScanResult> {
        let options = ScanOptions {
            tags: tags.to_vec(),
            disabled_rules: self.disabled_rules.clone(),
        };

        let started = Utc::now();
        let raw = self.engine.analyze(page, &options).await?;
        let result = raw.normalize(page_label, "", started);

        debug!(
            "Scan of {} found {} violations, {} passes, {} incomplete",
            page_label,
            result.violations.len(),
            result.passes.len(),
            result.incomplete.len()
        );
        Ok(result)
    }
}
