//! Normalized accessibility scan data
//!
//! These types are what the rest of the crate works with. Rule-engine
//! payloads are converted into them by [`crate::scanner`], after which a
//! [`ScanResult`] is never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Severity tier assigned to a violation
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    #[default]
    Minor,
    Moderate,
    Serious,
    Critical,
}

impl Impact {
    /// All tiers, most severe first
    pub const ALL: [Impact; 4] = [
        Impact::Critical,
        Impact::Serious,
        Impact::Moderate,
        Impact::Minor,
    ];

    /// Parse an engine impact string, ignoring case and surrounding whitespace.
    ///
    /// Returns `None` for anything outside the four known tiers.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "minor" => Some(Impact::Minor),
            "moderate" => Some(Impact::Moderate),
            "serious" => Some(Impact::Serious),
            "critical" => Some(Impact::Critical),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Impact::Minor => "minor",
            Impact::Moderate => "moderate",
            Impact::Serious => "serious",
            Impact::Critical => "critical",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Impact::Minor => "Minor",
            Impact::Moderate => "Moderate",
            Impact::Serious => "Serious",
            Impact::Critical => "Critical",
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An element affected by a violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRef {
    /// First target path reported for the node; empty when the engine gave none
    pub selector: String,
    /// Truncated outer HTML of the node
    pub html_snippet: String,
}

impl NodeRef {
    pub fn has_selector(&self) -> bool {
        !self.selector.trim().is_empty()
    }
}

/// A rule that failed on the scanned page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub impact: Impact,
    pub description: String,
    pub help_text: String,
    pub tags: BTreeSet<String>,
    pub affected_nodes: Vec<NodeRef>,
}

impl Violation {
    /// Guideline tags, e.g. `wcag2aa`, `wcag143`
    pub fn wcag_tags(&self) -> impl Iterator<Item = &str> {
        self.tags
            .iter()
            .map(String::as_str)
            .filter(|tag| tag.contains("wcag"))
    }
}

/// A pass or incomplete check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub rule_id: String,
    pub description: String,
}

/// The complete output of one audit against one page state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub page_label: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
    pub violations: Vec<Violation>,
    pub passes: Vec<CheckOutcome>,
    pub incomplete: Vec<CheckOutcome>,
}

impl ScanResult {
    /// Number of violated rules at the given impact
    pub fn count_impact(&self, impact: Impact) -> usize {
        self.violations.iter().filter(|v| v.impact == impact).count()
    }

    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Human-readable page name: `login-page` becomes `Login Page`
    pub fn description(&self) -> String {
        describe_label(&self.page_label)
    }
}

pub(crate) fn describe_label(label: &str) -> String {
    label
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// File-name-safe form of a page label: lower-cased, whitespace runs become hyphens
pub fn slugify(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// [`slugify`] restricted to `[a-z0-9_-]` for use in file names
///
/// Path separators and dots become hyphens and hyphen runs collapse, so the
/// result never names anything outside the directory it is joined onto.
pub fn file_slug(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in slugify(label).chars() {
        let c = if c.is_ascii_alphanumeric() || c == '_' {
            c
        } else {
            '-'
        };
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }
    out
}
