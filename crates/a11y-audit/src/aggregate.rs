//! Cross-page aggregation of scan results
//!
//! [`aggregate`] folds an ordered run of [`ScanResult`]s into an
//! [`AggregatedReport`]. Two views are kept side by side:
//!
//! - `instances`: every violation from every page, tagged with its page.
//!   Nothing is dropped here; impact counters are incremented once per entry.
//! - `rules`: one entry per rule id across the whole run, listing the pages it
//!   was seen on in visitation order.
//!
//! The counters therefore always satisfy
//! `impact_counts.total() == total_instances == instances.len()`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::model::{Impact, ScanResult, Violation};

/// Violation instance counts per impact tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactCounts {
    pub minor: usize,
    pub moderate: usize,
    pub serious: usize,
    pub critical: usize,
}

impl ImpactCounts {
    pub fn get(&self, impact: Impact) -> usize {
        match impact {
            Impact::Minor => self.minor,
            Impact::Moderate => self.moderate,
            Impact::Serious => self.serious,
            Impact::Critical => self.critical,
        }
    }

    pub fn increment(&mut self, impact: Impact) {
        match impact {
            Impact::Minor => self.minor += 1,
            Impact::Moderate => self.moderate += 1,
            Impact::Serious => self.serious += 1,
            Impact::Critical => self.critical += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.minor + self.moderate + self.serious + self.critical
    }
}

/// One rule in the deduplicated cross-page table
///
/// Fixed fields come from the first occurrence in visitation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    pub rule_id: String,
    pub impact: Impact,
    pub description: String,
    pub help_text: String,
    pub tags: BTreeSet<String>,
    /// Pages the rule failed on, first-seen order, no repeats
    pub pages: Vec<String>,
    /// Number of violation instances contributing to this entry
    pub instances: usize,
}

impl RuleEntry {
    fn from_violation(violation: &Violation) -> Self {
        Self {
            rule_id: violation.rule_id.clone(),
            impact: violation.impact,
            description: violation.description.clone(),
            help_text: violation.help_text.clone(),
            tags: violation.tags.clone(),
            pages: Vec::new(),
            instances: 0,
        }
    }

    fn add_page(&mut self, page_label: &str) {
        if !self.pages.iter().any(|p| p == page_label) {
            self.pages.push(page_label.to_string());
        }
    }
}

/// A violation together with the page it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationInstance {
    pub page_label: String,
    pub violation: Violation,
}

/// Per-page counts for the summary document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    pub page_label: String,
    pub url: String,
    pub violations: usize,
    pub passes: usize,
    pub incomplete: usize,
    pub impact_counts: ImpactCounts,
}

/// Derived cross-page view of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedReport {
    pub pages_scanned: usize,
    pub total_instances: usize,
    pub total_passes: usize,
    pub total_incomplete: usize,
    pub impact_counts: ImpactCounts,
    /// Deduplicated rule table keyed by rule id
    pub rules: BTreeMap<String, RuleEntry>,
    /// Every violation instance, in visitation order
    pub instances: Vec<ViolationInstance>,
    /// One entry per input result, in visitation order
    pub pages: Vec<PageSummary>,
}

impl AggregatedReport {
    /// Share of evaluated rules that passed, in `[0.0, 1.0]`
    ///
    /// Counted per page and per rule: passes / (passes + violated rules).
    /// A run with neither has nothing failing and yields `1.0`.
    pub fn pass_rate(&self) -> f64 {
        let evaluated = self.total_passes + self.pages.iter().map(|p| p.violations).sum::<usize>();
        if evaluated == 0 {
            1.0
        } else {
            self.total_passes as f64 / evaluated as f64
        }
    }

    pub fn unique_rules(&self) -> usize {
        self.rules.len()
    }

    pub fn is_clean(&self) -> bool {
        self.total_instances == 0
    }

    /// Rule entries ordered most severe first, then by instance count, then id
    pub fn rules_by_severity(&self) -> Vec<&RuleEntry> {
        let mut rules: Vec<&RuleEntry> = self.rules.values().collect();
        rules.sort_by(|a, b| {
            b.impact
                .cmp(&a.impact)
                .then(b.instances.cmp(&a.instances))
                .then(a.rule_id.cmp(&b.rule_id))
        });
        rules
    }
}

/// Fold scan results into an [`AggregatedReport`]
///
/// Order matters only for the first-seen ordering of each rule's page list.
/// An empty slice yields a zeroed report.
pub fn aggregate(results: &[ScanResult]) -> AggregatedReport {
    let mut report = AggregatedReport::default();

    for result in results {
        let mut page_counts = ImpactCounts::default();

        for violation in &result.violations {
            let entry = report
                .rules
                .entry(violation.rule_id.clone())
                .or_insert_with(|| RuleEntry::from_violation(violation));
            entry.add_page(&result.page_label);
            entry.instances += 1;

            report.impact_counts.increment(violation.impact);
            page_counts.increment(violation.impact);
            report.instances.push(ViolationInstance {
                page_label: result.page_label.clone(),
                violation: violation.clone(),
            });
        }

        report.total_passes += result.passes.len();
        report.total_incomplete += result.incomplete.len();
        report.pages.push(PageSummary {
            page_label: result.page_label.clone(),
            url: result.url.clone(),
            violations: result.violations.len(),
            passes: result.passes.len(),
            incomplete: result.incomplete.len(),
            impact_counts: page_counts,
        });
    }

    report.pages_scanned = results.len();
    report.total_instances = report.instances.len();

    debug!(
        "Aggregated {} pages: {} violation instances across {} rules",
        report.pages_scanned,
        report.total_instances,
        report.rules.len()
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CheckOutcome, NodeRef};
    use chrono::{TimeZone, Utc};

    fn violation(rule_id: &str, impact: Impact, nodes: usize) -> Violation {
        Violation {
            rule_id: rule_id.to_string(),
            impact,
            description: format!("{} description", rule_id),
            help_text: format!("{} help", rule_id),
            tags: ["wcag2a".to_string()].into_iter().collect(),
            affected_nodes: (0..nodes)
                .map(|i| NodeRef {
                    selector: format!("#node-{}", i),
                    html_snippet: format!("<div id=\"node-{}\"></div>", i),
                })
                .collect(),
        }
    }

    fn page(label: &str, violations: Vec<Violation>, passes: &[&str]) -> ScanResult {
        ScanResult {
            page_label: label.to_string(),
            url: format!("https://example.com/{}", label),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            violations,
            passes: passes
                .iter()
                .map(|id| CheckOutcome {
                    rule_id: id.to_string(),
                    description: String::new(),
                })
                .collect(),
            incomplete: vec![],
        }
    }

    #[test]
    fn test_empty_input_is_zeroed() {
        let report = aggregate(&[]);
        assert_eq!(report, AggregatedReport::default());
        assert_eq!(report.pages_scanned, 0);
        assert_eq!(report.impact_counts.total(), 0);
        assert!(report.rules.is_empty());
        assert_eq!(report.pass_rate(), 1.0);
        assert!(report.is_clean());
    }

    #[test]
    fn test_single_page_counts() {
        let result = page(
            "login",
            vec![
                violation("image-alt", Impact::Critical, 1),
                violation("color-contrast", Impact::Serious, 2),
            ],
            &["html-has-lang"],
        );
        let report = aggregate(&[result]);

        assert_eq!(report.total_instances, 2);
        assert_eq!(report.impact_counts.critical, 1);
        assert_eq!(report.impact_counts.serious, 1);
        assert_eq!(report.impact_counts.moderate, 0);
        assert_eq!(report.unique_rules(), 2);
        assert_eq!(report.total_passes, 1);
        assert!((report.pass_rate() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_shared_rule_lists_both_pages_and_counts_twice() {
        let login = page("login", vec![violation("image-alt", Impact::Critical, 1)], &[]);
        let home = page("home", vec![violation("image-alt", Impact::Critical, 3)], &[]);
        let report = aggregate(&[login, home]);

        let entry = &report.rules["image-alt"];
        assert_eq!(entry.pages, vec!["login".to_string(), "home".to_string()]);
        assert_eq!(entry.instances, 2);
        assert_eq!(report.impact_counts.critical, 2);
        assert_eq!(report.total_instances, 2);
        assert_eq!(report.unique_rules(), 1);
    }

    #[test]
    fn test_first_occurrence_fixes_rule_fields() {
        let first = page("a", vec![violation("label", Impact::Moderate, 1)], &[]);
        let second = page("b", vec![violation("label", Impact::Critical, 1)], &[]);
        let report = aggregate(&[first, second]);

        assert_eq!(report.rules["label"].impact, Impact::Moderate);
        assert_eq!(report.impact_counts.moderate, 1);
        assert_eq!(report.impact_counts.critical, 1);
    }

    #[test]
    fn test_instances_keep_page_and_order() {
        let a = page("a", vec![violation("x", Impact::Minor, 0)], &[]);
        let b = page(
            "b",
            vec![violation("y", Impact::Minor, 0), violation("x", Impact::Minor, 0)],
            &[],
        );
        let report = aggregate(&[a, b]);

        let seen: Vec<_> = report
            .instances
            .iter()
            .map(|i| (i.page_label.as_str(), i.violation.rule_id.as_str()))
            .collect();
        assert_eq!(seen, vec![("a", "x"), ("b", "y"), ("b", "x")]);
        assert_eq!(report.pages[1].violations, 2);
    }

    #[test]
    fn test_rules_by_severity_order() {
        let result = page(
            "p",
            vec![
                violation("region", Impact::Moderate, 1),
                violation("image-alt", Impact::Critical, 1),
                violation("list", Impact::Moderate, 1),
            ],
            &[],
        );
        let report = aggregate(&[result]);
        let order: Vec<_> = report
            .rules_by_severity()
            .iter()
            .map(|r| r.rule_id.as_str())
            .collect();
        assert_eq!(order, vec!["image-alt", "list", "region"]);
    }
}
