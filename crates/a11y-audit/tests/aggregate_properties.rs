//! Property tests for cross-page aggregation
//!
//! Run with: cargo test -p a11y-audit --test aggregate_properties

use a11y_audit::model::{CheckOutcome, Impact, NodeRef, ScanResult, Violation};
use a11y_audit::{aggregate, AggregatedReport};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashSet};

const RULES: [&str; 6] = [
    "image-alt",
    "color-contrast",
    "label",
    "link-name",
    "region",
    "button-name",
];

fn impact_strategy() -> impl Strategy<Value = Impact> {
    prop_oneof![
        Just(Impact::Minor),
        Just(Impact::Moderate),
        Just(Impact::Serious),
        Just(Impact::Critical),
    ]
}

fn violation_strategy() -> impl Strategy<Value = Violation> {
    (0..RULES.len(), impact_strategy(), 0usize..4).prop_map(|(rule, impact, nodes)| Violation {
        rule_id: RULES[rule].to_string(),
        impact,
        description: format!("{} description", RULES[rule]),
        help_text: format!("{} help", RULES[rule]),
        tags: ["wcag2a".to_string()].into_iter().collect(),
        affected_nodes: (0..nodes)
            .map(|i| NodeRef {
                selector: format!("#n{}", i),
                html_snippet: String::new(),
            })
            .collect(),
    })
}

/// One scan result: violations have distinct rule ids, as after normalization
fn result_strategy(label: String) -> impl Strategy<Value = ScanResult> {
    (
        prop::collection::vec(violation_strategy(), 0..5),
        0usize..8,
        0usize..3,
    )
        .prop_map(move |(violations, passes, incomplete)| {
            let mut seen = HashSet::new();
            let violations: Vec<Violation> = violations
                .into_iter()
                .filter(|v| seen.insert(v.rule_id.clone()))
                .collect();
            ScanResult {
                page_label: label.clone(),
                url: format!("https://example.com/{}", label),
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                violations,
                passes: (0..passes)
                    .map(|i| CheckOutcome {
                        rule_id: format!("pass-{}", i),
                        description: String::new(),
                    })
                    .collect(),
                incomplete: (0..incomplete)
                    .map(|i| CheckOutcome {
                        rule_id: format!("incomplete-{}", i),
                        description: String::new(),
                    })
                    .collect(),
            }
        })
}

fn run_strategy() -> impl Strategy<Value = Vec<ScanResult>> {
    (0usize..6).prop_flat_map(|pages| {
        (0..pages)
            .map(|i| result_strategy(format!("page-{}", i)))
            .collect::<Vec<_>>()
    })
}

proptest! {
    #[test]
    fn impact_counts_sum_to_instances(results in run_strategy()) {
        let report = aggregate(&results);
        let expected: usize = results.iter().map(|r| r.violations.len()).sum();

        prop_assert_eq!(report.impact_counts.total(), expected);
        prop_assert_eq!(report.total_instances, expected);
        prop_assert_eq!(report.instances.len(), expected);
        prop_assert_eq!(report.pages_scanned, results.len());
    }

    #[test]
    fn rule_table_has_one_entry_per_distinct_rule(results in run_strategy()) {
        let report = aggregate(&results);
        let distinct: BTreeSet<&str> = results
            .iter()
            .flat_map(|r| r.violations.iter().map(|v| v.rule_id.as_str()))
            .collect();

        prop_assert_eq!(report.unique_rules(), distinct.len());
        prop_assert!(report.rules.keys().map(String::as_str).eq(distinct.into_iter()));
    }

    #[test]
    fn rule_pages_follow_visitation_order(results in run_strategy()) {
        let report = aggregate(&results);

        for entry in report.rules.values() {
            let expected: Vec<String> = results
                .iter()
                .filter(|r| r.violations.iter().any(|v| v.rule_id == entry.rule_id))
                .map(|r| r.page_label.clone())
                .collect();
            prop_assert_eq!(&entry.pages, &expected);
            prop_assert_eq!(entry.instances, expected.len());
        }
    }

    #[test]
    fn pass_rate_is_a_ratio(results in run_strategy()) {
        let report = aggregate(&results);
        let rate = report.pass_rate();
        prop_assert!((0.0..=1.0).contains(&rate));

        let passes: usize = results.iter().map(|r| r.passes.len()).sum();
        let violations: usize = results.iter().map(|r| r.violations.len()).sum();
        if passes + violations == 0 {
            prop_assert_eq!(rate, 1.0);
        } else {
            let expected = passes as f64 / (passes + violations) as f64;
            prop_assert!((rate - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn counts_do_not_depend_on_page_order(results in run_strategy()) {
        let forward = aggregate(&results);
        let reversed: Vec<ScanResult> = results.iter().rev().cloned().collect();
        let backward = aggregate(&reversed);

        prop_assert_eq!(forward.impact_counts, backward.impact_counts);
        prop_assert_eq!(forward.total_instances, backward.total_instances);
        prop_assert_eq!(forward.total_passes, backward.total_passes);
        prop_assert_eq!(forward.unique_rules(), backward.unique_rules());
    }
}

#[test]
fn empty_run_is_zeroed() {
    assert_eq!(aggregate(&[]), AggregatedReport::default());
}
