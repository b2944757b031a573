//! Console reporter for audit runs
//!
//! Provides human-readable output with box-drawing headers and a rule table.

use anyhow::Result;
use std::fmt::Write;
use std::path::PathBuf;

use crate::aggregate::{AggregatedReport, PageSummary};
use crate::model::Impact;

/// Console format reporter
pub struct ConsoleReporter;

impl ConsoleReporter {
    /// Format an aggregated run for console output
    ///
    /// `reports` lists the files written for the run, if any.
    pub fn format(project: &str, report: &AggregatedReport, reports: &[PathBuf]) -> Result<String> {
        let mut output = String::new();

        // Header
        writeln!(output)?;
        writeln!(output, "╔══════════════════════════════════════════════════════════════╗")?;
        writeln!(output, "║                 ACCESSIBILITY TEST SUMMARY                   ║")?;
        writeln!(output, "╚══════════════════════════════════════════════════════════════╝")?;
        writeln!(output)?;

        writeln!(output, "Project:           {}", project)?;
        writeln!(output, "Pages Scanned:     {}", report.pages_scanned)?;
        writeln!(output, "Total Violations:  {}", report.total_instances)?;
        for impact in Impact::ALL {
            writeln!(
                output,
                "  {:<9}        {}",
                format!("{}:", impact.label()),
                report.impact_counts.get(impact)
            )?;
        }
        writeln!(output, "Unique Rules:      {}", report.unique_rules())?;
        writeln!(output, "Pass Rate:         {:.1}%", report.pass_rate() * 100.0)?;
        writeln!(output)?;

        if !report.rules.is_empty() {
            Self::format_rules(&mut output, report)?;
        }

        writeln!(output, "────────────────────────────────────────────────────────────────")?;
        writeln!(output, "Pages:")?;
        for page in &report.pages {
            Self::format_page(&mut output, page)?;
        }

        if !reports.is_empty() {
            writeln!(output)?;
            writeln!(output, "Reports:")?;
            for path in reports {
                writeln!(output, "  • {}", path.display())?;
            }
        }

        writeln!(output)?;
        writeln!(output, "────────────────────────────────────────────────────────────────")?;
        let (symbol, status) = if report.is_clean() {
            ("✓", "NO VIOLATIONS")
        } else {
            ("✗", "VIOLATIONS FOUND")
        };
        writeln!(output, "Overall Status: {} {}", symbol, status)?;
        writeln!(output)?;
        Ok(output)
    }

    fn format_rules(output: &mut String, report: &AggregatedReport) -> Result<()> {
        writeln!(output, "  ┌──────────────────────────────┬──────────┬───────────┬───────┐")?;
        writeln!(output, "  │ Rule                         │  Impact  │ Instances │ Pages │")?;
        writeln!(output, "  ├──────────────────────────────┼──────────┼───────────┼───────┤")?;

        for entry in report.rules_by_severity() {
            writeln!(
                output,
                "  │ {:<28} │ {:^8} │ {:>9} │ {:>5} │",
                clip(&entry.rule_id, 28),
                entry.impact.as_str(),
                entry.instances,
                entry.pages.len()
            )?;
        }

        writeln!(output, "  └──────────────────────────────┴──────────┴───────────┴───────┘")?;
        writeln!(output)?;
        Ok(())
    }

    fn format_page(output: &mut String, page: &PageSummary) -> Result<()> {
        let symbol = if page.violations == 0 { "✓" } else { "✗" };
        writeln!(
            output,
            "  {} {}: {} violations, {} passes, {} incomplete",
            symbol, page.page_label, page.violations, page.passes, page.incomplete
        )?;
        Ok(())
    }
}

fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut clipped: String = text.chars().take(width - 1).collect();
        clipped.push('…');
        clipped
    }
}
