//! HTML templates for page and summary reports
//!
//! One template per document kind, parameterized by page data. All
//! interpolated text goes through [`escape`].

use chrono::{DateTime, Utc};

use super::ReportBuilder;
use crate::aggregate::{AggregatedReport, PageSummary, RuleEntry, ViolationInstance};
use crate::model::{Impact, NodeRef, ScanResult, Violation};
use crate::screenshot::ScreenshotResolver;

/// Shown wherever a screenshot could not be resolved
pub const NO_SCREENSHOT: &str = "No screenshot available";

const STYLE: &str = r#"
    body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 0; background: #f8f9fa; color: #212529; }
    .container { max-width: 1140px; margin: 0 auto; padding: 24px; }
    .summary-stats { background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; border-radius: 10px; padding: 20px; margin-bottom: 30px; display: flex; flex-wrap: wrap; }
    .stat-item { flex: 1; min-width: 140px; text-align: center; padding: 10px; }
    .stat-number { font-size: 2.5rem; font-weight: bold; display: block; }
    .stat-label { font-size: 0.9rem; opacity: 0.9; }
    .card { background: white; border: 1px solid #dee2e6; border-radius: 6px; padding: 16px; margin-bottom: 16px; }
    .violation-card { border-left: 4px solid #dc3545; }
    .impact-critical { border-left-color: #6f1d1b; }
    .impact-serious { border-left-color: #dc3545; }
    .impact-moderate { border-left-color: #ffc107; }
    .impact-minor { border-left-color: #17a2b8; }
    .severity-badge { display: inline-block; padding: 4px 8px; border-radius: 4px; font-size: 0.8em; font-weight: bold; margin-right: 5px; }
    .severity-critical { background: #6f1d1b; color: white; }
    .severity-serious { background: #dc3545; color: white; }
    .severity-moderate { background: #ffc107; color: black; }
    .severity-minor { background: #17a2b8; color: white; }
    .nodes { display: flex; flex-wrap: wrap; gap: 12px; }
    .node { flex: 1 1 300px; }
    .violation-screenshot { max-width: 300px; border: 2px solid #dc3545; }
    .page-screenshot { max-width: 100%; max-height: 500px; border: 2px solid #dee2e6; }
    .text-muted { color: #6c757d; }
    .alert-success { background: #d1e7dd; border: 1px solid #badbcc; border-radius: 6px; padding: 16px; }
    table { width: 100%; border-collapse: collapse; background: white; }
    th, td { text-align: left; padding: 8px; border-bottom: 1px solid #dee2e6; vertical-align: top; }
    code { word-break: break-all; }
"#;

/// Escape text for use in element content and quoted attributes
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn head(title: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{title}</title>
  <style>{style}</style>
</head>
<body>
<div class="container">
"#,
        title = escape(title),
        style = STYLE,
    )
}

const FOOT: &str = "</div>\n</body>\n</html>\n";

fn stat(value: impl std::fmt::Display, label: &str) -> String {
    format!(
        r#"    <div class="stat-item"><span class="stat-number">{}</span><span class="stat-label">{}</span></div>
"#,
        value,
        escape(label)
    )
}

fn badge(impact: Impact) -> String {
    format!(
        r#"<span class="severity-badge severity-{}">{}</span>"#,
        impact.as_str(),
        impact.as_str().to_uppercase()
    )
}

/// `<img>` wrapped in a link, or the placeholder when there is no usable path
fn image_or_placeholder(path: Option<String>, alt: &str, class: &str) -> String {
    match path.filter(|p| !p.trim().is_empty()) {
        Some(path) => format!(
            r#"<a href="{src}"><img src="{src}" alt="{alt}" class="{class}"></a>"#,
            src = escape(&path),
            alt = escape(alt),
            class = class,
        ),
        None => format!(r#"<p class="text-muted">{}</p>"#, NO_SCREENSHOT),
    }
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub(super) fn page_document(
    builder: &ReportBuilder,
    result: &ScanResult,
    resolver: &dyn ScreenshotResolver,
    generated_at: &DateTime<Utc>,
) -> String {
    let title = format!("{} Accessibility Report - {}", builder.project, result.page_label);
    let mut html = head(&title);

    html.push_str(&format!("<h1>{}</h1>\n", escape(&title)));

    let serious = result.count_impact(Impact::Serious) + result.count_impact(Impact::Critical);
    html.push_str("<div class=\"summary-stats\">\n");
    html.push_str(&stat(result.violations.len(), "Violations"));
    html.push_str(&stat(result.passes.len(), "Passes"));
    html.push_str(&stat(result.incomplete.len(), "Incomplete"));
    html.push_str(&stat(serious, "Serious Issues"));
    html.push_str("</div>\n");

    html.push_str("<div class=\"card\">\n  <h2>Page Screenshot</h2>\n  ");
    html.push_str(&image_or_placeholder(
        resolver.full_page(&result.page_label),
        &format!("{} screenshot", result.page_label),
        "page-screenshot",
    ));
    html.push_str("\n</div>\n");

    if result.violations.is_empty() {
        html.push_str(
            "<div class=\"alert-success\"><h2>No accessibility violations found!</h2>\
             <p>This page meets the accessibility standards checked.</p></div>\n",
        );
    } else {
        html.push_str("<h2>Accessibility Violations</h2>\n");
        for violation in &result.violations {
            html.push_str(&violation_card(&result.page_label, violation, resolver));
        }
    }

    html.push_str(&format!(
        r#"<div class="card">
  <h2>Test Information</h2>
  <p><strong>Generated:</strong> {generated}</p>
  <p><strong>Scanned:</strong> {scanned}</p>
  <p><strong>Page URL:</strong> {url}</p>
  <p><strong>Rule Engine:</strong> {engine}</p>
  <p><strong>WCAG Level:</strong> {level}</p>
</div>
"#,
        generated = format_time(generated_at),
        scanned = format_time(&result.timestamp),
        url = if result.url.is_empty() {
            "N/A".to_string()
        } else {
            escape(&result.url)
        },
        engine = escape(&builder.engine),
        level = escape(&builder.wcag_level),
    ));

    html.push_str(FOOT);
    html
}

fn violation_card(
    page_label: &str,
    violation: &Violation,
    resolver: &dyn ScreenshotResolver,
) -> String {
    let wcag: Vec<&str> = violation.wcag_tags().collect();
    let mut card = format!(
        r#"<div class="card violation-card impact-{impact}">
  <h3>{badge}{rule}</h3>
  <p>{description}</p>
  <p><strong>WCAG Guidelines:</strong> {wcag}</p>
  <p><strong>Help:</strong> {help}</p>
  <h4>Affected Elements ({count}):</h4>
  <div class="nodes">
"#,
        impact = violation.impact.as_str(),
        badge = badge(violation.impact),
        rule = escape(&violation.rule_id),
        description = escape(&violation.description),
        wcag = if wcag.is_empty() {
            "N/A".to_string()
        } else {
            escape(&wcag.join(", "))
        },
        help = escape(&violation.help_text),
        count = violation.affected_nodes.len(),
    );

    for (index, node) in violation.affected_nodes.iter().enumerate() {
        card.push_str(&node_card(page_label, &violation.rule_id, index, node, resolver));
    }

    card.push_str("  </div>\n</div>\n");
    card
}

fn node_card(
    page_label: &str,
    rule_id: &str,
    index: usize,
    node: &NodeRef,
    resolver: &dyn ScreenshotResolver,
) -> String {
    let or_na = |s: &str| {
        if s.trim().is_empty() {
            "N/A".to_string()
        } else {
            escape(s)
        }
    };

    format!(
        r#"    <div class="card node">
      <p><strong>Element:</strong> <code>{selector}</code></p>
      <p><strong>HTML:</strong> <code>{html}</code></p>
      {image}
    </div>
"#,
        selector = or_na(&node.selector),
        html = or_na(&node.html_snippet),
        image = image_or_placeholder(
            resolver.element(page_label, rule_id, index),
            &format!("Violation {} element {}", rule_id, index + 1),
            "violation-screenshot",
        ),
    )
}

pub(super) fn summary_document(
    builder: &ReportBuilder,
    report: &AggregatedReport,
    page_files: &[String],
    generated_at: &DateTime<Utc>,
) -> String {
    let title = format!("{} Accessibility Test Summary", builder.project);
    let mut html = head(&title);

    html.push_str(&format!(
        "<h1>{}</h1>\n<p class=\"text-muted\">Generated {}</p>\n",
        escape(&title),
        format_time(generated_at)
    ));

    html.push_str("<div class=\"summary-stats\">\n");
    html.push_str(&stat(report.pages_scanned, "Pages Scanned"));
    html.push_str(&stat(report.total_instances, "Total Violations"));
    for impact in Impact::ALL {
        html.push_str(&stat(
            report.impact_counts.get(impact),
            &format!("{} Issues", impact.label()),
        ));
    }
    html.push_str(&stat(format!("{:.1}%", report.pass_rate() * 100.0), "Pass Rate"));
    html.push_str("</div>\n");

    html.push_str(&format!(
        "<h2>Violations by Rule ({} unique)</h2>\n",
        report.unique_rules()
    ));
    if report.rules.is_empty() {
        html.push_str("<div class=\"alert-success\">No violations found on any page.</div>\n");
    } else {
        html.push_str(
            "<table>\n<thead><tr><th>Rule</th><th>Impact</th><th>Instances</th><th>Pages</th><th>Help</th></tr></thead>\n<tbody>\n",
        );
        for entry in report.rules_by_severity() {
            html.push_str(&rule_row(entry));
        }
        html.push_str("</tbody>\n</table>\n");
    }

    html.push_str("<h2>Page-by-Page Results</h2>\n");
    let mut offset = 0;
    for (index, page) in report.pages.iter().enumerate() {
        let link = page_files.get(index).map(String::as_str);
        let end = (offset + page.violations).min(report.instances.len());
        html.push_str(&page_card(page, link, &report.instances[offset..end]));
        offset = end;
    }

    html.push_str(&format!(
        r#"<div class="card">
  <h2>Test Information</h2>
  <p><strong>Rule Engine:</strong> {engine}</p>
  <p><strong>WCAG Level:</strong> {level}</p>
</div>
"#,
        engine = escape(&builder.engine),
        level = escape(&builder.wcag_level),
    ));

    html.push_str(FOOT);
    html
}

fn rule_row(entry: &RuleEntry) -> String {
    format!(
        "<tr><td><code>{rule}</code><br>{description}</td><td>{badge}</td><td>{instances}</td><td>{pages}</td><td>{help}</td></tr>\n",
        rule = escape(&entry.rule_id),
        description = escape(&entry.description),
        badge = badge(entry.impact),
        instances = entry.instances,
        pages = escape(&entry.pages.join(", ")),
        help = escape(&entry.help_text),
    )
}

/// `instances` are the violations of this page only
fn page_card(page: &PageSummary, link: Option<&str>, instances: &[ViolationInstance]) -> String {
    let mut card = format!(
        r#"<div class="card">
  <h3>{description}</h3>
  <p><strong>URL:</strong> {url}<br>
  <strong>Violations:</strong> {violations} | <strong>Passes:</strong> {passes} | <strong>Incomplete:</strong> {incomplete}</p>
"#,
        description = escape(&crate::model::describe_label(&page.page_label)),
        url = if page.url.is_empty() {
            "N/A".to_string()
        } else {
            format!(r#"<a href="{0}">{0}</a>"#, escape(&page.url))
        },
        violations = page.violations,
        passes = page.passes,
        incomplete = page.incomplete,
    );

    if page.violations == 0 {
        card.push_str("  <div class=\"alert-success\">No violations found on this page</div>\n");
    } else {
        card.push_str("  <p>");
        for instance in instances {
            card.push_str(&format!(
                "{}<strong>{}:</strong> {}<br>",
                badge(instance.violation.impact),
                escape(&instance.violation.rule_id),
                escape(&instance.violation.description)
            ));
        }
        card.push_str("</p>\n");
    }

    if let Some(link) = link {
        card.push_str(&format!(
            "  <a href=\"{}\">View Detailed Report</a>\n",
            escape(link)
        ));
    }
    card.push_str("</div>\n");
    card
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<img alt="x" onerror='y'> & more"#),
            "&lt;img alt=&quot;x&quot; onerror=&#39;y&#39;&gt; &amp; more"
        );
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_image_or_placeholder() {
        let img = image_or_placeholder(Some("screenshots/a.png".into()), "alt", "c");
        assert!(img.contains(r#"<img src="screenshots/a.png""#));

        for missing in [None, Some(String::new()), Some("  ".to_string())] {
            let out = image_or_placeholder(missing, "alt", "c");
            assert!(out.contains(NO_SCREENSHOT));
            assert!(!out.contains("<img"));
        }
    }

    #[test]
    fn test_badge() {
        assert_eq!(
            badge(Impact::Critical),
            r#"<span class="severity-badge severity-critical">CRITICAL</span>"#
        );
    }
}
