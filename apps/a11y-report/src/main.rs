//! Offline accessibility report renderer
//!
//! Browser automation records one axe-core JSON result per visited page.
//! This tool loads those payloads as listed in a TOML config, aggregates
//! them, and writes the same HTML, JSON and console reports an in-process
//! audit session produces. Screenshots already present in the report
//! directory are picked up and embedded.

use std::path::{Path, PathBuf};

use a11y_audit::config::Config;
use a11y_audit::report::ReportBuilder;
use a11y_audit::scanner::RawScan;
use a11y_audit::{ReportDir, ScanResult, ScreenshotIndex};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for the report renderer
#[derive(Parser, Debug)]
#[command(name = "a11y-report")]
#[command(about = "Render accessibility reports from recorded axe-core results")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render reports for every page listed in the config
    Render {
        /// Path to the audit config
        #[arg(short, long)]
        config: PathBuf,

        /// Override `audit.report_dir`
        #[arg(long)]
        report_dir: Option<PathBuf>,

        /// Generation timestamp (RFC 3339), defaults to now
        #[arg(long)]
        generated_at: Option<DateTime<Utc>>,

        /// Exit with an error when any violation was found
        #[arg(long)]
        fail_on_violations: bool,
    },

    /// Parse a config and list its pages
    Validate {
        /// Path to the audit config
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Command::Render {
            config,
            report_dir,
            generated_at,
            fail_on_violations,
        } => render(
            &config,
            report_dir,
            generated_at.unwrap_or_else(Utc::now),
            fail_on_violations,
        ),
        Command::Validate { config } => validate(&config),
    }
}

fn render(
    config_path: &Path,
    report_dir: Option<PathBuf>,
    generated_at: DateTime<Utc>,
    fail_on_violations: bool,
) -> Result<()> {
    let config = Config::from_file(config_path)?;
    let base = config_dir(config_path);

    let results = load_results(&config, &base, generated_at);
    if results.is_empty() && !config.pages.is_empty() {
        bail!("None of the {} configured pages could be loaded", config.pages.len());
    }

    let dir_path =
        report_dir.unwrap_or_else(|| Config::resolve_path(&base, &config.audit.report_dir));
    let dir = ReportDir::init(&dir_path)
        .with_context(|| format!("Failed to prepare report directory {}", dir_path.display()))?;
    let screenshots = ScreenshotIndex::from_dir(dir.path());
    info!(
        "Rendering {} pages into {} ({} screenshots found)",
        results.len(),
        dir.path().display(),
        screenshots.len()
    );

    let builder = ReportBuilder::new(config.audit.project.clone())
        .with_wcag_level(config.audit.wcag_level.clone());
    let (report, summary) =
        builder.publish(&dir, &results, &screenshots, &config.output, generated_at)?;

    for failure in &summary.failures {
        warn!("{}", failure);
    }
    info!("{} files written", summary.written.len());

    if fail_on_violations && !report.is_clean() {
        bail!(
            "{} accessibility violations across {} rules",
            report.total_instances,
            report.unique_rules()
        );
    }
    Ok(())
}

fn validate(config_path: &Path) -> Result<()> {
    let config = Config::from_file(config_path)?;
    let base = config_dir(config_path);

    println!("✓ {} is valid", config_path.display());
    println!();
    println!("Project:     {}", config.audit.project);
    println!("Report dir:  {}", config.audit.report_dir.display());
    println!("Tags:        {}", config.audit.tags.join(", "));
    if !config.audit.disabled_rules.is_empty() {
        println!("Disabled:    {}", config.audit.disabled_rules.join(", "));
    }
    println!("Scan policy: {:?}", config.scan_policy);

    println!();
    println!("Pages ({}):", config.pages.len());
    for (i, page) in config.pages.iter().enumerate() {
        let path = Config::resolve_path(&base, &page.results);
        let status = if path.is_file() { "✓" } else { "✗ missing" };
        println!("  {}. {} ← {} {}", i + 1, page.label, path.display(), status);
    }
    Ok(())
}

fn config_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// Load every configured payload, skipping the ones that cannot be read
fn load_results(config: &Config, base: &Path, generated_at: DateTime<Utc>) -> Vec<ScanResult> {
    let mut results = Vec::with_capacity(config.pages.len());

    for page in &config.pages {
        let path = Config::resolve_path(base, &page.results);
        let raw = match RawScan::from_json_file(&path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Skipping {}: {}", page.label, e);
                continue;
            }
        };

        let mut result = raw.normalize(&page.label, "", generated_at);
        if let Some(url) = &page.url {
            result.url = url.clone();
        }
        results.push(result);
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::fs;

    const LOGIN: &str = r##"{
        "url": "https://example.com/#/auth/login",
        "timestamp": "2024-05-01T10:00:00.000Z",
        "violations": [{
            "id": "color-contrast",
            "impact": "serious",
            "description": "Ensures contrast",
            "help": "Elements must meet contrast ratio thresholds",
            "tags": ["wcag2aa", "wcag143"],
            "nodes": [{"target": [".btn"], "html": "<button class=\"btn\">Go</button>"}]
        }],
        "passes": [{"id": "html-has-lang", "description": "lang"}]
    }"##;

    fn write_setup(dir: &Path) -> PathBuf {
        fs::create_dir_all(dir.join("raw")).unwrap();
        fs::write(dir.join("raw/login.json"), LOGIN).unwrap();
        let config = r#"
            [audit]
            project = "Shop"
            report_dir = "out"

            [output]
            console = false

            [[pages]]
            label = "login-page"
            results = "raw/login.json"

            [[pages]]
            label = "home"
            url = "https://example.com/"
            results = "raw/missing.json"
        "#;
        let path = dir.join("audit.toml");
        fs::write(&path, config).unwrap();
        path
    }

    #[test]
    fn test_load_results_skips_unreadable_payloads() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = write_setup(tmp.path());
        let config = Config::from_file(&config_path).unwrap();
        let when = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        let results = load_results(&config, tmp.path(), when);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].page_label, "login-page");
        assert_eq!(results[0].url, "https://example.com/#/auth/login");
        assert_eq!(results[0].violations[0].rule_id, "color-contrast");
    }

    #[test]
    fn test_render_writes_reports_relative_to_config() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = write_setup(tmp.path());
        let when = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        render(&config_path, None, when, false).unwrap();

        let out = tmp.path().join("out");
        assert!(out.join("accessibility-report-login-page.html").is_file());
        assert!(out.join("accessibility-summary-report.html").is_file());
        assert!(out.join("accessibility-results.json").is_file());
        assert!(out.join("screenshots").is_dir());
    }

    #[test]
    fn test_render_fails_on_violations_when_asked() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = write_setup(tmp.path());
        let when = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        let err = render(&config_path, None, when, true).unwrap_err();
        assert!(err.to_string().contains("1 accessibility violations"));
    }

    #[test]
    fn test_cli_parses_render() {
        let cli = Cli::parse_from([
            "a11y-report",
            "render",
            "--config",
            "audit.toml",
            "--generated-at",
            "2024-06-01T00:00:00Z",
            "-v",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Command::Render {
                config,
                generated_at,
                ..
            } => {
                assert_eq!(config, PathBuf::from("audit.toml"));
                assert_eq!(
                    generated_at,
                    Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())
                );
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
