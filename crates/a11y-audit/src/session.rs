//! Audit run orchestration
//!
//! An [`AuditSession`] is what browser automation code talks to. After each
//! navigation the driver hands over the live page and a label; the session
//! scans it under a timeout, captures screenshots, and keeps the result.
//! Once every page has been visited, [`AuditSession::finish`] aggregates,
//! renders, and writes the reports.
//!
//! ```text
//! navigate ──► audit_page ──► scan (timeout, skip/retry) ──► screenshots
//!     ▲                                                          │
//!     └──────────────────────── next page ◄──────────────────────┘
//!
//! finish ──► aggregate ──► render ──► write HTML + JSON ──► console summary
//! ```
//!
//! Pages are audited strictly one after another. The session holds no page
//! handle between calls.
//!
//! # Example
//!
//! ```no_run
//! use a11y_audit::config::Config;
//! use a11y_audit::session::AuditSession;
//! use chromiumoxide::Page;
//!
//! # async fn example(page: Page) -> anyhow::Result<()> {
//! let config = Config::from_file("audit.toml")?;
//! let mut session = AuditSession::for_chromium(config)?;
//!
//! // ... log in, navigate ...
//! session.audit_page(&page, "login-page").await?;
//!
//! // ... navigate again ...
//! session.audit_page(&page, "dashboard").await?;
//!
//! let outcome = session.finish(chrono::Utc::now())?;
//! println!("{} violation instances", outcome.report.total_instances);
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

use crate::aggregate::AggregatedReport;
use crate::config::{Config, ScanPolicy};
use crate::error::{AuditError, Result};
use crate::model::{file_slug, ScanResult};
use crate::report::{ReportBuilder, ReportDir};
use crate::scanner::axe::AxeEngine;
use crate::scanner::{ScanEngine, Scanner};
use crate::screenshot::{
    element_file_name, full_page_file_name, ChromiumScreenshots, ScreenshotCapture,
    ScreenshotIndex,
};

/// What a finished run produced
#[derive(Debug)]
pub struct RunOutcome {
    pub report: AggregatedReport,
    /// Files written, in write order
    pub written: Vec<PathBuf>,
    /// Documents that could not be written
    pub failures: Vec<AuditError>,
    /// Labels of pages that could not be scanned
    pub skipped: Vec<String>,
}

/// Driver-facing audit loop
pub struct AuditSession<E, C> {
    config: Config,
    dir: ReportDir,
    scanner: Scanner<E>,
    capture: C,
    results: Vec<ScanResult>,
    screenshots: ScreenshotIndex,
    skipped: Vec<String>,
}

impl AuditSession<AxeEngine, ChromiumScreenshots> {
    /// Session for chromiumoxide pages using axe-core
    ///
    /// Loads `audit.axe_script` when one is configured.
    pub fn for_chromium(config: Config) -> Result<Self> {
        let engine = match &config.audit.axe_script {
            Some(path) => AxeEngine::from_script_file(path)?,
            None => AxeEngine::new(),
        };
        Self::new(config, engine, ChromiumScreenshots)
    }
}

impl<E, C> AuditSession<E, C>
where
    E: ScanEngine,
    C: ScreenshotCapture<Page = E::Page>,
{
    /// Create a session, preparing the report directory
    pub fn new(config: Config, engine: E, capture: C) -> Result<Self> {
        config.validate()?;
        let dir = ReportDir::init(&config.audit.report_dir)?;
        let scanner = Scanner::new(engine).with_disabled_rules(config.audit.disabled_rules.clone());

        info!(
            "Audit session for '{}' writing to {}",
            config.audit.project,
            dir.path().display()
        );

        Ok(Self {
            config,
            dir,
            scanner,
            capture,
            results: Vec::new(),
            screenshots: ScreenshotIndex::new(),
            skipped: Vec::new(),
        })
    }

    pub fn engine(&self) -> &E {
        self.scanner.engine()
    }

    pub fn results(&self) -> &[ScanResult] {
        &self.results
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn screenshots(&self) -> &ScreenshotIndex {
        &self.screenshots
    }

    pub fn report_dir(&self) -> &ReportDir {
        &self.dir
    }

    /// Scan the current page state and capture its screenshots
    ///
    /// Returns `Ok(None)` when the page could not be scanned and the scan
    /// policy says to move on. Errors other than an unavailable scan are
    /// returned as-is.
    ///
    /// Report and screenshot files are named after the label, so a label
    /// that slugs the same as an already scanned page is rejected with
    /// [`AuditError::DuplicateLabel`] before anything is captured.
    #[instrument(skip(self, page), fields(page = %label))]
    pub async fn audit_page(
        &mut self,
        page: &E::Page,
        label: &str,
    ) -> Result<Option<&ScanResult>> {
        let slug = file_slug(label);
        if self.results.iter().any(|r| file_slug(&r.page_label) == slug) {
            return Err(AuditError::DuplicateLabel(label.to_string()));
        }

        let Some(result) = self.scan_with_policy(page, label).await? else {
            self.skipped.push(label.to_string());
            return Ok(None);
        };

        info!(
            "Scanned {}: {} violations, {} passes",
            label,
            result.violations.len(),
            result.passes.len()
        );

        self.capture_screenshots(page, &result).await;
        self.results.push(result);
        Ok(self.results.last())
    }

    async fn scan_with_policy(&self, page: &E::Page, label: &str) -> Result<Option<ScanResult>> {
        let policy = self.config.scan_policy;
        let attempts = policy.attempts();

        for attempt in 1..=attempts {
            match self.scan_once(page, label).await {
                Ok(result) => return Ok(Some(result)),
                Err(e) if e.is_recoverable() => {
                    if attempt < attempts {
                        warn!(
                            "Attempt {}/{} for {} failed: {}; retrying in {}ms",
                            attempt,
                            attempts,
                            label,
                            e,
                            policy.delay().as_millis()
                        );
                        tokio::time::sleep(policy.delay()).await;
                    } else {
                        match policy {
                            ScanPolicy::Skip => warn!("Skipping {}: {}", label, e),
                            ScanPolicy::Retry { .. } => {
                                warn!("Skipping {} after {} attempts: {}", label, attempts, e)
                            }
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Ok(None)
    }

    async fn scan_once(&self, page: &E::Page, label: &str) -> Result<ScanResult> {
        let limit = self.config.audit.scan_timeout;
        let scan = self.scanner.scan(page, label, &self.config.audit.tags);

        match tokio::time::timeout(limit, scan).await {
            Ok(result) => result,
            Err(_) => Err(AuditError::ScanUnavailable(format!(
                "scan of {} timed out after {}ms",
                label,
                limit.as_millis()
            ))),
        }
    }

    /// Best-effort captures; failures only mean a placeholder in the report
    async fn capture_screenshots(&mut self, page: &E::Page, result: &ScanResult) {
        let label = &result.page_label;

        if self.config.screenshots.full_page {
            let name = full_page_file_name(label);
            let path = self.dir.screenshot_path(&name);
            match self.capture.capture_full_page(page, &path).await {
                Ok(()) => self.screenshots.record(name),
                Err(e) => warn!("Full-page screenshot for {} failed: {}", label, e),
            }
        }

        if !self.config.screenshots.elements || !result.has_violations() {
            return;
        }

        debug!(
            "Capturing element screenshots for {} violations on {}",
            result.violations.len(),
            label
        );
        for violation in &result.violations {
            for (index, node) in violation.affected_nodes.iter().enumerate() {
                if !node.has_selector() {
                    continue;
                }
                let name = element_file_name(label, &violation.rule_id, index);
                let path = self.dir.screenshot_path(&name);
                match self.capture.capture_element(page, &node.selector, &path).await {
                    Ok(()) => self.screenshots.record(name),
                    Err(e) => {
                        debug!("No screenshot for {} node {}: {}", violation.rule_id, index, e)
                    }
                }
            }
        }
    }

    /// Aggregate, render, and write everything for the run
    ///
    /// Individual write failures are reported in the outcome. Fails only if
    /// no document at all could be written.
    #[instrument(skip(self))]
    pub fn finish(self, generated_at: DateTime<Utc>) -> Result<RunOutcome> {
        let audit = &self.config.audit;
        let builder =
            ReportBuilder::new(audit.project.clone()).with_wcag_level(audit.wcag_level.clone());
        let (report, summary) = builder.publish(
            &self.dir,
            &self.results,
            &self.screenshots,
            &self.config.output,
            generated_at,
        )?;

        if !self.skipped.is_empty() {
            warn!(
                "{} pages were not scanned: {}",
                self.skipped.len(),
                self.skipped.join(", ")
            );
        }
        info!(
            "Audit finished: {} pages, {} violation instances, {} files written",
            report.pages_scanned,
            report.total_instances,
            summary.written.len()
        );

        Ok(RunOutcome {
            report,
            written: summary.written,
            failures: summary.failures,
            skipped: self.skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{RawScan, ScanOptions};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PAYLOAD: &str = r##"{
        "url": "https://example.com/login",
        "violations": [{
            "id": "image-alt",
            "impact": "critical",
            "description": "Images need alt text",
            "help": "Add alt",
            "tags": ["wcag2a"],
            "nodes": [{"target": ["#logo"], "html": "<img id=\"logo\">"}]
        }],
        "passes": [{"id": "html-has-lang", "description": "lang"}]
    }"##;

    /// Fails the first `failures` calls, then returns the payload
    struct FlakyEngine {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ScanEngine for FlakyEngine {
        type Page = ();

        async fn analyze(&self, _page: &(), _options: &ScanOptions) -> Result<RawScan> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(AuditError::ScanUnavailable("navigation in flight".into()))
            } else {
                RawScan::from_json(PAYLOAD)
            }
        }
    }

    struct NoCapture;

    #[async_trait]
    impl ScreenshotCapture for NoCapture {
        type Page = ();

        async fn capture_full_page(&self, _page: &(), _path: &Path) -> Result<()> {
            Err(AuditError::ScreenshotUnavailable("disabled".into()))
        }

        async fn capture_element(&self, _page: &(), _selector: &str, _path: &Path) -> Result<()> {
            Err(AuditError::ScreenshotUnavailable("disabled".into()))
        }
    }

    fn config(dir: &Path, policy: &str) -> Config {
        let toml = format!(
            "[audit]\nreport_dir = {:?}\n\n[scan_policy]\n{}\n\n[output]\nconsole = false\n",
            dir.display().to_string(),
            policy
        );
        Config::from_str(&toml).unwrap()
    }

    fn flaky(failures: usize) -> FlakyEngine {
        FlakyEngine {
            failures,
            calls: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn test_skip_policy_moves_on() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session =
            AuditSession::new(config(tmp.path(), "mode = \"skip\""), flaky(1), NoCapture).unwrap();

        assert!(session.audit_page(&(), "login").await.unwrap().is_none());
        assert_eq!(session.skipped(), ["login".to_string()]);
        assert!(session.audit_page(&(), "home").await.unwrap().is_some());
        assert_eq!(session.results().len(), 1);
    }

    #[tokio::test]
    async fn test_retry_policy_recovers() {
        let tmp = tempfile::tempdir().unwrap();
        let policy = "mode = \"retry\"\nattempts = 3\ndelay_ms = 1";
        let mut session =
            AuditSession::new(config(tmp.path(), policy), flaky(2), NoCapture).unwrap();

        let result = session.audit_page(&(), "login").await.unwrap().unwrap();
        assert_eq!(result.violations.len(), 1);
        assert!(session.skipped().is_empty());
    }

    #[tokio::test]
    async fn test_finish_writes_reports_with_placeholders() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session =
            AuditSession::new(config(tmp.path(), "mode = \"skip\""), flaky(0), NoCapture).unwrap();
        session.audit_page(&(), "login").await.unwrap();

        let outcome = session.finish(Utc::now()).unwrap();
        assert_eq!(outcome.report.total_instances, 1);
        assert_eq!(outcome.written.len(), 3);
        assert!(outcome.failures.is_empty());

        let page =
            std::fs::read_to_string(tmp.path().join("accessibility-report-login.html")).unwrap();
        assert!(page.contains("No screenshot available"));
        assert!(tmp.path().join(crate::report::JSON_FILE).is_file());
    }
}
