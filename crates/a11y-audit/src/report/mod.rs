//! Report rendering and output
//!
//! This module turns an [`AggregatedReport`] and the per-page
//! [`ScanResult`]s it was built from into static documents, and writes them
//! into a report directory.
//!
//! # Output Formats
//!
//! - **HTML**: one detailed document per page plus a cross-page summary
//! - **Console**: box-drawn summary for terminal output
//! - **JSON**: machine-readable export of the whole run
//!
//! Rendering is pure. The generation timestamp is an input, so rendering
//! the same run twice with the same resolver yields identical documents.
//!
//! # Example
//!
//! ```no_run
//! use a11y_audit::aggregate::aggregate;
//! use a11y_audit::report::{ReportBuilder, ReportDir};
//! use a11y_audit::screenshot::ScreenshotIndex;
//! use a11y_audit::model::ScanResult;
//!
//! # fn example(results: Vec<ScanResult>) -> anyhow::Result<()> {
//! let dir = ReportDir::init("build/reports")?;
//! let index = ScreenshotIndex::from_dir(dir.path());
//!
//! let report = aggregate(&results);
//! let builder = ReportBuilder::new("Shop");
//! let documents = builder.render(&report, &results, &index, chrono::Utc::now());
//! let written = dir.write_all(&documents)?;
//! println!("{} documents written", written.written.len());
//! # Ok(())
//! # }
//! ```

mod console;
pub mod html;
mod json;

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::aggregate::{aggregate, AggregatedReport};
use crate::config::OutputConfig;
use crate::error::{AuditError, Result};
use crate::model::{file_slug, ScanResult};
use crate::screenshot::{ScreenshotResolver, SCREENSHOT_DIR};

pub use console::ConsoleReporter;
pub use json::{JsonReporter, RunExport};

/// Cross-page summary document
pub const SUMMARY_FILE: &str = "accessibility-summary-report.html";

/// JSON export of the whole run
pub const JSON_FILE: &str = "accessibility-results.json";

/// Engine name shown in the Test Information block
pub const DEFAULT_ENGINE: &str = "axe-core";

/// A rendered document, not yet written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub file_name: String,
    pub content: String,
}

/// Renders HTML documents for a run
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    pub project: String,
    pub wcag_level: String,
    pub engine: String,
}

impl ReportBuilder {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            wcag_level: "AA".to_string(),
            engine: DEFAULT_ENGINE.to_string(),
        }
    }

    pub fn with_wcag_level(mut self, level: impl Into<String>) -> Self {
        self.wcag_level = level.into();
        self
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    /// Render one document per page, followed by the summary document
    ///
    /// Every entry in `results` gets a document. File names are unique
    /// within the returned sequence.
    pub fn render(
        &self,
        report: &AggregatedReport,
        results: &[ScanResult],
        resolver: &dyn ScreenshotResolver,
        generated_at: DateTime<Utc>,
    ) -> Vec<RenderedDocument> {
        let page_files = page_report_file_names(results);
        let mut documents = Vec::with_capacity(results.len() + 1);

        for (result, file_name) in results.iter().zip(&page_files) {
            debug!("Rendering {} for page {}", file_name, result.page_label);
            documents.push(RenderedDocument {
                file_name: file_name.clone(),
                content: html::page_document(self, result, resolver, &generated_at),
            });
        }

        documents.push(RenderedDocument {
            file_name: SUMMARY_FILE.to_string(),
            content: html::summary_document(self, report, &page_files, &generated_at),
        });

        documents
    }

    /// Aggregate `results` and write every output for the run into `dir`
    ///
    /// HTML documents are always written; the JSON export and console
    /// summary follow `output`. Fails only if no HTML document could be
    /// written.
    pub fn publish(
        &self,
        dir: &ReportDir,
        results: &[ScanResult],
        resolver: &dyn ScreenshotResolver,
        output: &OutputConfig,
        generated_at: DateTime<Utc>,
    ) -> Result<(AggregatedReport, WriteSummary)> {
        let report = aggregate(results);
        let documents = self.render(&report, results, resolver, generated_at);
        let mut summary = dir.write_all(&documents)?;

        if output.json {
            let export = RunExport {
                project: self.project.clone(),
                generated_at,
                summary: report.clone(),
                pages: results.to_vec(),
            };
            let written = JsonReporter::format(&export, true)
                .map_err(|e| AuditError::RenderFailure {
                    path: dir.path().join(JSON_FILE),
                    message: e.to_string(),
                })
                .and_then(|json| dir.write(JSON_FILE, &json));
            match written {
                Ok(path) => summary.written.push(path),
                Err(e) => {
                    warn!("{}", e);
                    summary.failures.push(e);
                }
            }
        }

        if output.console {
            match ConsoleReporter::format(&self.project, &report, &summary.written) {
                Ok(text) => print!("{}", text),
                Err(e) => warn!("Failed to format console summary: {}", e),
            }
        }

        Ok((report, summary))
    }
}

/// `accessibility-report-{slug}.html`, with the slug limited to `[a-z0-9_-]`
pub fn page_report_file_name(page_label: &str) -> String {
    format!("accessibility-report-{}.html", file_slug(page_label))
}

/// Page document names in result order
///
/// A name already handed out gets the first free `-2`, `-3`, ... suffix,
/// so labels like `home`, `home`, `home-2` still map to distinct files.
fn page_report_file_names(results: &[ScanResult]) -> Vec<String> {
    let mut issued: HashSet<String> = HashSet::new();
    results
        .iter()
        .map(|result| {
            let slug = file_slug(&result.page_label);
            let mut name = page_report_file_name(&slug);
            let mut suffix = 1;
            while issued.contains(&name) {
                suffix += 1;
                name = page_report_file_name(&format!("{}-{}", slug, suffix));
            }
            issued.insert(name.clone());
            name
        })
        .collect()
}

/// Outcome of writing a batch of documents
#[derive(Debug, Default)]
pub struct WriteSummary {
    pub written: Vec<PathBuf>,
    pub failures: Vec<AuditError>,
}

/// Output directory for a run, with a `screenshots/` subdirectory
#[derive(Debug, Clone)]
pub struct ReportDir {
    root: PathBuf,
}

impl ReportDir {
    /// Create the directory tree if needed
    pub fn init<P: AsRef<Path>>(path: P) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let screenshots = root.join(SCREENSHOT_DIR);
        fs::create_dir_all(&screenshots).map_err(|e| AuditError::RenderFailure {
            path: screenshots.clone(),
            message: e.to_string(),
        })?;
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Absolute location for a screenshot file name
    pub fn screenshot_path(&self, file_name: &str) -> PathBuf {
        self.root.join(SCREENSHOT_DIR).join(file_name)
    }

    pub fn write(&self, file_name: &str, content: &str) -> Result<PathBuf> {
        let path = self.root.join(file_name);
        fs::write(&path, content).map_err(|e| AuditError::RenderFailure {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Ok(path)
    }

    /// Write every document, carrying on past individual failures
    ///
    /// Only returns `Err` when there was something to write and nothing
    /// could be written.
    pub fn write_all(&self, documents: &[RenderedDocument]) -> Result<WriteSummary> {
        let mut summary = WriteSummary::default();

        for document in documents {
            match self.write(&document.file_name, &document.content) {
                Ok(path) => {
                    info!("Report written: {}", path.display());
                    summary.written.push(path);
                }
                Err(e) => {
                    warn!("{}", e);
                    summary.failures.push(e);
                }
            }
        }

        if summary.written.is_empty() && !summary.failures.is_empty() {
            return Err(summary.failures.swap_remove(0));
        }
        Ok(summary)
    }
}
