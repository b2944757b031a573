//! Accessibility audits for browser automation runs
//!
//! This crate runs a WCAG rule engine (axe-core) against live pages driven by
//! chromiumoxide, aggregates violations across every page visited in a run,
//! and renders static HTML reports with screenshots.
//!
//! # Features
//!
//! - **Scanning**: axe-core over the Chrome DevTools Protocol, restricted to
//!   guideline tags, with rules that can be switched off
//! - **Aggregation**: cross-page rule table deduplicated by rule id, with
//!   per-instance impact counts and a pass rate
//! - **Reports**: one HTML document per page plus a summary, JSON export and
//!   a console summary
//! - **Screenshots**: full-page and per-element captures referenced from the
//!   reports, with placeholders when a capture is missing
//!
//! # Example
//!
//! ```no_run
//! use a11y_audit::{AuditSession, Config};
//! use chromiumoxide::Page;
//!
//! # async fn example(page: Page) -> anyhow::Result<()> {
//! let config = Config::from_file("audit.toml")?;
//! let mut session = AuditSession::for_chromium(config)?;
//!
//! session.audit_page(&page, "home").await?;
//!
//! let outcome = session.finish(chrono::Utc::now())?;
//! println!("{} unique rules violated", outcome.report.unique_rules());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! ```toml
//! [audit]
//! project = "Storefront"
//! report_dir = "build/reports"
//! tags = ["wcag2a", "wcag2aa", "wcag21a", "wcag21aa"]
//! disabled_rules = ["page-has-heading-one"]
//! axe_script = "vendor/axe.min.js"
//!
//! [scan_policy]
//! mode = "retry"
//! attempts = 2
//! delay_ms = 2000
//! ```

pub mod aggregate;
pub mod config;
pub mod error;
pub mod model;
pub mod report;
pub mod scanner;
pub mod screenshot;
pub mod session;

// Re-export main types for convenience
pub use aggregate::{aggregate, AggregatedReport};
pub use config::Config;
pub use error::AuditError;
pub use model::{Impact, NodeRef, ScanResult, Violation};
pub use report::{ReportBuilder, ReportDir};
pub use scanner::{ScanEngine, Scanner};
pub use screenshot::{ScreenshotIndex, ScreenshotResolver};
pub use session::AuditSession;
