//! Screenshot naming, capture, and lookup
//!
//! Capturing is done by a [`ScreenshotCapture`] implementation against the
//! live page. Rendering only ever consults a [`ScreenshotResolver`], a pure
//! lookup that answers "is there a file for this page/rule/node?". The usual
//! resolver is a [`ScreenshotIndex`] filled in as captures succeed, or built
//! from the files already present in a report directory.
//!
//! File names are deterministic:
//!
//! - `screenshots/fullpage-{page}.png`
//! - `screenshots/violation-{page}-{rule}-{node}.png`

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{debug, instrument};

use crate::error::{AuditError, Result};
use crate::model::file_slug;

/// Subdirectory of the report directory holding screenshots
pub const SCREENSHOT_DIR: &str = "screenshots";

pub fn full_page_file_name(page_label: &str) -> String {
    format!("fullpage-{}.png", file_slug(page_label))
}

pub fn element_file_name(page_label: &str, rule_id: &str, node_index: usize) -> String {
    format!(
        "violation-{}-{}-{}.png",
        file_slug(page_label),
        file_slug(rule_id),
        node_index
    )
}

/// Path of a screenshot relative to the report directory
pub fn relative_path(file_name: &str) -> String {
    format!("{}/{}", SCREENSHOT_DIR, file_name)
}

/// Lookup used while rendering to decide whether an image can be embedded
pub trait ScreenshotResolver {
    /// Relative path of the screenshot for one affected node, if captured
    fn element(&self, page_label: &str, rule_id: &str, node_index: usize) -> Option<String>;

    /// Relative path of the full-page screenshot, if captured
    fn full_page(&self, _page_label: &str) -> Option<String> {
        None
    }
}

impl<F> ScreenshotResolver for F
where
    F: Fn(&str, &str, usize) -> Option<String>,
{
    fn element(&self, page_label: &str, rule_id: &str, node_index: usize) -> Option<String> {
        self(page_label, rule_id, node_index)
    }
}

/// Resolver for runs without screenshots
#[derive(Debug, Clone, Copy, Default)]
pub struct NoScreenshots;

impl ScreenshotResolver for NoScreenshots {
    fn element(&self, _page_label: &str, _rule_id: &str, _node_index: usize) -> Option<String> {
        None
    }
}

/// Set of screenshot files known to exist
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenshotIndex {
    files: BTreeSet<String>,
}

impl ScreenshotIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the PNG files already present under `{report_dir}/screenshots`
    ///
    /// A missing directory yields an empty index.
    pub fn from_dir<P: AsRef<Path>>(report_dir: P) -> Self {
        let dir = report_dir.as_ref().join(SCREENSHOT_DIR);
        let files = match fs::read_dir(&dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_file())
                .filter_map(|e| e.file_name().into_string().ok())
                .filter(|name| name.ends_with(".png"))
                .collect(),
            Err(e) => {
                debug!("No screenshots indexed from {}: {}", dir.display(), e);
                BTreeSet::new()
            }
        };
        Self { files }
    }

    /// Record a captured file by name
    pub fn record(&mut self, file_name: impl Into<String>) {
        self.files.insert(file_name.into());
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.files.contains(file_name)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl ScreenshotResolver for ScreenshotIndex {
    fn element(&self, page_label: &str, rule_id: &str, node_index: usize) -> Option<String> {
        let name = element_file_name(page_label, rule_id, node_index);
        self.contains(&name).then(|| relative_path(&name))
    }

    fn full_page(&self, page_label: &str) -> Option<String> {
        let name = full_page_file_name(page_label);
        self.contains(&name).then(|| relative_path(&name))
    }
}

/// Captures screenshots of a live page
#[async_trait]
pub trait ScreenshotCapture: Send + Sync {
    type Page: Send + Sync + ?Sized;

    async fn capture_full_page(&self, page: &Self::Page, path: &Path) -> Result<()>;

    /// Capture the first element matching `selector`
    async fn capture_element(&self, page: &Self::Page, selector: &str, path: &Path) -> Result<()>;
}

/// PNG captures through chromiumoxide
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromiumScreenshots;

#[async_trait]
impl ScreenshotCapture for ChromiumScreenshots {
    type Page = Page;

    #[instrument(skip(self, page))]
    async fn capture_full_page(&self, page: &Page, path: &Path) -> Result<()> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();

        page.save_screenshot(params, path)
            .await
            .map_err(|e| AuditError::ScreenshotUnavailable(format!("{}: {}", path.display(), e)))?;
        debug!("Screenshot saved: {}", path.display());
        Ok(())
    }

    #[instrument(skip(self, page))]
    async fn capture_element(&self, page: &Page, selector: &str, path: &Path) -> Result<()> {
        let element = page.find_element(selector).await.map_err(|e| {
            AuditError::ScreenshotUnavailable(format!("Element not found: {}: {}", selector, e))
        })?;

        element
            .save_screenshot(CaptureScreenshotFormat::Png, path)
            .await
            .map_err(|e| {
                AuditError::ScreenshotUnavailable(format!(
                    "Element not visible: {}: {}",
                    selector, e
                ))
            })?;
        debug!("Element screenshot saved: {}", path.display());
        Ok(())
    }
}
