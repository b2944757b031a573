//! Configuration parsing for accessibility audits
//!
//! This module provides TOML-based configuration for an audit run: which
//! guideline tags to scan for, where reports go, how to react when a scan
//! cannot run, and (for offline rendering) which recorded payloads to load.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::AuditError;
use crate::model::file_slug;

/// Main configuration structure loaded from TOML files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Audit settings
    #[serde(default)]
    pub audit: AuditConfig,
    /// What to do when a page cannot be scanned
    #[serde(default)]
    pub scan_policy: ScanPolicy,
    /// Screenshot capture settings
    #[serde(default)]
    pub screenshots: ScreenshotConfig,
    /// Extra outputs
    #[serde(default)]
    pub output: OutputConfig,
    /// Recorded scan payloads, used by offline rendering
    #[serde(default)]
    pub pages: Vec<PageSource>,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Relative `results` paths in `[[pages]]` stay relative; resolve them
    /// with [`Config::resolve_path`] against the config file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML is malformed
    /// - Validation fails
    ///
    /// # Example
    ///
    /// ```no_run
    /// use a11y_audit::config::Config;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = Config::from_file("audit.toml")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    ///
    /// # Example
    ///
    /// ```
    /// use a11y_audit::config::Config;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let toml = r#"
    ///     [audit]
    ///     project = "Storefront"
    ///     tags = ["wcag2a", "wcag2aa"]
    /// "#;
    /// let config = Config::from_str(toml)?;
    /// assert_eq!(config.audit.project, "Storefront");
    /// # Ok(())
    /// # }
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(s).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot check
    pub fn validate(&self) -> Result<(), AuditError> {
        if self.audit.tags.is_empty() {
            return Err(AuditError::Config(
                "audit.tags must name at least one guideline tag".to_string(),
            ));
        }
        if let ScanPolicy::Retry { attempts, .. } = self.scan_policy {
            if attempts == 0 {
                return Err(AuditError::Config(
                    "scan_policy.attempts must be at least 1".to_string(),
                ));
            }
        }

        let mut labels = HashSet::new();
        for page in &self.pages {
            if page.label.trim().is_empty() {
                return Err(AuditError::Config("page label must not be empty".to_string()));
            }
            // screenshots are named by slug, so labels must differ after slugging
            if !labels.insert(file_slug(&page.label)) {
                return Err(AuditError::Config(format!(
                    "duplicate page label: {}",
                    page.label
                )));
            }
        }
        Ok(())
    }

    /// Resolve a path from the config against the directory holding the config
    pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audit: AuditConfig::default(),
            scan_policy: ScanPolicy::default(),
            screenshots: ScreenshotConfig::default(),
            output: OutputConfig::default(),
            pages: Vec::new(),
        }
    }
}

/// Core audit parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Project name shown in report titles (default: "Accessibility")
    #[serde(default = "default_project")]
    pub project: String,
    /// Directory receiving reports and screenshots (default: "build/reports")
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,
    /// Guideline tags restricting rule evaluation
    #[serde(default = "default_tags")]
    pub tags: Vec<String>,
    /// Rule ids switched off for every scan
    #[serde(default)]
    pub disabled_rules: Vec<String>,
    /// Upper bound for one engine run (default: 30s)
    #[serde(default = "default_scan_timeout", with = "duration_ms", rename = "scan_timeout_ms")]
    pub scan_timeout: Duration,
    /// axe-core source injected into pages that do not already load it
    #[serde(default)]
    pub axe_script: Option<PathBuf>,
    /// Conformance level shown in the report (default: "AA")
    #[serde(default = "default_wcag_level")]
    pub wcag_level: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            project: default_project(),
            report_dir: default_report_dir(),
            tags: default_tags(),
            disabled_rules: Vec::new(),
            scan_timeout: default_scan_timeout(),
            axe_script: None,
            wcag_level: default_wcag_level(),
        }
    }
}

fn default_project() -> String {
    "Accessibility".to_string()
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("build/reports")
}

fn default_tags() -> Vec<String> {
    ["wcag2a", "wcag2aa", "wcag21a", "wcag21aa"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_scan_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_wcag_level() -> String {
    "AA".to_string()
}

/// Reaction to a scan that could not run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScanPolicy {
    /// Log and move on to the next page
    #[default]
    Skip,
    /// Try again after a fixed delay, then skip
    Retry {
        /// Total attempts including the first
        #[serde(default = "default_attempts")]
        attempts: u32,
        /// Delay between attempts in milliseconds
        #[serde(default = "default_retry_delay", with = "duration_ms", rename = "delay_ms")]
        delay: Duration,
    },
}

impl ScanPolicy {
    pub fn attempts(&self) -> u32 {
        match self {
            ScanPolicy::Skip => 1,
            ScanPolicy::Retry { attempts, .. } => (*attempts).max(1),
        }
    }

    pub fn delay(&self) -> Duration {
        match self {
            ScanPolicy::Skip => Duration::ZERO,
            ScanPolicy::Retry { delay, .. } => *delay,
        }
    }
}

fn default_attempts() -> u32 {
    2
}

fn default_retry_delay() -> Duration {
    Duration::from_millis(2000)
}

/// Screenshot capture toggles
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScreenshotConfig {
    #[serde(default = "default_true")]
    pub full_page: bool,
    /// Capture each affected node that has a selector
    #[serde(default = "default_true")]
    pub elements: bool,
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            full_page: true,
            elements: true,
        }
    }
}

/// Extra outputs produced at the end of a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputConfig {
    /// Write `accessibility-results.json` next to the HTML reports
    #[serde(default = "default_true")]
    pub json: bool,
    /// Print the console summary
    #[serde(default = "default_true")]
    pub console: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json: true,
            console: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// A recorded rule-engine payload for one page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageSource {
    /// Page label used in file names and report headings
    pub label: String,
    /// Overrides the url recorded in the payload
    #[serde(default)]
    pub url: Option<String>,
    /// Path to the axe-core JSON result
    pub results: PathBuf,
}

/// Serde module for serializing/deserializing Duration as milliseconds
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
