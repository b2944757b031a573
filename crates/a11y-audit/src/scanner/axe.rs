//! axe-core rule engine driven over chromiumoxide
//!
//! [`AxeEngine`] evaluates `axe.run` inside a live [`Page`] through the
//! Chrome DevTools Protocol and hands the JSON result back to the
//! [`Scanner`](super::Scanner).
//!
//! # How it works
//!
//! 1. If the engine was built with an axe-core source, it is evaluated in the
//!    page unless `window.axe` is already defined
//! 2. `axe.run(document, options)` is awaited in the page and its result is
//!    serialized with `JSON.stringify` so that only a string crosses CDP
//! 3. The string is parsed into a [`RawScan`]
//!
//! Any CDP failure (navigation in flight, detached frame, axe missing) is
//! reported as [`AuditError::ScanUnavailable`].

use async_trait::async_trait;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use std::fs;
use std::path::Path;
use tracing::{debug, instrument, trace};

use super::{RawScan, ScanEngine, ScanOptions};
use crate::error::{AuditError, Result};

/// axe-core engine for chromiumoxide pages
#[derive(Debug, Clone, Default)]
pub struct AxeEngine {
    /// axe-core source evaluated before the first run on a page
    script: Option<String>,
}

impl AxeEngine {
    /// Engine that expects `window.axe` to already be present on the page
    pub fn new() -> Self {
        Self { script: None }
    }

    /// Engine that injects the given axe-core source when needed
    pub fn with_script(source: impl Into<String>) -> Self {
        Self {
            script: Some(source.into()),
        }
    }

    /// Load the axe-core source (usually `axe.min.js`) from disk
    pub fn from_script_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|e| {
            AuditError::Config(format!("Failed to read axe script {}: {}", path.display(), e))
        })?;
        Ok(Self::with_script(source))
    }

    pub fn has_script(&self) -> bool {
        self.script.is_some()
    }

    /// Make sure `window.axe` exists, injecting the bundled source if we have one
    #[instrument(skip(self, page))]
    async fn ensure_injected(&self, page: &Page) -> Result<()> {
        let present = evaluate_string(page, PRESENCE_PROBE).await?;
        if present == "true" {
            trace!("axe-core already present on page");
            return Ok(());
        }

        let Some(script) = &self.script else {
            return Err(AuditError::ScanUnavailable(
                "axe-core is not loaded on the page and no script was configured".to_string(),
            ));
        };

        debug!("Injecting axe-core ({} bytes)", script.len());
        page.evaluate(script.as_str())
            .await
            .map_err(|e| AuditError::ScanUnavailable(format!("Failed to inject axe-core: {}", e)))?;
        Ok(())
    }

    /// Expression that runs axe and resolves to its JSON-encoded result
    fn run_expression(options: &ScanOptions) -> String {
        format!(
            "(async () => JSON.stringify(await window.axe.run(document, {})))()",
            options.to_engine_options()
        )
    }
}

const PRESENCE_PROBE: &str = "String(typeof window.axe !== 'undefined')";

async fn evaluate_string(page: &Page, expression: &str) -> Result<String> {
    let params = EvaluateParams::builder()
        .expression(expression)
        .await_promise(true)
        .return_by_value(true)
        .build()
        .map_err(|e| {
            AuditError::ScanUnavailable(format!("Failed to build evaluate params: {}", e))
        })?;

    let evaluation = page
        .evaluate_expression(params)
        .await
        .map_err(|e| AuditError::ScanUnavailable(e.to_string()))?;

    evaluation
        .into_value::<String>()
        .map_err(|e| {
            AuditError::InvalidPayload(format!("Engine returned a non-string value: {}", e))
        })
}

#[async_trait]
impl ScanEngine for AxeEngine {
    type Page = Page;

    #[instrument(skip(self, page, options), fields(tags = ?options.tags))]
    async fn analyze(&self, page: &Page, options: &ScanOptions) -> Result<RawScan> {
        self.ensure_injected(page).await?;

        let expression = Self::run_expression(options);
        let payload = evaluate_string(page, &expression).await?;
        debug!("axe-core returned {} bytes", payload.len());

        RawScan::from_json(&payload)
    }
}
