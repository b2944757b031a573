//! JSON reporter for audit runs

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::AggregatedReport;
use crate::model::ScanResult;

/// Machine-readable export of a whole run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunExport {
    pub project: String,
    pub generated_at: DateTime<Utc>,
    pub summary: AggregatedReport,
    pub pages: Vec<ScanResult>,
}

/// JSON format reporter
pub struct JsonReporter;

impl JsonReporter {
    /// Format a run as JSON
    ///
    /// # Arguments
    ///
    /// * `export` - The run to format
    /// * `pretty` - Whether to pretty-print the JSON
    pub fn format(export: &RunExport, pretty: bool) -> Result<String> {
        let output = if pretty {
            serde_json::to_string_pretty(export)?
        } else {
            serde_json::to_string(export)?
        };
        Ok(output)
    }
}
