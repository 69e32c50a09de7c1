//! Per-session report history.
//!
//! Newest first, unbounded, never persisted. Each [`crate::session::Session`]
//! owns its own store so history cannot leak between sessions.

use crate::config::{ModelId, RunSettings};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::VecDeque;

/// How many records a history view shows.
pub const DISPLAY_LIMIT: usize = 10;

/// Separator between reports in the bulk text export.
pub const BULK_SEPARATOR: &str = "\n\n---\n\n";

/// File name of the bulk text export.
pub const BULK_FILE_NAME: &str = "all_reports.txt";

/// One generated report and the settings it was produced with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRecord {
    #[serde(with = "display_time")]
    pub timestamp: DateTime<Local>,
    pub model: ModelId,
    pub web_enabled: bool,
    pub demo_enabled: bool,
    pub report: String,
}

impl ReportRecord {
    pub fn new(settings: &RunSettings, report: String, timestamp: DateTime<Local>) -> Self {
        Self {
            timestamp,
            model: settings.model,
            web_enabled: settings.web_enabled,
            demo_enabled: settings.demo_mode,
            report,
        }
    }

    /// `YYYY-MM-DD HH:MM:SS`, as shown in history listings.
    pub fn display_time(&self) -> String {
        self.timestamp.format(display_time::FORMAT).to_string()
    }

    /// One-line summary for the `index`-th (1-based) entry of a listing.
    pub fn summary(&self, index: usize) -> String {
        format!(
            "#{} • {} • model={} • demo={}",
            index,
            self.display_time(),
            self.model,
            self.demo_enabled
        )
    }
}

mod display_time {
    use chrono::{DateTime, Local};
    use serde::Serializer;

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(ts: &DateTime<Local>, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&ts.format(FORMAT))
    }
}

/// Most-recent-first list of reports for one session.
#[derive(Debug, Default, Clone)]
pub struct HistoryStore {
    records: VecDeque<ReportRecord>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the front.
    pub fn record(&mut self, entry: ReportRecord) {
        self.records.push_front(entry);
    }

    /// The first `limit` records, newest first.
    pub fn list(&self, limit: usize) -> Vec<&ReportRecord> {
        self.records.iter().take(limit).collect()
    }

    /// Remove every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All report texts, newest first, joined by [`BULK_SEPARATOR`].
    pub fn export_all_text(&self) -> Vec<u8> {
        self.records
            .iter()
            .map(|r| r.report.as_str())
            .collect::<Vec<_>>()
            .join(BULK_SEPARATOR)
            .into_bytes()
    }
}
