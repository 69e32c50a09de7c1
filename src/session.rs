//! One interactive session: history, model handles and scratch space.
//!
//! A front end keeps exactly one [`Session`] per user. Requests are handled
//! one at a time through `&mut self`, so the history needs no locking, and
//! separate sessions never share a [`HistoryStore`].

use crate::config::RunSettings;
use crate::error::RadNoteError;
use crate::export;
use crate::generate::{generate_report, GeneratedReport};
use crate::history::{HistoryStore, ReportRecord};
use crate::model_cache::ModelCache;
use crate::pipeline::intake::UploadedImage;
use crate::progress::ProgressCallback;
use crate::prompts::APP_TITLE;
use chrono::Local;
use std::path::{Path, PathBuf};

/// A finished request: the recorded entry plus how it was produced.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub record: ReportRecord,
    pub generated: GeneratedReport,
}

impl SessionReport {
    /// Raw report text for the `.md` download.
    pub fn markdown_bytes(&self) -> Vec<u8> {
        export::to_markdown_bytes(&self.record.report)
    }

    /// Paginated rendering for the `.pdf` download.
    pub fn pdf_bytes(&self) -> Result<Vec<u8>, RadNoteError> {
        export::to_pdf_bytes(APP_TITLE, &self.record.report)
    }

    /// `medical_report_<timestamp>.<ext>` for this report.
    pub fn file_name(&self, ext: &str) -> String {
        export::report_file_name(&self.record.timestamp, ext)
    }
}

pub struct Session {
    history: HistoryStore,
    models: ModelCache,
    scratch_dir: PathBuf,
    progress: Option<ProgressCallback>,
}

impl Session {
    /// New session using the system temp directory for scratch files.
    pub fn new(models: ModelCache) -> Self {
        Self {
            history: HistoryStore::new(),
            models,
            scratch_dir: std::env::temp_dir(),
            progress: None,
        }
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    pub fn with_progress(mut self, cb: ProgressCallback) -> Self {
        self.progress = Some(cb);
        self
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Generate a report and record it at the front of the history.
    ///
    /// Errors (bad upload, provider construction) leave the history untouched.
    pub async fn generate(
        &mut self,
        upload: &UploadedImage,
        settings: &RunSettings,
    ) -> Result<SessionReport, RadNoteError> {
        let generated = generate_report(
            upload,
            settings,
            &mut self.models,
            &self.scratch_dir,
            self.progress.as_deref(),
        )
        .await?;

        let record = ReportRecord::new(settings, generated.text.clone(), Local::now());
        self.history.record(record.clone());
        Ok(SessionReport { record, generated })
    }

    /// Blocking wrapper around [`Session::generate`].
    ///
    /// Creates a temporary tokio runtime internally; do not call from async
    /// code.
    pub fn generate_blocking(
        &mut self,
        upload: &UploadedImage,
        settings: &RunSettings,
    ) -> Result<SessionReport, RadNoteError> {
        tokio::runtime::Runtime::new()
            .map_err(|e| RadNoteError::Internal(format!("Failed to create tokio runtime: {}", e)))?
            .block_on(self.generate(upload, settings))
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Bulk `.txt` export of every recorded report.
    pub fn export_all_text(&self) -> Vec<u8> {
        self.history.export_all_text()
    }
}
