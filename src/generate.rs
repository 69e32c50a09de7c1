//! Single-request report generation.
//!
//! One call walks the request state machine from upload to a displayable
//! report:
//!
//! ```text
//! Idle → Uploading ─┬─ demo ──▶ DemoFallback
//!                   └─ Resizing → Invoking ⇄ Retrying → Completed | Failed
//! ```
//!
//! Model failures never surface as `Err`: they become a `Failed` report whose
//! text starts with [`crate::pipeline::llm::ERROR_REPORT_PREFIX`]. Only
//! intake problems (bad type, corrupt data, file system) and provider
//! construction failures abort the request.

use crate::config::RunSettings;
use crate::error::RadNoteError;
use crate::model_cache::{ModelCache, ModelKey};
use crate::pipeline::{encode, intake, llm};
use crate::progress::{GenerationProgressCallback, GenerationStage};
use crate::prompts::{build_prompt, demo_report};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How a report came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    /// The model answered.
    Completed,
    /// The model could not answer; the text is an error report.
    Failed,
    /// Demo mode; the text is the canned example report.
    Demo,
}

/// The outcome of one generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedReport {
    pub text: String,
    pub status: ReportStatus,
    /// Model calls made (0 in demo mode).
    pub attempts: u32,
    /// Time spent in retry backoff.
    pub total_backoff: Duration,
}

fn notify(progress: Option<&dyn GenerationProgressCallback>, stage: GenerationStage) {
    debug!("stage: {}", stage);
    if let Some(cb) = progress {
        cb.on_stage(stage);
    }
}

/// Produce a report for `upload` under `settings`.
///
/// Temporary files are created in `scratch_dir` and are gone by the time
/// this returns, whatever the outcome. Every request that gets past
/// settings validation ends in exactly one terminal stage, `Failed`
/// included when an error is returned.
///
/// Demo mode ignores the retry and width settings and always yields the
/// demo report for a valid upload.
///
/// # Errors
/// - invalid `settings` (outside demo mode)
/// - the upload cannot be staged, decoded or read back
/// - the model handle cannot be built (demo mode never builds one)
pub async fn generate_report(
    upload: &intake::UploadedImage,
    settings: &RunSettings,
    models: &mut ModelCache,
    scratch_dir: &Path,
    progress: Option<&dyn GenerationProgressCallback>,
) -> Result<GeneratedReport, RadNoteError> {
    if !settings.demo_mode {
        settings.validate()?;
    }
    notify(progress, GenerationStage::Idle);

    let result = run_request(upload, settings, models, scratch_dir, progress).await;
    if let Err(e) = &result {
        warn!("Request aborted: {}", e);
        notify(progress, GenerationStage::Failed);
    }
    result
}

async fn run_request(
    upload: &intake::UploadedImage,
    settings: &RunSettings,
    models: &mut ModelCache,
    scratch_dir: &Path,
    progress: Option<&dyn GenerationProgressCallback>,
) -> Result<GeneratedReport, RadNoteError> {
    let start = Instant::now();
    info!(
        "Generating report for {} ({})",
        upload.name.as_deref().unwrap_or("upload"),
        upload.kind.mime_type()
    );

    // ── Step 1: Stage upload ─────────────────────────────────────────────
    notify(progress, GenerationStage::Uploading);
    let staged = intake::stage_upload(upload, scratch_dir)?;

    // ── Step 2: Demo fallback ────────────────────────────────────────────
    if settings.demo_mode {
        notify(progress, GenerationStage::DemoFallback);
        info!("Demo mode: returning example report");
        return Ok(GeneratedReport {
            text: demo_report(),
            status: ReportStatus::Demo,
            attempts: 0,
            total_backoff: Duration::ZERO,
        });
    }

    // ── Step 3: Model handle + prompt ────────────────────────────────────
    let model = models.get_or_create(ModelKey {
        model: settings.model,
        web_enabled: settings.web_enabled,
    })?;
    let prompt = build_prompt(settings.web_enabled);

    // ── Step 4: Resize + encode ──────────────────────────────────────────
    // Encoded once, before any model call, so file-system failures abort
    // the request instead of becoming report text.
    notify(progress, GenerationStage::Resizing);
    let resized = intake::resize_image(staged.path(), settings.resize_width, scratch_dir).await?;
    drop(staged);
    let image = encode::encode_image_file(resized.path(), "image/png").await?;
    drop(resized);

    // ── Step 5: Invoke with retry ────────────────────────────────────────
    let outcome = llm::run_with_retry(
        model.as_ref(),
        &prompt,
        &image,
        settings.max_retries,
        Duration::from_millis(settings.retry_backoff_ms),
        progress,
    )
    .await;

    let status = if outcome.result.is_ok() {
        ReportStatus::Completed
    } else {
        ReportStatus::Failed
    };
    notify(
        progress,
        match status {
            ReportStatus::Completed => GenerationStage::Completed,
            _ => GenerationStage::Failed,
        },
    );

    info!(
        "Report {:?} after {} attempt(s), {}ms total",
        status,
        outcome.attempts,
        start.elapsed().as_millis()
    );

    let attempts = outcome.attempts;
    let total_backoff = outcome.total_backoff;
    Ok(GeneratedReport {
        text: outcome.into_report_text(),
        status,
        attempts,
        total_backoff,
    })
}
