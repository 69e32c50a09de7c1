//! # radnote
//!
//! Structured, radiology-style notes for medical images, produced by a
//! Gemini vision model. Educational use only; never a diagnosis.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image (path / URL / bytes)
//!  │
//!  ├─ 1. Intake    validate type, stage to a scratch temp file
//!  ├─ 2. Demo      demo mode short-circuits with a canned report
//!  ├─ 3. Resize    fixed width, aspect preserved (spawn_blocking)
//!  ├─ 4. Encode    PNG → base64 ImageData
//!  ├─ 5. VLM       Gemini call, exponential backoff on rate limits
//!  ├─ 6. History   newest-first record in the session
//!  └─ 7. Export    .md / .pdf downloads, bulk .txt
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use radnote::{require_api_key, resolve_upload, ModelCache, RunSettings, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     require_api_key()?;
//!     let mut session = Session::new(ModelCache::default());
//!     let upload = resolve_upload("chest_xray.png", 60).await?;
//!     let report = session.generate(&upload, &RunSettings::default()).await?;
//!     println!("{}", report.record.report);
//!     std::fs::write(report.file_name("pdf"), report.pdf_bytes()?)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `radnote` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## Models
//!
//! | Model | Notes |
//! |-------|-------|
//! | `gemini-flash-latest` | Default |
//! | `gemini-2.0-flash` | |
//! | `gemini-2.5-flash` | |
//! | `gemini-2.0-flash-exp` | Experimental |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod generate;
pub mod history;
pub mod model_cache;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{require_api_key, ModelId, RunSettings, RunSettingsBuilder};
pub use error::{ModelError, RadNoteError};
pub use generate::{generate_report, GeneratedReport, ReportStatus};
pub use history::{HistoryStore, ReportRecord};
pub use model_cache::{GeminiFactory, ModelCache, ModelFactory, ModelKey};
pub use pipeline::intake::{resolve_upload, ImageKind, UploadedImage};
pub use pipeline::llm::{GeminiVisionModel, VisionModel};
pub use progress::{GenerationProgressCallback, GenerationStage, NoopProgressCallback, ProgressCallback};
pub use session::{Session, SessionReport};
