//! Progress-callback trait for report-generation events.
//!
//! Inject an [`Arc<dyn GenerationProgressCallback>`] into a
//! [`crate::session::Session`] to observe each request as it moves through
//! its states. A front end uses this to drive a busy indicator while the
//! model call and its backoff sleeps are in flight.
//!
//! ```text
//! Idle → Uploading → DemoFallback
//!                  → Resizing → Invoking ⇄ Retrying → Completed | Failed
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// State of a single generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStage {
    Idle,
    Uploading,
    DemoFallback,
    Resizing,
    /// Model call in flight; `attempt` is 1-based.
    Invoking { attempt: u32 },
    /// Sleeping before the next attempt.
    Retrying { attempt: u32, delay: Duration },
    Completed,
    Failed,
}

impl GenerationStage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GenerationStage::DemoFallback | GenerationStage::Completed | GenerationStage::Failed
        )
    }
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationStage::Idle => f.write_str("idle"),
            GenerationStage::Uploading => f.write_str("uploading"),
            GenerationStage::DemoFallback => f.write_str("demo report"),
            GenerationStage::Resizing => f.write_str("resizing"),
            GenerationStage::Invoking { attempt } => write!(f, "analyzing (attempt {attempt})"),
            GenerationStage::Retrying { attempt, delay } => {
                write!(f, "rate limited, retry {attempt} in {:.0}s", delay.as_secs_f64())
            }
            GenerationStage::Completed => f.write_str("completed"),
            GenerationStage::Failed => f.write_str("failed"),
        }
    }
}

/// Called by the pipeline as a request changes state.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait GenerationProgressCallback: Send + Sync {
    /// Called on every state transition, in order.
    fn on_stage(&self, stage: GenerationStage) {
        let _ = stage;
    }

    /// Called when a model attempt fails, before deciding whether to retry.
    ///
    /// # Arguments
    /// * `attempt`   — 1-based attempt number that failed
    /// * `error`     — provider error text
    /// * `will_retry` — whether another attempt follows
    fn on_attempt_failed(&self, attempt: u32, error: &str, will_retry: bool) {
        let _ = (attempt, error, will_retry);
    }
}

/// A no-op implementation for when no callback is needed.
pub struct NoopProgressCallback;

impl GenerationProgressCallback for NoopProgressCallback {}

/// Type alias for the shared callback handle.
pub type ProgressCallback = Arc<dyn GenerationProgressCallback>;
