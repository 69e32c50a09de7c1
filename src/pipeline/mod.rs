//! Pipeline stages for turning an uploaded image into a model report.
//!
//! ## Data Flow
//!
//! ```text
//! intake ──▶ encode ──▶ llm
//! (stage/resize) (base64) (VLM + retry)
//! ```
//!
//! 1. [`intake`] — validate the declared type, stage the bytes to a temp
//!    file, resize to the requested width in `spawn_blocking`
//! 2. [`encode`] — base64-wrap the resized PNG for the multimodal request
//! 3. [`llm`]    — drive the model call with rate-limit backoff; the only
//!    stage with model network I/O

pub mod encode;
pub mod intake;
pub mod llm;
