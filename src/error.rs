//! Error types for the radnote library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`RadNoteError`] — the request (or the whole program) cannot proceed:
//!   missing credential, unsupported upload, corrupt image, file-system
//!   failure. Returned as `Err(RadNoteError)` from the pipeline entry points.
//!
//! * [`ModelError`] — a single call to the vision model failed. These never
//!   escape the generator: they are either retried (rate limits) or turned
//!   into an error report that is displayed and recorded like any other
//!   report, so a flaky provider never ends the session.

use std::path::PathBuf;
use thiserror::Error;

/// Substrings that mark a model failure as a rate limit ("try later").
///
/// Matching is done on the error's `Display` text, case-sensitive.
pub const RATE_LIMIT_MARKERS: [&str; 3] = ["429", "RESOURCE_EXHAUSTED", "RATE_LIMIT"];

/// All errors returned by the radnote library.
#[derive(Debug, Error)]
pub enum RadNoteError {
    // ── Startup errors ────────────────────────────────────────────────────
    /// The model-provider credential is not present in the environment.
    #[error("{var} environment variable is not set. Set it and re-run.")]
    MissingCredential { var: String },

    /// Settings validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The model provider could not be constructed.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Intake errors ─────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The input string is not a file path or a valid URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// Declared type is not one of the accepted image formats.
    #[error("Unsupported image type '{declared}' (expected png, jpg, jpeg or bmp)")]
    UnsupportedImageType { declared: String },

    /// The uploaded bytes could not be decoded as an image.
    #[error("Could not decode image: {detail}")]
    ImageDecode { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Temp-file creation, write, resize output or cleanup failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // ── Export errors ─────────────────────────────────────────────────────
    /// The PDF document could not be assembled or serialised.
    #[error("PDF export failed: {0}")]
    PdfExport(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RadNoteError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        RadNoteError::Io {
            context: context.into(),
            source,
        }
    }
}

/// A failed call to the vision model.
///
/// The message is kept verbatim from the provider so retry classification
/// can look for status codes and provider error names in it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ModelError {
    pub message: String,
}

impl ModelError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// True when the message carries one of [`RATE_LIMIT_MARKERS`].
    pub fn is_rate_limited(&self) -> bool {
        let msg = self.to_string();
        RATE_LIMIT_MARKERS.iter().any(|m| msg.contains(m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credential_display() {
        let e = RadNoteError::MissingCredential {
            var: "GOOGLE_API_KEY".into(),
        };
        assert!(e.to_string().starts_with("GOOGLE_API_KEY environment variable is not set"));
    }

    #[test]
    fn rate_limit_markers_detected() {
        assert!(ModelError::new("HTTP 429 Too Many Requests").is_rate_limited());
        assert!(ModelError::new("status: RESOURCE_EXHAUSTED").is_rate_limited());
        assert!(ModelError::new("RATE_LIMIT reached for project").is_rate_limited());
    }

    #[test]
    fn other_errors_are_not_rate_limits() {
        assert!(!ModelError::new("connection timed out").is_rate_limited());
        assert!(!ModelError::new("401 Unauthorized").is_rate_limited());
        // case-sensitive, like the provider error names it matches
        assert!(!ModelError::new("rate_limit").is_rate_limited());
    }

    #[test]
    fn io_error_keeps_context() {
        let e = RadNoteError::io(
            "Failed to write upload",
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        );
        let msg = e.to_string();
        assert!(msg.contains("Failed to write upload"), "got: {msg}");
        assert!(msg.contains("disk full"), "got: {msg}");
    }
}
