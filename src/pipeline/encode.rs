//! Image encoding: resized PNG file → base64 `ImageData`.
//!
//! Gemini accepts images as base64 payloads embedded in the JSON request
//! body. The resized copy is already a PNG, so its bytes are sent as-is.

use crate::error::RadNoteError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use std::path::Path;
use tracing::debug;

/// Read an image file and wrap it for a vision request.
pub async fn encode_image_file(path: &Path, mime_type: &str) -> Result<ImageData, RadNoteError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| RadNoteError::io(format!("Failed to read '{}'", path.display()), e))?;

    Ok(encode_bytes(&bytes, mime_type))
}

/// Base64-encode image bytes. `detail: "high"` keeps fine structure visible
/// to providers that tile images.
pub fn encode_bytes(bytes: &[u8], mime_type: &str) -> ImageData {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded image → {} bytes base64", b64.len());

    ImageData::new(b64, mime_type).with_detail("high")
}
