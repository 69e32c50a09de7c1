//! Image intake: validate an upload, stage it on disk, resize it.
//!
//! ## Why temp files?
//!
//! The upload and its resized copy are written under random names in a
//! scratch directory so that concurrent sessions sharing that directory never
//! collide. Both are held as [`NamedTempFile`] guards: the files are removed
//! when the guard is dropped, on the success path, on `?` early returns and
//! during unwinding alike, so a request can never leak them.

use crate::error::RadNoteError;
use image::{imageops::FilterType, ImageFormat, ImageReader};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Accepted upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Bmp,
}

impl ImageKind {
    /// Parse a declared type: a MIME type (`image/png`) or an extension
    /// (`png`, `.JPG`).
    pub fn from_declared(declared: &str) -> Result<Self, RadNoteError> {
        let d = declared.trim().to_ascii_lowercase();
        let ext = d.rsplit('/').next().unwrap_or(&d).trim_start_matches('.');
        match ext {
            "png" => Ok(ImageKind::Png),
            "jpg" | "jpeg" | "pjpeg" => Ok(ImageKind::Jpeg),
            "bmp" | "x-ms-bmp" => Ok(ImageKind::Bmp),
            _ => Err(RadNoteError::UnsupportedImageType {
                declared: declared.to_string(),
            }),
        }
    }

    /// Guess from a file name's extension.
    pub fn from_path(path: &Path) -> Result<Self, RadNoteError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_declared(ext).map_err(|_| RadNoteError::UnsupportedImageType {
            declared: path.display().to_string(),
        })
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpeg",
            ImageKind::Bmp => "bmp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Bmp => "image/bmp",
        }
    }
}

/// An uploaded image held in memory until a request stages it.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub kind: ImageKind,
    /// Where the upload came from (file name or URL), for display only.
    pub name: Option<String>,
}

impl UploadedImage {
    /// Wrap raw bytes, validating the declared type.
    pub fn new(bytes: Vec<u8>, declared_type: &str) -> Result<Self, RadNoteError> {
        Ok(Self {
            bytes,
            kind: ImageKind::from_declared(declared_type)?,
            name: None,
        })
    }
}

/// A resized copy of the upload, deleted when dropped.
#[derive(Debug)]
pub struct ResizedImage {
    file: NamedTempFile,
    pub width: u32,
    pub height: u32,
}

impl ResizedImage {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load an upload from a local path or download it from a URL.
pub async fn resolve_upload(input: &str, timeout_secs: u64) -> Result<UploadedImage, RadNoteError> {
    if is_url(input) {
        fetch_upload(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

async fn read_local(path_str: &str) -> Result<UploadedImage, RadNoteError> {
    let path = PathBuf::from(path_str);
    let kind = ImageKind::from_path(&path)?;

    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => RadNoteError::FileNotFound { path: path.clone() },
        _ => RadNoteError::io(format!("Failed to read '{}'", path.display()), e),
    })?;

    debug!("Read local image {} ({} bytes)", path.display(), bytes.len());
    Ok(UploadedImage {
        bytes,
        kind,
        name: Some(path_str.to_string()),
    })
}

/// Download an image from an HTTP/HTTPS URL.
///
/// The type comes from the `Content-Type` header, falling back to the URL's
/// extension when the server sends something generic.
pub async fn fetch_upload(url: &str, timeout_secs: u64) -> Result<UploadedImage, RadNoteError> {
    info!("Downloading image from: {}", url);

    let parsed = reqwest::Url::parse(url).map_err(|_| RadNoteError::InvalidInput {
        input: url.to_string(),
    })?;

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| RadNoteError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(parsed.clone()).send().await.map_err(|e| {
        if e.is_timeout() {
            RadNoteError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            RadNoteError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(RadNoteError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());

    let kind = match content_type.as_deref().map(ImageKind::from_declared) {
        Some(Ok(kind)) => kind,
        _ => ImageKind::from_path(Path::new(parsed.path()))?,
    };

    let bytes = response
        .bytes()
        .await
        .map_err(|e| RadNoteError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes ({})", bytes.len(), kind.mime_type());
    Ok(UploadedImage {
        bytes: bytes.to_vec(),
        kind,
        name: Some(url.to_string()),
    })
}

/// Write the raw upload to `upload_<random>.<ext>` in `scratch_dir`.
pub fn stage_upload(upload: &UploadedImage, scratch_dir: &Path) -> Result<NamedTempFile, RadNoteError> {
    use std::io::Write;

    let suffix = format!(".{}", upload.kind.extension());
    let mut file = tempfile::Builder::new()
        .prefix("upload_")
        .suffix(&suffix)
        .tempfile_in(scratch_dir)
        .map_err(|e| RadNoteError::io("Failed to create upload temp file", e))?;

    file.write_all(&upload.bytes)
        .and_then(|_| file.flush())
        .map_err(|e| RadNoteError::io("Failed to write upload temp file", e))?;

    debug!("Staged upload at {}", file.path().display());
    Ok(file)
}

/// Size of the resized image for a target width, preserving aspect ratio.
///
/// A zero-height source falls back to an aspect ratio of 1.0. The height is
/// rounded and never drops below one pixel.
pub fn target_dimensions(orig_width: u32, orig_height: u32, target_width: u32) -> (u32, u32) {
    let aspect = if orig_height == 0 {
        1.0
    } else {
        orig_width as f64 / orig_height as f64
    };
    let height = if aspect > 0.0 {
        (target_width as f64 / aspect).round()
    } else {
        target_width as f64
    };
    (target_width, (height as u32).max(1))
}

/// Decode `source`, resize it to `target_width` and save it as
/// `temp_<random>.png` in `scratch_dir`.
///
/// CPU-bound; use [`resize_image`] from async code.
pub fn resize_to_width(
    source: &Path,
    target_width: u32,
    scratch_dir: &Path,
) -> Result<ResizedImage, RadNoteError> {
    let decode_err = |detail: String| RadNoteError::ImageDecode { detail };

    let img = ImageReader::open(source)
        .map_err(|e| RadNoteError::io(format!("Failed to open '{}'", source.display()), e))?
        .with_guessed_format()
        .map_err(|e| RadNoteError::io(format!("Failed to read '{}'", source.display()), e))?
        .decode()
        .map_err(|e| decode_err(e.to_string()))?;

    let (width, height) = target_dimensions(img.width(), img.height(), target_width);
    let resized = img.resize_exact(width, height, FilterType::CatmullRom);

    let mut file = tempfile::Builder::new()
        .prefix("temp_")
        .suffix(".png")
        .tempfile_in(scratch_dir)
        .map_err(|e| RadNoteError::io("Failed to create resized temp file", e))?;

    resized
        .write_to(file.as_file_mut(), ImageFormat::Png)
        .map_err(|e| RadNoteError::Internal(format!("Failed to save resized image: {e}")))?;

    debug!(
        "Resized {}x{} → {}x{} at {}",
        img.width(),
        img.height(),
        width,
        height,
        file.path().display()
    );

    Ok(ResizedImage {
        file,
        width,
        height,
    })
}

/// Run [`resize_to_width`] on the blocking thread pool.
pub async fn resize_image(
    source: &Path,
    target_width: u32,
    scratch_dir: &Path,
) -> Result<ResizedImage, RadNoteError> {
    let source = source.to_path_buf();
    let scratch = scratch_dir.to_path_buf();

    tokio::task::spawn_blocking(move || resize_to_width(&source, target_width, &scratch))
        .await
        .map_err(|e| RadNoteError::Internal(format!("Resize task panicked: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([40, 40, 40])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    fn dir_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/xray.png"));
        assert!(is_url("http://example.com/xray.png"));
        assert!(!is_url("/tmp/xray.png"));
        assert!(!is_url("xray.png"));
        assert!(!is_url(""));
    }

    #[test]
    fn declared_types() {
        assert_eq!(ImageKind::from_declared("image/png").unwrap(), ImageKind::Png);
        assert_eq!(ImageKind::from_declared("image/jpeg").unwrap(), ImageKind::Jpeg);
        assert_eq!(ImageKind::from_declared("JPG").unwrap(), ImageKind::Jpeg);
        assert_eq!(ImageKind::from_declared(".bmp").unwrap(), ImageKind::Bmp);
        assert!(ImageKind::from_declared("image/gif").is_err());
        assert!(ImageKind::from_declared("application/pdf").is_err());
    }

    #[test]
    fn kind_from_path() {
        assert_eq!(ImageKind::from_path(Path::new("a/b/chest.JPEG")).unwrap(), ImageKind::Jpeg);
        assert!(ImageKind::from_path(Path::new("scan.dcm")).is_err());
        assert!(ImageKind::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn dimensions_preserve_aspect() {
        assert_eq!(target_dimensions(1200, 800, 640), (640, 427));
        assert_eq!(target_dimensions(800, 1200, 640), (640, 960));
        assert_eq!(target_dimensions(1000, 1000, 320), (320, 320));
        // 640 * 3 / 7 = 274.28…
        assert_eq!(target_dimensions(700, 300, 640), (640, 274));
    }

    #[test]
    fn dimensions_match_rounded_formula() {
        for &(w, h) in &[(1u32, 1u32), (3, 2), (1920, 1080), (517, 1033), (4000, 3)] {
            for target in (320..=900).step_by(10) {
                let expected = ((target as f64 * h as f64 / w as f64).round() as u32).max(1);
                assert_eq!(target_dimensions(w, h, target), (target, expected), "{w}x{h} → {target}");
            }
        }
    }

    #[test]
    fn zero_height_defaults_to_square() {
        assert_eq!(target_dimensions(1200, 0, 640), (640, 640));
    }

    #[test]
    fn stage_and_resize_clean_up_on_drop() {
        let scratch = tempfile::tempdir().unwrap();
        let upload = UploadedImage::new(png_bytes(120, 80), "image/png").unwrap();

        {
            let staged = stage_upload(&upload, scratch.path()).unwrap();
            let name = staged.path().file_name().unwrap().to_string_lossy().to_string();
            assert!(name.starts_with("upload_") && name.ends_with(".png"), "got {name}");

            let resized = resize_to_width(staged.path(), 320, scratch.path()).unwrap();
            assert_eq!((resized.width, resized.height), (320, 213));
            let on_disk = image::open(resized.path()).unwrap();
            assert_eq!((on_disk.width(), on_disk.height()), (320, 213));
            assert!(resized
                .path()
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("temp_"));
        }

        assert!(dir_is_empty(scratch.path()));
    }

    #[test]
    fn corrupt_upload_is_a_decode_error() {
        let scratch = tempfile::tempdir().unwrap();
        let upload = UploadedImage::new(b"definitely not a png".to_vec(), "png").unwrap();
        let staged = stage_upload(&upload, scratch.path()).unwrap();

        let err = resize_to_width(staged.path(), 640, scratch.path()).unwrap_err();
        assert!(matches!(err, RadNoteError::ImageDecode { .. }), "got {err:?}");

        drop(staged);
        assert!(dir_is_empty(scratch.path()));
    }

    #[test]
    fn unique_names_per_stage() {
        let scratch = tempfile::tempdir().unwrap();
        let upload = UploadedImage::new(png_bytes(4, 4), "png").unwrap();
        let a = stage_upload(&upload, scratch.path()).unwrap();
        let b = stage_upload(&upload, scratch.path()).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[tokio::test]
    async fn missing_local_file() {
        let err = resolve_upload("/definitely/not/here.png", 5).await.unwrap_err();
        assert!(matches!(err, RadNoteError::FileNotFound { .. }), "got {err:?}");
    }
}
