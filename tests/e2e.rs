//! End-to-end tests against the live Gemini API.
//!
//! Gated behind `E2E_ENABLED` (and a `GOOGLE_API_KEY`/`GEMINI_API_KEY`) so
//! they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 GOOGLE_API_KEY=... cargo test --test e2e -- --nocapture

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use radnote::config::{PROVIDER_KEY_ENV, API_KEY_ENV};
use radnote::pipeline::llm::ERROR_REPORT_PREFIX;
use radnote::{require_api_key, ModelCache, ModelId, ReportStatus, RunSettings, Session, UploadedImage};
use std::io::Cursor;

/// Skip this test unless E2E_ENABLED is set and a key is available.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        match require_api_key() {
            Ok(key) => {
                if std::env::var_os(PROVIDER_KEY_ENV).is_none() {
                    std::env::set_var(PROVIDER_KEY_ENV, key);
                }
            }
            Err(_) => {
                println!("SKIP — {} not set", API_KEY_ENV);
                return;
            }
        }
    }};
}

/// A synthetic grey square with a bright disc, standing in for a scan.
fn phantom_png() -> Vec<u8> {
    let img = RgbImage::from_fn(512, 512, |x, y| {
        let (dx, dy) = (x as i32 - 256, y as i32 - 256);
        if dx * dx + dy * dy < 80 * 80 {
            Rgb([220, 220, 220])
        } else {
            Rgb([30, 30, 30])
        }
    });
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

#[tokio::test]
async fn test_live_report() {
    e2e_skip_unless_ready!();

    let scratch = tempfile::tempdir().unwrap();
    let mut session = Session::new(ModelCache::default()).with_scratch_dir(scratch.path());
    let upload = UploadedImage::new(phantom_png(), "image/png").unwrap();
    let settings = RunSettings::builder()
        .model(ModelId::Gemini20Flash)
        .build()
        .unwrap();

    let out = session.generate(&upload, &settings).await.unwrap();
    println!("{}", out.record.report);

    match out.generated.status {
        ReportStatus::Completed => assert!(!out.record.report.trim().is_empty()),
        ReportStatus::Failed => assert!(out.record.report.starts_with(ERROR_REPORT_PREFIX)),
        ReportStatus::Demo => panic!("demo mode was not requested"),
    }
    assert!(std::fs::read_dir(scratch.path()).unwrap().next().is_none());
    assert!(!out.pdf_bytes().unwrap().is_empty());
}
