//! CLI binary for radnote.
//!
//! A thin shim over the library crate: maps flags to `RunSettings`, runs one
//! session over every image given, and writes the downloads to disk.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use radnote::config::{API_KEY_ENV, PROVIDER_KEY_ENV};
use radnote::history::{BULK_FILE_NAME, DISPLAY_LIMIT};
use radnote::prompts::{APP_SUBTITLE, APP_TITLE};
use radnote::{
    require_api_key, resolve_upload, GenerationProgressCallback, GenerationStage, ModelCache,
    ModelId, ProgressCallback, ReportStatus, RunSettings, Session,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner per request, replaced when the next request starts.
struct CliProgressCallback {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
        })
    }

    fn spinner() -> ProgressBar {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Report");
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_stage(&self, stage: GenerationStage) {
        let Ok(mut slot) = self.bar.lock() else {
            return;
        };
        if stage == GenerationStage::Idle {
            if let Some(old) = slot.take() {
                old.finish_and_clear();
            }
            *slot = Some(Self::spinner());
        }
        if let Some(bar) = slot.as_ref() {
            bar.set_message(stage.to_string());
            if stage.is_terminal() {
                bar.finish_and_clear();
            }
        }
    }

    fn on_attempt_failed(&self, attempt: u32, error: &str, will_retry: bool) {
        let Ok(slot) = self.bar.lock() else {
            return;
        };
        // Truncate very long provider errors to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        let line = format!(
            "  {} attempt {}  {}{}",
            if will_retry { cyan("↻") } else { red("✗") },
            attempt,
            red(&msg),
            if will_retry { dim("  (retrying)") } else { String::new() },
        );
        match slot.as_ref() {
            Some(bar) => bar.println(line),
            None => eprintln!("{line}"),
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One report, written as .md and .pdf to the current directory
  radnote chest_xray.png

  # Several images, a different model, web context notes
  radnote --model gemini-2.5-flash --web scan1.jpg scan2.bmp

  # Image from a URL, reports into ./reports, Markdown only
  radnote --out-dir reports --no-pdf https://example.org/ct_slice.png

  # Offline walkthrough with the canned example report
  radnote --demo scan.png

  # Bulk text export plus JSON history on stdout
  radnote --all-reports --json a.png b.png > history.json

MODELS:
  gemini-flash-latest (default), gemini-2.0-flash, gemini-2.5-flash,
  gemini-2.0-flash-exp

ENVIRONMENT VARIABLES:
  GOOGLE_API_KEY          Google Gemini API key (required)
  GEMINI_API_KEY          Accepted when GOOGLE_API_KEY is unset
  RADNOTE_MODEL           Default for --model
  RUST_LOG                Override log filter (e.g. radnote=debug)

DISCLAIMER:
  Educational use only. Output is not a diagnosis; always consult a
  qualified clinician.
"#;

/// Generate structured radiology-style notes for medical images.
#[derive(Parser, Debug)]
#[command(
    name = "radnote",
    version,
    about = "Generate structured radiology-style notes for medical images (educational only)",
    long_about = "Send medical images (PNG, JPEG, BMP; local files or URLs) to a Google Gemini \
vision model and receive a structured, radiology-style report with findings, an assessment, \
and a patient-friendly explanation. Reports are written as Markdown and PDF downloads.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local image paths or HTTP/HTTPS URLs (png, jpg, jpeg, bmp).
    #[arg(required = true)]
    images: Vec<String>,

    /// Gemini model to use.
    #[arg(long, env = "RADNOTE_MODEL", value_enum, default_value = "gemini-flash-latest")]
    model: ModelId,

    /// Return the canned example report instead of calling the model.
    #[arg(long, env = "RADNOTE_DEMO")]
    demo: bool,

    /// Ask for a references section alongside the report.
    #[arg(long, env = "RADNOTE_WEB")]
    web: bool,

    /// Retries after a rate-limit error (0–5).
    #[arg(long, env = "RADNOTE_MAX_RETRIES", default_value_t = 3,
          value_parser = clap::value_parser!(u32).range(0..=5))]
    max_retries: u32,

    /// Resize width in pixels (320–900, multiple of 10).
    #[arg(long, env = "RADNOTE_RESIZE_WIDTH", default_value_t = 640,
          value_parser = clap::value_parser!(u32).range(320..=900))]
    resize_width: u32,

    /// Directory the report downloads are written to.
    #[arg(short, long, env = "RADNOTE_OUT_DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Skip the PDF download; write Markdown only.
    #[arg(long, env = "RADNOTE_NO_PDF")]
    no_pdf: bool,

    /// Also write every report of this run to all_reports.txt.
    #[arg(long, env = "RADNOTE_ALL_REPORTS")]
    all_reports: bool,

    /// Print the session history as JSON instead of report text.
    #[arg(long, env = "RADNOTE_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "RADNOTE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "RADNOTE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "RADNOTE_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "RADNOTE_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner carries the feedback while it is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Credential check ─────────────────────────────────────────────────
    // Fatal before any work, demo mode included.
    let key = require_api_key().with_context(|| {
        format!("{API_KEY_ENV} is not set. Export it (export {API_KEY_ENV}=...) and try again")
    })?;
    // The provider factory reads the Gemini variable.
    if std::env::var_os(PROVIDER_KEY_ENV).is_none() {
        std::env::set_var(PROVIDER_KEY_ENV, key);
    }

    if !cli.quiet && !cli.json {
        eprintln!("{}  {}", bold(APP_TITLE), dim(APP_SUBTITLE));
    }

    // ── Build settings ───────────────────────────────────────────────────
    let settings = build_settings(&cli)?;

    tokio::fs::create_dir_all(&cli.out_dir)
        .await
        .with_context(|| format!("Failed to create output directory {:?}", cli.out_dir))?;

    let mut session = Session::new(ModelCache::default());
    if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new();
        session = session.with_progress(cb);
    }

    // ── Generate ─────────────────────────────────────────────────────────
    let total = cli.images.len();
    let mut failed = 0usize;
    for input in &cli.images {
        match process_one(&cli, &mut session, &settings, input).await {
            Ok(()) => {}
            Err(e) => {
                failed += 1;
                eprintln!("{} {}  {}", red("✗"), bold(input), red(&format!("{e:#}")));
            }
        }
    }

    // ── Bulk export ──────────────────────────────────────────────────────
    if cli.all_reports && !session.history().is_empty() {
        let path = cli.out_dir.join(BULK_FILE_NAME);
        write_file(&path, &session.export_all_text()).await?;
        if !cli.quiet {
            eprintln!("{} all reports  →  {}", green("✔"), bold(&path.display().to_string()));
        }
    }

    // ── History ──────────────────────────────────────────────────────────
    if cli.json {
        let records = session.history().list(session.history().len());
        let json =
            serde_json::to_string_pretty(&records).context("Failed to serialise history")?;
        println!("{json}");
    } else if !cli.quiet && !session.history().is_empty() {
        eprintln!("{}", bold("History (latest first)"));
        for (i, record) in session.history().list(DISPLAY_LIMIT).iter().enumerate() {
            eprintln!("  {}", dim(&record.summary(i + 1)));
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {total} image(s) could not be processed");
    }
    Ok(())
}

/// Map CLI args to `RunSettings`.
fn build_settings(cli: &Cli) -> Result<RunSettings> {
    RunSettings::builder()
        .model(cli.model)
        .demo_mode(cli.demo)
        .web_enabled(cli.web)
        .max_retries(cli.max_retries)
        .resize_width(cli.resize_width)
        .build()
        .context("Invalid configuration")
}

/// Load, generate and write the downloads for one image.
async fn process_one(
    cli: &Cli,
    session: &mut Session,
    settings: &RunSettings,
    input: &str,
) -> Result<()> {
    let upload = resolve_upload(input, cli.download_timeout)
        .await
        .context("Failed to load image")?;
    let report = session
        .generate(&upload, settings)
        .await
        .context("Report generation failed")?;

    let md_path = unique_path(&cli.out_dir, &report.file_name("md"));
    write_file(&md_path, &report.markdown_bytes()).await?;
    let pdf_path = if cli.no_pdf {
        None
    } else {
        let path = unique_path(&cli.out_dir, &report.file_name("pdf"));
        write_file(&path, &report.pdf_bytes().context("PDF export failed")?).await?;
        Some(path)
    };

    if !cli.json {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(report.record.report.as_bytes())
            .context("Failed to write to stdout")?;
        if !report.record.report.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if !cli.quiet {
        let mark = match report.generated.status {
            ReportStatus::Completed => green("✔"),
            ReportStatus::Demo => cyan("◆"),
            ReportStatus::Failed => red("⚠"),
        };
        let mut targets = md_path.display().to_string();
        if let Some(p) = &pdf_path {
            targets.push_str(&format!(", {}", p.display()));
        }
        eprintln!(
            "{} {}  {}  →  {}",
            mark,
            bold(input),
            dim(&format!(
                "{} attempt(s), {:.1}s backoff",
                report.generated.attempts,
                report.generated.total_backoff.as_secs_f64()
            )),
            bold(&targets),
        );
    }
    Ok(())
}

/// File names have one-second resolution; suffix `_2`, `_3`, … on clashes
/// so several images in one run do not overwrite each other.
fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = name.rsplit_once('.').unwrap_or((name, ""));
    (2..)
        .map(|n| dir.join(format!("{stem}_{n}.{ext}")))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("Failed to write {:?}", path))
}
