//! CLI binary for edgequake-img2txt.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `OcrConfig` and prints or saves the extracted text.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_img2txt::{
    archive_source, recognize_batch_stream, recognize_file, scan_directory, FilePublisher,
    JobStatus, OcrConfig, ParagraphDelimiter, Post, ProgressCallback, Publisher,
    RecognitionProgressCallback,
};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
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

/// Terminal progress callback: a spinner showing the jobs in flight and one
/// log line per finished document. Documents may finish out of order in
/// directory mode.
struct CliProgressCallback {
    bar: ProgressBar,
    /// First submission time per title, for elapsed reporting.
    start_times: Mutex<HashMap<String, Instant>>,
}

impl CliProgressCallback {
    fn new(total: usize) -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  {pos}/{len} documents  ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        let bar = ProgressBar::new(total as u64);
        bar.set_style(style);
        bar.set_prefix("Analyzing");
        bar.set_message("Uploading…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn elapsed_secs(&self, title: &str) -> f64 {
        self.start_times
            .lock()
            .map(|mut m| m.remove(title))
            .ok()
            .flatten()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl RecognitionProgressCallback for CliProgressCallback {
    fn on_submitted(&self, title: &str, _handle: &str) {
        if let Ok(mut m) = self.start_times.lock() {
            m.entry(title.to_string()).or_insert_with(Instant::now);
        }
        self.bar.set_message(format!("{title}: submitted"));
    }

    fn on_poll(&self, title: &str, attempt: u32, status: JobStatus) {
        if status == JobStatus::Running {
            self.bar.set_message(format!("{title}: running (poll {attempt})"));
        }
    }

    fn on_complete(&self, title: &str, text_len: usize) {
        let secs = self.elapsed_secs(title);
        self.bar.println(format!(
            "  {} {:<32}  {:<12}  {}",
            green("✓"),
            title,
            dim(&format!("{text_len:>6} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_error(&self, title: &str, error: &str) {
        let secs = self.elapsed_secs(title);

        let msg = if error.chars().count() > 80 {
            let cut: String = error.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:<32}  {}  {}",
            red("✗"),
            title,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Print the text of one image
  img2txt page.jpg

  # Save it to a file
  img2txt page.jpg -o page.txt

  # Save under a title in a folder (writes notes/Day 1.txt)
  img2txt page.jpg --output-dir notes --title "Day 1"

  # Process every image (and every sub-folder of images) in a directory,
  # then move the originals out of the way
  img2txt scans/ --output-dir output --archive-dir processed

  # JSON output with job handle, poll count and timings
  img2txt --json page.jpg

ENVIRONMENT VARIABLES:
  AZURE_DOCUMENT_ENDPOINT      Service endpoint (https://<name>.cognitiveservices.azure.com)
  AZURE_DOCUMENT_KEY           Subscription key
  MODEL_ID                     Analysis model (default: prebuilt-read)
  AZURE_DOCUMENT_API_VERSION   API version (default: 2024-02-29-preview)
  RUST_LOG                     Override log filtering (e.g. edgequake_img2txt=debug)

SUPPORTED FORMATS:
  PNG, JPEG, GIF, BMP, TIFF, WebP (detected from file contents)
"#;

/// Extract text from images using Azure AI Document Intelligence.
#[derive(Parser, Debug)]
#[command(
    name = "img2txt",
    version,
    about = "Extract text from images using Azure AI Document Intelligence",
    long_about = "Extract text from images (a single file, or a directory of images and image \
folders) using the Azure AI Document Intelligence analyze API. Each image is uploaded, the \
analysis job is polled until it finishes, and the recognised paragraphs are joined into text.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image file, or a directory of images / image folders.
    input: PathBuf,

    /// Write the text to this file instead of stdout (file mode).
    #[arg(short, long, conflicts_with_all = ["output_dir", "json"])]
    output: Option<PathBuf>,

    /// Save text as `<title>.txt` in this directory. Default in directory mode: ./output
    #[arg(long, env = "IMG2TXT_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Title for the saved text (file mode). Default: the file stem.
    #[arg(long, requires = "output_dir")]
    title: Option<String>,

    /// Move processed inputs here (directory mode).
    #[arg(long, env = "IMG2TXT_ARCHIVE_DIR")]
    archive_dir: Option<PathBuf>,

    /// Service endpoint, e.g. https://<name>.cognitiveservices.azure.com
    #[arg(long, env = "AZURE_DOCUMENT_ENDPOINT")]
    endpoint: Option<String>,

    /// Subscription key.
    #[arg(long, env = "AZURE_DOCUMENT_KEY", hide_env_values = true)]
    key: Option<String>,

    /// Analysis model ID.
    #[arg(long, env = "MODEL_ID", default_value = "prebuilt-read")]
    model: String,

    /// `api-version` query parameter.
    #[arg(long, env = "AZURE_DOCUMENT_API_VERSION", default_value = "2024-02-29-preview")]
    api_version: String,

    /// Path segment before `documentModels` (use "" for none, "formrecognizer" for older resources).
    #[arg(long, env = "IMG2TXT_API_PATH", default_value = "documentintelligence")]
    api_path: String,

    /// Delay between status polls in milliseconds.
    #[arg(long, env = "IMG2TXT_POLL_INTERVAL_MS", default_value_t = 2000)]
    poll_interval_ms: u64,

    /// Stop polling a job after this many seconds.
    #[arg(long, env = "IMG2TXT_POLL_TIMEOUT", default_value_t = 300,
          value_parser = clap::value_parser!(u64).range(1..))]
    poll_timeout: u64,

    /// Stop polling a job after this many status requests.
    #[arg(long, env = "IMG2TXT_MAX_POLLS",
          value_parser = clap::value_parser!(u32).range(1..))]
    max_polls: Option<u32>,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, env = "IMG2TXT_REQUEST_TIMEOUT", default_value_t = 30)]
    request_timeout: u64,

    /// Largest image to upload, in MiB.
    #[arg(long, env = "IMG2TXT_MAX_UPLOAD_MB", default_value_t = 5,
          value_parser = clap::value_parser!(u64).range(1..=500))]
    max_upload_mb: u64,

    /// Paragraph delimiter: newline, space, blank, or a custom string.
    #[arg(long, env = "IMG2TXT_DELIMITER", default_value = "newline")]
    delimiter: String,

    /// Documents analysed at once in directory mode.
    #[arg(short, long, env = "IMG2TXT_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Print `RecognitionOutput` as JSON (file mode) or a summary (directory mode).
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "IMG2TXT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "IMG2TXT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "IMG2TXT_QUIET", conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner carries the feedback while it is shown, so library INFO
    // logs are suppressed unless -v is given.
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

    if cli.input.is_dir() {
        run_directory(&cli, show_progress).await
    } else {
        run_file(&cli, show_progress).await
    }
}

/// Recognise a single image.
async fn run_file(cli: &Cli, show_progress: bool) -> Result<()> {
    let progress = show_progress.then(|| CliProgressCallback::new(1));
    let config = build_config(
        cli,
        progress
            .clone()
            .map(|cb| cb as Arc<dyn RecognitionProgressCallback>),
    )?;

    let result = recognize_file(&cli.input, &config).await;
    if let Some(ref cb) = progress {
        cb.finish();
    }
    let output = result.with_context(|| format!("Failed to analyze {}", cli.input.display()))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if let Some(ref path) = cli.output {
        tokio::fs::write(path, &output.text)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if !cli.quiet {
            eprintln!(
                "{}  {} chars  {}ms  →  {}",
                green("✔"),
                output.text.len(),
                output.stats.total_duration_ms,
                bold(&path.display().to_string()),
            );
        }
        return Ok(());
    } else if cli.output_dir.is_none() {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.text.as_bytes())
            .context("Failed to write to stdout")?;
        if !output.text.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if let Some(ref dir) = cli.output_dir {
        let title = cli
            .title
            .clone()
            .unwrap_or_else(|| edgequake_img2txt::pipeline::input::title_from_path(&cli.input));
        let post = Post::new(&title, output.text.as_str())?;
        let receipt = FilePublisher::new(dir).publish(&post).await?;
        if !cli.quiet && !cli.json {
            eprintln!(
                "{}  {} chars  {}ms  →  {}",
                green("✔"),
                output.text.len(),
                output.stats.total_duration_ms,
                bold(&receipt.location),
            );
        }
    } else if !cli.quiet && !cli.json {
        eprintln!(
            "{}",
            dim(&format!(
                "{} paragraphs  /  {} polls  —  {}ms total",
                output.stats.paragraphs, output.stats.poll_attempts, output.stats.total_duration_ms
            ))
        );
    }

    Ok(())
}

/// Recognise every item in a directory and save one text file per item.
async fn run_directory(cli: &Cli, show_progress: bool) -> Result<()> {
    let items = scan_directory(&cli.input)
        .with_context(|| format!("Failed to scan {}", cli.input.display()))?;
    if items.is_empty() {
        if !cli.quiet {
            eprintln!("{} no images found in {}", cyan("⚠"), cli.input.display());
        }
        return Ok(());
    }

    let total = items.len();
    if show_progress {
        eprintln!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Analyzing {total} documents…"))
        );
    }

    let progress = show_progress.then(|| CliProgressCallback::new(total));
    let config = build_config(
        cli,
        progress
            .clone()
            .map(|cb| cb as Arc<dyn RecognitionProgressCallback>),
    )?;

    let output_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("output"));
    let publisher = FilePublisher::new(&output_dir);

    let mut outcomes = recognize_batch_stream(items, &config)?;
    let mut summary = Vec::with_capacity(total);
    let mut saved = 0usize;

    while let Some(outcome) = outcomes.next().await {
        let saved_to = match outcome.result {
            Ok(ref text) => {
                let archive_dir = cli.archive_dir.as_deref();
                match publish_and_archive(&publisher, &outcome.title, text, &outcome.source, archive_dir)
                    .await
                {
                    Ok(location) => {
                        saved += 1;
                        Ok(location)
                    }
                    Err(e) => Err(format!("{e:#}")),
                }
            }
            Err(ref e) => Err(e.to_string()),
        };
        if let Err(ref e) = saved_to {
            tracing::error!("'{}' failed: {}", outcome.title, e);
        }
        summary.push(serde_json::json!({
            "title": outcome.title,
            "source": outcome.source.display().to_string(),
            "images": outcome.images,
            "failed_images": outcome.failed_images,
            "output": saved_to.as_ref().ok(),
            "error": saved_to.as_ref().err(),
        }));
    }

    if let Some(ref cb) = progress {
        cb.finish();
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?;
        println!("{json}");
    } else if !cli.quiet {
        let failed = total - saved;
        eprintln!(
            "{} {}/{} documents saved to {}{}",
            if failed == 0 {
                green("✔")
            } else if saved == 0 {
                red("✘")
            } else {
                cyan("⚠")
            },
            bold(&saved.to_string()),
            total,
            bold(&output_dir.display().to_string()),
            if failed > 0 {
                format!("  ({} failed)", red(&failed.to_string()))
            } else {
                String::new()
            },
        );
    }

    if saved == 0 {
        anyhow::bail!("No documents could be processed");
    }
    Ok(())
}

async fn publish_and_archive(
    publisher: &FilePublisher,
    title: &str,
    text: &str,
    source: &Path,
    archive_dir: Option<&Path>,
) -> Result<String> {
    let post = Post::new(title, text)?;
    let receipt = publisher
        .publish(&post)
        .await
        .with_context(|| format!("Failed to save '{title}'"))?;
    if let Some(dir) = archive_dir {
        archive_source(source, dir)
            .await
            .with_context(|| format!("Failed to archive {}", source.display()))?;
    }
    Ok(receipt.location)
}

/// Map CLI args to `OcrConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<OcrConfig> {
    let mut builder = OcrConfig::builder()
        .model_id(&cli.model)
        .api_version(&cli.api_version)
        .api_path(&cli.api_path)
        .poll_interval_ms(cli.poll_interval_ms)
        .poll_timeout_secs(cli.poll_timeout)
        .request_timeout_secs(cli.request_timeout)
        .max_upload_bytes((cli.max_upload_mb * 1024 * 1024) as usize)
        .delimiter(parse_delimiter(&cli.delimiter))
        .concurrency(cli.concurrency);

    if let Some(ref endpoint) = cli.endpoint {
        builder = builder.endpoint(endpoint);
    }
    if let Some(ref key) = cli.key {
        builder = builder.api_key(key);
    }
    if let Some(n) = cli.max_polls {
        builder = builder.max_poll_attempts(n);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--delimiter` into `ParagraphDelimiter`.
fn parse_delimiter(s: &str) -> ParagraphDelimiter {
    match s.to_lowercase().as_str() {
        "newline" | "nl" | "\\n" => ParagraphDelimiter::Newline,
        "space" => ParagraphDelimiter::Space,
        "blank" | "blankline" | "\\n\\n" => ParagraphDelimiter::BlankLine,
        _ => ParagraphDelimiter::Custom(s.replace("\\n", "\n").replace("\\t", "\t")),
    }
}
