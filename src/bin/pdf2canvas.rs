//! CLI binary for pdf2canvas.
//!
//! A thin shim over the library crate: load the settings file, apply flag
//! overrides, run the batch over a vault directory and print the results.

use anyhow::{Context, Result};
use clap::Parser;
use pdf2canvas::{
    BatchProgressCallback, BatchReport, FsVault, OllamaClient, PdfiumExtractor, Pipeline,
    ProgressCallback, Settings,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
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
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Truncate to `max` characters, appending an ellipsis when cut.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}\u{2026}")
    } else {
        s.to_string()
    }
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per document.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start time of the document currently being processed.
    started: Mutex<Option<Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner-only until `on_batch_start` reports the document count.
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Scanning input folder…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Summarising");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Summarising {total} documents…"))
        ));
    }

    fn on_document_start(&self, _index: usize, _total: usize, path: &str) {
        if let Ok(mut started) = self.started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(path.to_string());
    }

    fn on_length_warning(&self, path: &str, chars: usize, budget: usize) {
        self.bar.println(format!(
            "  {} {}  {}",
            yellow("⚠"),
            path,
            dim(&format!("{chars} chars > ~{budget} char budget, may be truncated")),
        ));
    }

    fn on_document_complete(&self, index: usize, total: usize, canvas_path: &str) {
        let secs = self.elapsed_secs();
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            green("✓"),
            index,
            total,
            canvas_path,
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, index: usize, total: usize, path: &str, error: &str) {
        let secs = self.elapsed_secs();
        self.errors.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}  {}",
            red("✗"),
            index,
            total,
            path,
            red(&truncate(error, 80)),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, succeeded: usize) {
        let failed = self.errors.load(Ordering::SeqCst);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} documents summarised",
                green("✔"),
                bold(&succeeded.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} documents summarised  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&succeeded.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Create a settings file with every default filled in
  pdf2canvas --write-default-settings

  # Summarise Papers/ into Canvases/<category>/ inside a vault
  pdf2canvas --vault ~/Notes --input-folder Papers --output-folder Canvases

  # Use a different model and a remote server
  pdf2canvas --model mistral:7b --base-url https://ollama.example.com --api-token $TOKEN

  # Machine-readable report
  pdf2canvas --json > report.json

ENVIRONMENT VARIABLES:
  PDF2CANVAS_SETTINGS       Settings file (default: pdf2canvas.json)
  PDF2CANVAS_VAULT          Vault root directory (default: .)
  PDF2CANVAS_INPUT_FOLDER   Vault-relative folder scanned for PDFs
  PDF2CANVAS_OUTPUT_FOLDER  Vault-relative folder for category folders
  PDF2CANVAS_MODEL          Model identifier
  PDF2CANVAS_BASE_URL       Inference server base URL
  PDF2CANVAS_API_TOKEN      Bearer token
  PDFIUM_LIB_PATH           Path to an existing libpdfium
  RUST_LOG                  Overrides the log filter

SETUP:
  1. Start an Ollama-compatible server:  ollama serve && ollama pull llama3.1:8b
  2. Put libpdfium next to the binary, on the library path, or in PDFIUM_LIB_PATH.
  3. Run:                                pdf2canvas --input-folder Papers --output-folder Canvases
"#;

/// Summarise PDFs with an LLM and file them as JSON Canvas documents.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2canvas",
    version,
    about = "Summarise PDFs with an LLM and file them as JSON Canvas documents",
    long_about = "Extract the text of every PDF under an input folder, ask an \
Ollama-compatible model for a title, a structured summary and a subject category, and write \
one .canvas file per document into <output>/<category>/.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Settings file (JSON). Missing files fall back to defaults.
    #[arg(long, env = "PDF2CANVAS_SETTINGS", default_value = "pdf2canvas.json")]
    settings: PathBuf,

    /// Vault root directory; folders are relative to it.
    #[arg(long, env = "PDF2CANVAS_VAULT", default_value = ".")]
    vault: PathBuf,

    /// Folder scanned (recursively) for PDFs.
    #[arg(short, long, env = "PDF2CANVAS_INPUT_FOLDER")]
    input_folder: Option<String>,

    /// Folder under which category folders and canvases are written.
    #[arg(short, long, env = "PDF2CANVAS_OUTPUT_FOLDER")]
    output_folder: Option<String>,

    /// Model identifier, e.g. llama3.1:8b.
    #[arg(long, env = "PDF2CANVAS_MODEL")]
    model: Option<String>,

    /// Inference server base URL; /api/chat is appended.
    #[arg(long, env = "PDF2CANVAS_BASE_URL")]
    base_url: Option<String>,

    /// Bearer token for the inference server.
    #[arg(long, env = "PDF2CANVAS_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Context window in tokens (num_ctx).
    #[arg(long, env = "PDF2CANVAS_MAX_TOKENS")]
    max_tokens: Option<usize>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "PDF2CANVAS_TEMPERATURE")]
    temperature: Option<f32>,

    /// Whole-request timeout for each inference call, in seconds.
    #[arg(long, env = "PDF2CANVAS_REQUEST_TIMEOUT")]
    request_timeout: Option<u64>,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDF2CANVAS_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// Output the batch report as JSON on stdout.
    #[arg(long, env = "PDF2CANVAS_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2CANVAS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs and full error detail.
    #[arg(short, long, env = "PDF2CANVAS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2CANVAS_QUIET")]
    quiet: bool,

    /// Write a settings file with all defaults to --settings and exit.
    #[arg(long)]
    write_default_settings: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.write_default_settings {
        if cli.settings.exists() {
            anyhow::bail!(
                "Refusing to overwrite existing settings file {}",
                cli.settings.display()
            );
        }
        Settings::default()
            .save(&cli.settings)
            .context("Failed to write default settings")?;
        eprintln!("{} wrote {}", green("✔"), cli.settings.display());
        return Ok(());
    }

    let loaded = Settings::load(&cli.settings)
        .with_context(|| format!("Failed to load settings from {}", cli.settings.display()))?;
    let settings = apply_overrides(loaded, &cli)?;

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let verbose = cli.verbose || settings.verbose;
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if verbose {
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

    tracing::debug!("{:?}", settings);

    if !cli.vault.is_dir() {
        anyhow::bail!("Vault directory {} does not exist", cli.vault.display());
    }

    // ── Wire up the pipeline ─────────────────────────────────────────────
    let extractor = PdfiumExtractor::new(settings.pdfium_lib_path.clone())
        .context("Failed to load the pdfium library (set PDFIUM_LIB_PATH or --pdfium-lib)")?;
    let client = OllamaClient::from_settings(&settings).context("Failed to build HTTP client")?;

    let mut pipeline = Pipeline::new(
        settings,
        Arc::new(FsVault::new(cli.vault.clone())),
        Arc::new(extractor),
        Arc::new(client),
    );
    if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new();
        pipeline = pipeline.with_progress(cb);
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let report = pipeline.run().await.context("Batch aborted")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&report, show_progress);
    }

    if report.attempted() > 0 && report.succeeded() == 0 {
        anyhow::bail!("None of the {} documents could be processed", report.attempted());
    }
    Ok(())
}

/// Layer CLI flags over the loaded settings.
fn apply_overrides(settings: Settings, cli: &Cli) -> Result<Settings> {
    let mut builder = settings.into_builder();

    if let Some(ref v) = cli.input_folder {
        builder = builder.input_folder(v.as_str());
    }
    if let Some(ref v) = cli.output_folder {
        builder = builder.output_folder(v.as_str());
    }
    if let Some(ref v) = cli.model {
        builder = builder.model(v.as_str());
    }
    if let Some(ref v) = cli.base_url {
        builder = builder.base_url(v.as_str());
    }
    if let Some(ref v) = cli.api_token {
        builder = builder.api_token(v.as_str());
    }
    if let Some(v) = cli.max_tokens {
        builder = builder.max_tokens(v);
    }
    if let Some(v) = cli.temperature {
        builder = builder.temperature(v);
    }
    if let Some(v) = cli.request_timeout {
        builder = builder.request_timeout_secs(v);
    }
    if let Some(ref v) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(v.clone());
    }
    if cli.verbose {
        builder = builder.verbose(true);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(report: &BatchReport, progress_shown: bool) {
    // The progress callback already printed per-document lines.
    if !progress_shown {
        for doc in report.processed() {
            eprintln!("{} {} → {}", green("✓"), doc.source, bold(&doc.canvas_path));
        }
        for failure in report.failures() {
            eprintln!(
                "{} {}  {}",
                red("✗"),
                failure.source,
                red(&truncate(&failure.error.to_string(), 120))
            );
        }
    }

    eprintln!(
        "{}  {}/{} documents  {}ms",
        if report.failed() == 0 {
            green("✔")
        } else {
            cyan("⚠")
        },
        report.succeeded(),
        report.attempted(),
        report.total_duration_ms,
    );
    for (kind, count) in report.failures_by_kind() {
        eprintln!("   {}", dim(&format!("{count} failed: {kind:?}")));
    }
}
