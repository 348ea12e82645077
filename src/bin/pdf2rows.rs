//! CLI binary for pdf2rows.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, wires up the CSV sinks, and prints the batch summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2rows::{
    batch,
    sink::{CsvErrorSink, CsvRowSink},
    BatchProgressCallback, BatchSummary, ExtractionConfig, FieldSchema, GeminiClient,
    ProgressCallback,
};
use std::io;
use std::path::PathBuf;
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

/// Terminal progress callback: one bar across the batch plus a log line per
/// document. Documents are processed sequentially, so a single start-time
/// slot is enough.
struct CliProgressCallback {
    bar: ProgressBar,
    started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_batch_start

        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.started
            .lock()
            .unwrap()
            .take()
            .map(|t| t.elapsed().as_millis() as f64 / 1000.0)
            .unwrap_or(0.0)
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.bar.set_length(total_documents as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total_documents} documents…"))
        ));
    }

    fn on_document_start(&self, _index: usize, _total: usize, name: &str) {
        *self.started.lock().unwrap() = Some(Instant::now());
        self.bar.set_message(name.to_string());
    }

    fn on_document_complete(&self, index: usize, total: usize, name: &str, rows: usize) {
        let secs = self.elapsed_secs();
        self.bar.println(format!(
            "  {} {:>3}/{:<3} {:<40} {:<10} {}",
            green("✓"),
            index,
            total,
            name,
            dim(&format!("{rows:>3} rows")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, index: usize, total: usize, name: &str, error: &str) {
        let secs = self.elapsed_secs();
        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3} {:<40} {}  {}",
            red("✗"),
            index,
            total,
            name,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, summary: &BatchSummary) {
        self.bar.finish_and_clear();

        if summary.failed == 0 {
            eprintln!(
                "{} {} documents extracted, {} rows",
                green("✔"),
                bold(&summary.succeeded.to_string()),
                bold(&summary.rows_written.to_string()),
            );
        } else {
            eprintln!(
                "{} {}/{} documents extracted  ({} failed)",
                if summary.succeeded == 0 { red("✘") } else { cyan("⚠") },
                bold(&summary.succeeded.to_string()),
                summary.documents,
                red(&summary.failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract every PDF in ./pdfs into extracted.csv
  pdf2rows ./pdfs

  # Custom sinks
  pdf2rows ./pdfs -o notices.csv --errors notice_errors.csv

  # Custom field schema (JSON: fields / currency_fields / singleton_fields)
  pdf2rows --schema myschema.json ./scans

  # Use a different model, more attempts
  pdf2rows --model gemini-2.5-pro --max-attempts 5 ./pdfs

  # Custom extraction prompt
  pdf2rows --prompt prompt.txt ./pdfs

SCHEMA FILE FORMAT:
  {
    "fields":           ["성명", "수입금액", "경비율", ...],
    "currency_fields":  ["수입금액", ...],
    "singleton_fields": ["성명", ...]
  }

  Column order in the output CSV follows "fields". Currency fields are
  reduced to digit-only strings; singleton fields are copied into every row
  produced from the same document.

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY       Google Gemini API key (required)
  PDF2ROWS_MODEL       Override model ID
  PDF2ROWS_OUTPUT      Default output CSV path

OUTPUT:
  extracted.csv   one header row, then one row per income-table entry;
                  the file name appears only on the first row per document
  errors.csv      one row per failed document: file_name, error, timestamp
"#;

/// Extract structured tax-notice fields from PDFs into CSV rows using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2rows",
    version,
    about = "Extract structured tax-notice fields from PDFs into CSV rows using Vision LLMs",
    long_about = "Batch-extract structured field data from scanned tax-document PDFs using the \
Gemini File API and a vision model. Successful rows are appended to a CSV sink; documents that \
fail after bounded retries are appended to a separate CSV error trail, and the batch continues.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Folder containing the PDF documents to process.
    input: PathBuf,

    /// Append extracted rows to this CSV file.
    #[arg(short, long, env = "PDF2ROWS_OUTPUT", default_value = "extracted.csv")]
    output: PathBuf,

    /// Append per-document failures to this CSV file.
    #[arg(long, env = "PDF2ROWS_ERRORS", default_value = "errors.csv")]
    errors: PathBuf,

    /// Vision model ID.
    #[arg(long, env = "PDF2ROWS_MODEL", default_value = "gemini-2.5-flash")]
    model: String,

    /// API key. Falls back to GEMINI_API_KEY.
    #[arg(long, env = "PDF2ROWS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Path to a JSON schema file (fields / currency_fields / singleton_fields).
    #[arg(long, env = "PDF2ROWS_SCHEMA")]
    schema: Option<PathBuf>,

    /// Path to a text file containing a custom extraction prompt.
    #[arg(long, env = "PDF2ROWS_PROMPT")]
    prompt: Option<PathBuf>,

    /// Attempts per document (upload + model call + parse).
    #[arg(long, env = "PDF2ROWS_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: u32,

    /// Initial retry backoff in milliseconds (doubles per attempt).
    #[arg(long, env = "PDF2ROWS_RETRY_BACKOFF_MS", default_value_t = 500)]
    retry_backoff_ms: u64,

    /// Per-HTTP-call timeout in seconds.
    #[arg(long, env = "PDF2ROWS_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Disable the progress bar.
    #[arg(long, env = "PDF2ROWS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2ROWS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2ROWS_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active; the
    // bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress;
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

    // ── Enumerate documents ──────────────────────────────────────────────
    let documents = batch::list_documents(&cli.input)
        .with_context(|| format!("Failed to list documents in {:?}", cli.input))?;
    if documents.is_empty() {
        eprintln!(
            "{} no PDF documents found in {}",
            cyan("◆"),
            cli.input.display()
        );
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let config = build_config(&cli, show_progress).await?;

    let client = GeminiClient::new(cli.api_key.clone(), &config.model, config.api_timeout_secs)
        .context("Failed to initialise the model client")?;

    let mut rows = CsvRowSink::open(&cli.output)
        .with_context(|| format!("Failed to open output CSV {:?}", cli.output))?;
    let mut errors = CsvErrorSink::open(&cli.errors)
        .with_context(|| format!("Failed to open error CSV {:?}", cli.errors))?;

    // ── Run the batch ────────────────────────────────────────────────────
    let summary = batch::run_batch(&documents, &config, &client, &mut rows, &mut errors)
        .await
        .context("Batch run failed")?;

    // ── Summary ──────────────────────────────────────────────────────────
    if !cli.quiet {
        eprintln!(
            "   {} documents  /  {} rows  →  {}",
            dim(&summary.documents.to_string()),
            dim(&summary.rows_written.to_string()),
            bold(&cli.output.display().to_string()),
        );
        if summary.failed > 0 {
            eprintln!(
                "   {} — details in {}",
                red(&format!("{} failed", summary.failed)),
                bold(&cli.errors.display().to_string()),
            );
        }
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli, show_progress: bool) -> Result<ExtractionConfig> {
    let schema = match cli.schema {
        Some(ref path) => FieldSchema::from_json_file(path)
            .with_context(|| format!("Failed to load schema from {:?}", path))?,
        None => FieldSchema::tax_notice(),
    };

    let prompt = match cli.prompt {
        Some(ref path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read prompt from {:?}", path))?,
        ),
        None => None,
    };

    let mut builder = ExtractionConfig::builder()
        .model(&cli.model)
        .schema(schema)
        .max_attempts(cli.max_attempts)
        .retry_backoff_ms(cli.retry_backoff_ms)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(p) = prompt {
        builder = builder.prompt(p);
    }
    if show_progress {
        let callback: ProgressCallback = CliProgressCallback::new();
        builder = builder.progress_callback(callback);
    }

    builder.build().context("Invalid configuration")
}
