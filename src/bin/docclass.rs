//! CLI binary for edgequake-docclass.
//!
//! Maps flags to `ClassifierConfig`, classifies the given PDFs and prints
//! one line per document.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_docclass::{
    classify_batch, write_results, Classification, ClassificationProgressCallback, Classifier,
    ClassifierConfig, ProgressCallback, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::warn;
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

fn truncate(msg: &str, max: usize) -> String {
    match msg.lines().next() {
        Some(first) if first.chars().count() > max => {
            format!("{}\u{2026}", first.chars().take(max - 1).collect::<String>())
        }
        Some(first) => first.to_string(),
        None => String::new(),
    }
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Progress bar over documents, with one log line per finished document.
/// Documents finish out of order when `--processes` > 1.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    /// Stage-level checkpoint hits, shown in the final line.
    resumed: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} docs  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        bar.set_style(style);
        bar.set_prefix("Classifying");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            resumed: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut times| times.remove(&index))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ClassificationProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Classifying {total} document(s)…"))
        ));
    }

    fn on_document_start(&self, index: usize, _path: &str) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(index, Instant::now());
        }
    }

    fn on_stage_complete(&self, index: usize, stage: Stage, from_checkpoint: bool) {
        if from_checkpoint {
            self.resumed.fetch_add(1, Ordering::Relaxed);
        }
        self.bar.set_message(format!("#{} {}", index + 1, stage));
    }

    fn on_document_complete(&self, index: usize, path: &str, label: &str) {
        self.bar.println(format!(
            "  {} {}  {}  {}",
            green("✓"),
            path,
            bold(label),
            dim(&format!("{:.1}s", self.elapsed_secs(index))),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, index: usize, path: &str, error: &str) {
        self.bar.println(format!(
            "  {} {}  {}  {}",
            red("✗"),
            path,
            red(&truncate(error, 80)),
            dim(&format!("{:.1}s", self.elapsed_secs(index))),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, succeeded: usize) {
        let failed = total.saturating_sub(succeeded);
        self.bar.finish_and_clear();

        let resumed = self.resumed.load(Ordering::Relaxed);
        let resumed = if resumed > 0 {
            dim(&format!("  ({resumed} stage(s) from checkpoints)"))
        } else {
            String::new()
        };

        if failed == 0 {
            eprintln!(
                "{} {} document(s) classified{}",
                green("✔"),
                bold(&succeeded.to_string()),
                resumed
            );
        } else {
            eprintln!(
                "{} {}/{} document(s) classified  ({} failed){}",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&succeeded.to_string()),
                total,
                red(&failed.to_string()),
                resumed
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Classify a folder of scans, four at a time
  docclass scans/*.pdf -p 4 -o results.json

  # Machine-readable output on stdout
  docclass --json invoice.pdf

  # Use a specific model
  docclass --model gpt-4.1 --provider openai invoice.pdf

  # Start from scratch, ignoring previous runs
  docclass --no-checkpoint scans/*.pdf

  # Override stage instructions (e.g. triage_prompt.md, ocr_prompt.md)
  docclass --prompts-dir ./prompts scans/*.pdf

STAGES:
  1. ocr         page images → Markdown transcription
  2. triage      document group, number and issue date
  3. specialist  document type and metadata (per group)

  Each stage is checkpointed under the document's content hash in the
  checkpoint directory ($TMPDIR/ag_classifier by default). Re-running over
  the same files resumes where the previous run stopped.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Log filter, overrides --verbose / --quiet
"#;

/// Classify business documents (PDF) with LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "docclass",
    version,
    about = "Classify scanned business documents and extract their metadata with LLMs",
    long_about = "Classify PDF business documents (invoices, bank statements, customs \
declarations, payslips, tax forms, freight documents) in three LLM stages: OCR, triage and \
a per-group specialist. Results are JSON records; every stage is checkpointed so interrupted \
runs resume.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF files to classify.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Number of documents classified concurrently.
    #[arg(short = 'p', long, env = "DOCCLASS_PROCESSES", default_value_t = 4)]
    processes: usize,

    /// Write the JSON array of results to this file.
    #[arg(short, long, env = "DOCCLASS_OUTPUT")]
    output: Option<PathBuf>,

    /// Print the JSON array of results on stdout.
    #[arg(long, env = "DOCCLASS_JSON")]
    json: bool,

    /// LLM model ID (e.g. gpt-4.1-mini, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// Checkpoint directory.
    #[arg(long, env = "DOCCLASS_CHECKPOINT_DIR")]
    checkpoint_dir: Option<PathBuf>,

    /// Neither read nor write checkpoints.
    #[arg(long, env = "DOCCLASS_NO_CHECKPOINT")]
    no_checkpoint: bool,

    /// Directory of `{prompt_name}.md` files overriding built-in instructions.
    #[arg(long, env = "DOCCLASS_PROMPTS_DIR")]
    prompts_dir: Option<PathBuf>,

    /// Rendering DPI for the OCR stage (72–400).
    #[arg(long, env = "DOCCLASS_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Maximum pages transcribed per document.
    #[arg(long, env = "DOCCLASS_MAX_PAGES", default_value_t = 20)]
    max_pages: usize,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "DOCCLASS_PASSWORD")]
    password: Option<String>,

    /// Max LLM output tokens per call.
    #[arg(long, env = "DOCCLASS_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "DOCCLASS_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Retries per LLM call.
    #[arg(long, env = "DOCCLASS_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "DOCCLASS_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Disable progress bar.
    #[arg(long, env = "DOCCLASS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCCLASS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCCLASS_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
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

    // ── Inputs ───────────────────────────────────────────────────────────
    let files = select_inputs(&cli.files);
    if files.is_empty() {
        anyhow::bail!("No PDF files to classify");
    }

    // ── Classifier ───────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ClassificationProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let classifier = Classifier::from_config(config)
        .await
        .context("Failed to initialise the classifier")?;

    // ── Run ──────────────────────────────────────────────────────────────
    let output = classify_batch(&classifier, &files).await;

    if let Some(ref path) = cli.output {
        write_results(path, &output.reports)
            .await
            .context("Failed to write results")?;
    }

    if cli.json {
        let records = output.classifications();
        println!(
            "{}",
            serde_json::to_string_pretty(&records).context("Failed to serialise results")?
        );
    } else if !cli.quiet {
        if !show_progress {
            for report in &output.reports {
                println!("{}", summary_line(&report.path.display().to_string(), &report.classification));
            }
        }
        let stats = &output.stats;
        eprintln!(
            "   {}/{} classified  {} LLM call(s)  {} tokens in / {} tokens out  {}ms{}",
            stats.succeeded,
            stats.total_documents,
            stats.total_llm_calls,
            dim(&stats.total_input_tokens.to_string()),
            dim(&stats.total_output_tokens.to_string()),
            stats.total_duration_ms,
            cli.output
                .as_ref()
                .map(|p| format!("  →  {}", bold(&p.display().to_string())))
                .unwrap_or_default(),
        );
    }

    Ok(())
}

fn summary_line(path: &str, classification: &Classification) -> String {
    match classification.as_error() {
        Some(err) => format!("{} {}  {}", red("✗"), path, red(&truncate(&err.erro, 100))),
        None => format!("{} {}  {}", green("✓"), path, bold(&classification.label())),
    }
}

/// Keep PDF files and missing paths; skip directories and other files.
///
/// Missing paths stay in the batch so they show up as error records.
fn select_inputs(paths: &[PathBuf]) -> Vec<PathBuf> {
    paths
        .iter()
        .filter(|path| {
            if path.is_dir() {
                warn!("Skipping directory {}", path.display());
                return false;
            }
            if path.exists() && !edgequake_docclass::pipeline::input::has_pdf_extension(path) {
                warn!("Skipping non-PDF file {}", path.display());
                return false;
            }
            true
        })
        .cloned()
        .collect()
}

/// Map CLI args to `ClassifierConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ClassifierConfig> {
    let mut builder = ClassifierConfig::builder()
        .concurrency(cli.processes)
        .dpi(cli.dpi)
        .max_pages(cli.max_pages)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .checkpoints(!cli.no_checkpoint);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(ref dir) = cli.checkpoint_dir {
        builder = builder.checkpoint_dir(dir);
    }
    if let Some(ref dir) = cli.prompts_dir {
        builder = builder.prompts_dir(dir);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
