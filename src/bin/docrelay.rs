//! CLI binary for docrelay.
//!
//! A thin shim over the library crate that maps CLI flags to an
//! [`OcrRequest`] + [`RelayConfig`] and prints results.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::Parser;
use docrelay::{process, OcrRequest, OcrResponsePayload, PageSelection, RelayConfig};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI definition ───────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "docrelay",
    version,
    about = "OCR a PDF through a document-intelligence engine, optionally asking it a question"
)]
struct Cli {
    /// PDF file to relay
    input: PathBuf,

    /// Page selection, e.g. "1, 3-5, 8" (1-based; invalid tokens are ignored)
    #[arg(short, long)]
    pages: Option<String>,

    /// Question to answer from the document
    #[arg(short, long)]
    query: Option<String>,

    /// Write output here instead of stdout (atomic: temp file + rename)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit the raw response envelope as pretty JSON
    #[arg(long)]
    json: bool,

    /// Append a quoted list of recognized blocks to each page
    #[arg(long)]
    blocks: bool,

    /// Ask the engine to inline extracted images as base64
    #[arg(long)]
    include_images: bool,

    /// Engine API base URL
    #[arg(
        long,
        env = "DOCRELAY_API_BASE",
        default_value = "https://api.mistral.ai"
    )]
    api_base: String,

    /// Engine API key
    #[arg(long, env = "MISTRAL_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OCR model
    #[arg(long, default_value = "mistral-ocr-latest")]
    model: String,

    /// Chat model used for --query
    #[arg(long, default_value = "mistral-small-latest")]
    qa_model: String,

    /// Per-call timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let bytes = std::fs::read(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let file_name = cli
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| docrelay::DEFAULT_FILE_NAME.to_string());

    let mut builder = RelayConfig::builder()
        .api_base(cli.api_base.as_str())
        .ocr_model(cli.model.as_str())
        .qa_model(cli.qa_model.as_str())
        .include_image_base64(cli.include_images)
        .api_timeout_secs(cli.timeout);
    if let Some(key) = cli.api_key.as_deref() {
        builder = builder.api_key(key);
    }
    let config = builder.build()?;

    let request = OcrRequest {
        file_base64: STANDARD.encode(&bytes),
        file_name: Some(file_name.clone()),
        include_image_base64: cli.include_images,
        pages: cli
            .pages
            .as_deref()
            .map(PageSelection::parse)
            .unwrap_or_default(),
        query: cli.query.clone(),
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Relaying {file_name}…"));
    spinner.enable_steady_tick(Duration::from_millis(80));

    let start = Instant::now();
    let result = process(request, &config).await;
    spinner.finish_and_clear();
    let envelope = result?;

    let rendered = if cli.json {
        serde_json::to_string_pretty(&envelope).context("failed to serialise envelope")?
    } else {
        render_markdown(&envelope, cli.blocks)
    };

    match &cli.output {
        Some(path) => {
            write_atomic(path, &rendered)?;
            eprintln!("{} wrote {}", green("✓"), path.display());
        }
        None => print!("{rendered}"),
    }

    eprintln!(
        "{} {} page(s)  {}  {}",
        green("✓"),
        envelope.ocr.pages.len(),
        bold(&envelope.model),
        dim(&format!("{:.1}s", start.elapsed().as_secs_f64())),
    );

    Ok(())
}

// ── Rendering ────────────────────────────────────────────────────────────────

/// Render the normalized pages (and answer) as a single Markdown document,
/// pages separated by `<!-- page N -->` comments.
fn render_markdown(envelope: &OcrResponsePayload, with_blocks: bool) -> String {
    let pages = envelope.display_pages();
    let mut out = String::new();

    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        out.push_str(&format!("<!-- page {} -->\n\n", page.page_number));
        out.push_str(&page.markdown);

        if with_blocks && !page.blocks.is_empty() {
            out.push('\n');
            for block in &page.blocks {
                let confidence = block
                    .confidence
                    .map(|c| format!(" ({:.0}%)", c * 100.0))
                    .unwrap_or_default();
                out.push_str(&format!("\n> {}{}", block.describe(), confidence));
            }
        }
    }

    if let Some(answer) = &envelope.answer {
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str("## Answer\n\n");
        out.push_str(answer);
    }

    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Write via temp file + rename so readers never observe a partial file.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let tmp = path.with_extension("md.tmp");
    std::fs::write(&tmp, contents)
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to move output into {}", path.display()))?;
    Ok(())
}

fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("docrelay={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
