//! CLI binary for pdf-flatten.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `FlattenConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_flatten::{
    default_output_path, flatten, inspect, FlattenConfig, FlattenError, FlattenProgressCallback,
    FlattenReport, ProgressCallback, Stage,
};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
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
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a spinner naming the current stage, switching to a
/// page counter while pages are rasterised.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(Self::spinner_style());
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS)
    }

    fn page_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS)
    }
}

impl FlattenProgressCallback for CliProgressCallback {
    fn on_flatten_start(&self, total_pages: usize) {
        self.bar.set_length(total_pages as u64);
        self.bar.set_style(Self::page_style());
        self.bar.reset_eta();
    }

    fn on_stage(&self, stage: Stage) {
        if stage != Stage::Rasterize {
            self.bar.set_style(Self::spinner_style());
        }
        self.bar.set_prefix(stage.label());
        self.bar.set_message("");
    }

    fn on_page_rendered(&self, page_num: usize, total_pages: usize, width: u32, height: u32) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim(&format!("{width}×{height} px")),
        ));
        self.bar.inc(1);
    }

    fn on_flatten_complete(&self, _total_pages: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Flatten to flat-contract.pdf in the current directory
  flatten-pdf contract.pdf

  # Choose the output path and resolution
  flatten-pdf contract.pdf -o signed/contract.pdf --dpi 300

  # Override the document dates (time of day is kept from the original)
  flatten-pdf contract.pdf -c 2024-01-01 -m 2024-01-02

  # Inspect source metadata only
  flatten-pdf --inspect-only contract.pdf

  # Machine-readable report
  flatten-pdf --json contract.pdf > report.json

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to a specific libpdfium / pdfium.dll
  RUST_LOG                Override log filtering (e.g. pdf_flatten=debug)

PDFIUM:
  Windows  C:\Program Files\pdfium\bin\pdfium.dll
  macOS    libpdfium.dylib on DYLD_LIBRARY_PATH or /usr/local/lib, /opt/homebrew/lib
  Linux    libpdfium.so on LD_LIBRARY_PATH or /usr/local/lib, /usr/lib
"#;

/// Flatten PDF files into page images.
#[derive(Parser, Debug)]
#[command(
    name = "flatten-pdf",
    version,
    about = "Flatten a PDF into page images and keep or set its dates",
    long_about = "Rasterise every page of a PDF, rebuild the document from the page images, \
compress it, and write the original (or overridden) creation and modification dates into \
both the document and the file system.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path to the input PDF file.
    input: PathBuf,

    /// Output PDF path. Default: flat-<input file name>.
    #[arg(short, long, env = "FLATTEN_PDF_OUTPUT")]
    output: Option<PathBuf>,

    /// Rendering DPI.
    #[arg(short, long, env = "FLATTEN_PDF_DPI", default_value_t = pdf_flatten::DEFAULT_DPI,
          value_parser = clap::value_parser!(u32).range(1..))]
    dpi: u32,

    /// Creation date override (YYYY-MM-DD).
    #[arg(short, long, env = "FLATTEN_PDF_CREATION_DATE")]
    creation_date: Option<String>,

    /// Modification date override (YYYY-MM-DD).
    #[arg(short, long, env = "FLATTEN_PDF_MODIFICATION_DATE")]
    modification_date: Option<String>,

    /// JPEG quality of the page images (1–100).
    #[arg(long, env = "FLATTEN_PDF_QUALITY", default_value_t = pdf_flatten::DEFAULT_JPEG_QUALITY,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "FLATTEN_PDF_PASSWORD")]
    password: Option<String>,

    /// Do not try to set the file-system creation time.
    #[arg(long, env = "FLATTEN_PDF_NO_CREATION_TIME")]
    no_creation_time: bool,

    /// Print the flattening report as JSON.
    #[arg(long, env = "FLATTEN_PDF_JSON")]
    json: bool,

    /// Print source metadata only, no flattening.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "FLATTEN_PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FLATTEN_PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "FLATTEN_PDF_QUIET")]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", red("Error:"), e);
            let code = e
                .downcast_ref::<FlattenError>()
                .map(FlattenError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar carries the feedback; keep library logs quiet under it.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
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

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input, cli.password.as_deref()).context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:          {}", cli.input.display());
            if let Some(ref t) = meta.title {
                println!("Title:         {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:        {}", a);
            }
            println!("Pages:         {}", meta.page_count);
            println!("PDF Version:   {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:      {}", p);
            }
            if let Some(ref c) = meta.creation_date {
                println!("Created:       {}", c);
            }
            if let Some(ref m) = meta.modification_date {
                println!("Modified:      {}", m);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn FlattenProgressCallback>)
    } else {
        None
    };
    let config = build_config(cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));
    let report = flatten(&cli.input, &output, &config)
        .with_context(|| format!("Failed to flatten {}", cli.input.display()))?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
        return Ok(());
    }

    if !cli.quiet {
        print_summary(&report);
        println!("File {} saved successfully.", output.display());
    }

    Ok(())
}

/// Map CLI args to `FlattenConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<FlattenConfig> {
    let mut builder = FlattenConfig::builder()
        .dpi(cli.dpi)
        .jpeg_quality(cli.quality)
        .set_creation_time(!cli.no_creation_time);

    if let Some(ref c) = cli.creation_date {
        builder = builder.creation_date(c);
    }
    if let Some(ref m) = cli.modification_date {
        builder = builder.modification_date(m);
    }
    if let Some(ref p) = cli.password {
        builder = builder.password(p);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    Ok(builder.build()?)
}

fn print_summary(report: &FlattenReport) {
    eprintln!(
        "{}  {} pages  {}ms  {} → {}  ({:.0}%)",
        green("✔"),
        bold(&report.page_count.to_string()),
        report.timings.total_ms,
        dim(&format!("{} B", report.input_bytes)),
        dim(&format!("{} B", report.output_bytes)),
        report.size_ratio() * 100.0,
    );
    eprintln!(
        "   created {}  /  modified {}",
        report.timestamps.creation(),
        report.timestamps.modification(),
    );
    for w in &report.warnings {
        eprintln!("   {} {}", yellow("⚠"), w);
    }
}
