//! CLI binary for edgequake-doc2pages.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and writes page images into a directory.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_doc2pages::{
    convert, inspect, ConversionConfig, ConversionProgressCallback, DirectorySink, ImageFormat,
    PageGeometry, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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

const SPINNER_TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per stored page. Pages finish out of
/// order when `--concurrency` is above one.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    /// The bar starts as a spinner; `on_conversion_start` sets its length.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(SPINNER_TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Rendering pages…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(SPINNER_TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Storing");
        self.bar.reset_eta();
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Writing {total_pages} page images…"))
        ));
    }

    fn on_page_stored(&self, page_num: usize, total_pages: usize, key: &str) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim(key),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let msg = match error.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page_num,
            total_pages,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        let failed = total_pages.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages written",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages written  ({} failed)",
                if failed == total_pages {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Render a Markdown file into ./notes-1.png, ./notes-2.png, ...
  doc2pages notes.md

  # Write JPEG pages under out/pages/
  doc2pages report.docx -o out --prefix pages --format jpeg

  # Rasterise a PDF from a URL at 150 DPI
  doc2pages https://arxiv.org/pdf/1706.03762 --dpi 150 -o attention

  # Smaller text pages with a narrower wrap width
  doc2pages README.txt --page-width 1240 --page-height 1754 --margin 100 \
      --font-size 20 --max-chars 60

  # Page count and metadata only
  doc2pages --inspect-only document.pdf

  # JSON summary of the stored pages
  doc2pages --json notes.md > pages.json

SUPPORTED DOCUMENTS:
  .pdf        rasterised page by page with pdfium
  .docx       paragraph text, laid out as text pages
  .txt        laid out as text pages
  .md         Markdown syntax stripped, then laid out as text pages

FONTS (--font):
  6x10  6x13  7x13  7x14  8x13  9x15  9x18  10x20 (default)
  Glyphs are scaled by whole multiples to approach --font-size.

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory); the system
                          library is used when unset
  RUST_LOG                Override the log filter (e.g. doc2pages=debug)
"#;

/// Convert PDF, DOCX, TXT and Markdown documents into page images.
#[derive(Parser, Debug)]
#[command(
    name = "doc2pages",
    version,
    about = "Convert PDF, DOCX, TXT and Markdown documents into page images",
    long_about = "Convert documents (local files or URLs) into one PNG or JPEG image per page. \
PDFs are rasterised with pdfium; DOCX, TXT and Markdown are reduced to plain text, word-wrapped \
and drawn onto fixed-size pages with the file name as a title.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local document path or HTTP/HTTPS URL.
    input: String,

    /// Directory that receives the page images.
    #[arg(short, long, env = "DOC2PAGES_OUTPUT", default_value = ".")]
    output: PathBuf,

    /// Page image format: png or jpeg.
    #[arg(long, env = "DOC2PAGES_FORMAT", default_value = "png")]
    format: ImageFormat,

    /// Key prefix (sub-directory) for every page image.
    #[arg(long, env = "DOC2PAGES_PREFIX", default_value = "")]
    prefix: String,

    /// Identifier echoed into every stored page record.
    #[arg(long, env = "DOC2PAGES_FILE_ID", default_value = "")]
    file_id: String,

    /// Text page width in pixels.
    #[arg(long, env = "DOC2PAGES_PAGE_WIDTH")]
    page_width: Option<u32>,

    /// Text page height in pixels.
    #[arg(long, env = "DOC2PAGES_PAGE_HEIGHT")]
    page_height: Option<u32>,

    /// Margin on all four sides, in pixels.
    #[arg(long, env = "DOC2PAGES_MARGIN")]
    margin: Option<u32>,

    /// Nominal font size in pixels.
    #[arg(long, env = "DOC2PAGES_FONT_SIZE")]
    font_size: Option<u32>,

    /// Distance between baselines in pixels (default: 1.5 × font size).
    #[arg(long, env = "DOC2PAGES_LINE_HEIGHT")]
    line_height: Option<u32>,

    /// Wrap width in characters.
    #[arg(long = "max-chars", env = "DOC2PAGES_MAX_CHARS")]
    max_chars: Option<usize>,

    /// Bitmap font face, e.g. 10x20.
    #[arg(long = "font", env = "DOC2PAGES_FONT")]
    font: Option<String>,

    /// PDF rendering DPI (36–400).
    #[arg(long, env = "DOC2PAGES_DPI", default_value_t = 100,
          value_parser = clap::value_parser!(u32).range(36..=400))]
    dpi: u32,

    /// Pages encoded and written concurrently.
    #[arg(short, long, env = "DOC2PAGES_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "DOC2PAGES_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print a JSON summary (ConversionOutput) to stdout.
    #[arg(long, env = "DOC2PAGES_JSON")]
    json: bool,

    /// Print page count and metadata only, no rendering.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "DOC2PAGES_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC2PAGES_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOC2PAGES_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless --verbose is given.
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

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect document")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            println!("Kind:         {}", info.kind);
            println!("Pages:        {}", info.page_count);
            if let Some(ref t) = info.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = info.author {
                println!("Author:       {}", a);
            }
            if let Some(ref v) = info.pdf_version {
                println!("PDF Version:  {}", v);
            }
            if let Some(ref p) = info.producer {
                println!("Producer:     {}", p);
            }
        }
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let sink = DirectorySink::new(&cli.output);
    let output = convert(&cli.input, &sink, &config)
        .await
        .context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        eprintln!(
            "{}  {} {} pages  {}ms  →  {}",
            green("✔"),
            output.stats.page_count,
            output.kind,
            output.stats.total_duration_ms,
            bold(&cli.output.display().to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut geometry = PageGeometry::builder();
    if let Some(w) = cli.page_width {
        geometry = geometry.page_width(w);
    }
    if let Some(h) = cli.page_height {
        geometry = geometry.page_height(h);
    }
    if let Some(m) = cli.margin {
        geometry = geometry.margin(m);
    }
    if let Some(size) = cli.font_size {
        geometry = geometry.font_size(size);
    }
    if let Some(lh) = cli.line_height {
        geometry = geometry.line_height(lh);
    }
    if let Some(n) = cli.max_chars {
        geometry = geometry.max_chars_per_line(n);
    }
    let geometry = geometry.build().context("Invalid page geometry")?;

    let mut builder = ConversionConfig::builder()
        .geometry(geometry)
        .image_format(cli.format)
        .output_prefix(cli.prefix.clone())
        .file_id(cli.file_id.clone())
        .pdf_dpi(cli.dpi)
        .concurrency(cli.concurrency)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref face) = cli.font {
        builder = builder.font_face(face.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
