//! # edgequake-doc2pages
//!
//! Convert PDF, DOCX, TXT and Markdown documents into one image per page.
//!
//! PDFs are rasterised by pdfium. Every other kind is reduced to plain text,
//! word-wrapped to a fixed character width, split into fixed-capacity pages
//! and drawn onto white bitmaps with the file name as a title on page one.
//! Downstream steps (OCR, vision models, thumbnails) then see every document
//! the same way: as a numbered series of page images.
//!
//! ## Pipeline Overview
//!
//! ```text
//! document
//!  │
//!  ├─ 1. Input     local file or HTTP(S) download, held in memory
//!  ├─ 2. Kind      extension → PDF | DOCX | TXT | Markdown
//!  ├─ 3. Render    PDF: pdfium (spawn_blocking)
//!  │               text: extract → wrap → paginate → draw
//!  ├─ 4. Encode    PNG or JPEG (quality 100)
//!  └─ 5. Store     PageSink: directory, memory or S3, bounded concurrency
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_doc2pages::{convert, ConversionConfig, DirectorySink};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder().output_prefix("pages").build()?;
//!     let sink = DirectorySink::new("out");
//!     let output = convert("notes.md", &sink, &config).await?;
//!     for page in &output.pages {
//!         println!("{} → {}", page.page, page.key);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Paginating without rendering
//!
//! ```rust
//! use edgequake_doc2pages::{PageGeometry, Paginator};
//!
//! let pages = Paginator::new(PageGeometry::default())
//!     .paginate("first line\nsecond line", Some("Title"))
//!     .unwrap();
//! assert_eq!(pages.len(), 1);
//! assert_eq!(pages[0].lines(), ["first line", "second line"]);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | The `doc2pages` binary (clap + anyhow + indicatif + tracing-subscriber) |
//! | `s3`     | off     | [`S3Sink`] page uploads via aws-sdk-s3 |
//! | `lambda` | off     | The step-function handler and `doc2pages-lambda` binary (implies `s3`) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-doc2pages = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod document;
pub mod error;
#[cfg(feature = "lambda")]
pub mod lambda;
pub mod layout;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod sink;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, ImageFormat};
pub use convert::{convert, convert_bytes, convert_sync, inspect, render_document};
pub use document::DocumentKind;
pub use error::{Doc2PagesError, LayoutError, RenderError};
pub use layout::font::{load_font, resolve_font, PageFont};
pub use layout::render::{render_page, render_pages, render_text};
pub use layout::{Page, PageGeometry, PageGeometryBuilder, Paginator, TextMeasure};
pub use output::{ConversionOutput, ConversionStats, DocumentInfo, RenderedPage, StoredPage};
pub use pipeline::extract::{extract_plain_text, strip_html, ExtractedText};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
#[cfg(feature = "s3")]
pub use sink::S3Sink;
pub use sink::{DirectorySink, MemorySink, PageSink};
