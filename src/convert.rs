//! Conversion entry points.
//!
//! ```text
//! input ──▶ kind ──┬─ pdf ────▶ rasterise ───────────────┬─▶ encode ──▶ sink
//!                  └─ text ──▶ extract ─▶ paginate ─▶ render ┘
//! ```
//!
//! Everything up to the encoded bitmaps happens in memory; only the sink
//! performs I/O. Text pages are paginated up front but drawn one at a time,
//! in the same task that encodes and stores them, so at most
//! `config.concurrency` page bitmaps exist at once. PDF pages come out of
//! pdfium already rasterised. The returned items are sorted by page number
//! regardless of completion order.

use crate::config::ConversionConfig;
use crate::document::{base_name, dotted_extension, DocumentKind};
use crate::error::Doc2PagesError;
use crate::layout::font::{resolve_font, PageFont};
use crate::layout::render::render_page;
use crate::layout::{Page, PageGeometry, Paginator};
use crate::output::{ConversionOutput, ConversionStats, DocumentInfo, RenderedPage, StoredPage};
use crate::pipeline::{encode, extract, input, rasterize};
use crate::sink::PageSink;
use futures::stream::{self, StreamExt};
use image::DynamicImage;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert a document file or URL and store its pages in `sink`.
///
/// # Arguments
/// * `input_str`: local file path or HTTP/HTTPS URL
/// * `sink`: destination for the encoded pages
/// * `config`: conversion configuration
///
/// # Errors
/// Fails on the first unreadable input, unsupported kind, layout problem or
/// page that cannot be stored.
pub async fn convert(
    input_str: impl AsRef<str>,
    sink: &dyn PageSink,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Doc2PagesError> {
    let input_str = input_str.as_ref();
    info!("Starting conversion: {}", input_str);

    let loaded = input::resolve_input(input_str, config.download_timeout_secs).await?;
    convert_bytes(&loaded.bytes, &loaded.source_name, sink, config).await
}

/// Convert a document already in memory.
///
/// `source_name` is the file name or object key; its extension selects the
/// document kind and its stem names the output pages.
pub async fn convert_bytes(
    bytes: &[u8],
    source_name: &str,
    sink: &dyn PageSink,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Doc2PagesError> {
    let total_start = Instant::now();

    let render_start = Instant::now();
    let rendered = render_inner(bytes, source_name, config).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!(
        "Prepared {} {} pages in {}ms",
        rendered.pages.len(),
        rendered.kind,
        render_duration_ms
    );

    let store_start = Instant::now();
    let filename = base_name(source_name);
    let pages = store_pages(rendered.pages, &filename, sink, config).await?;
    let store_duration_ms = store_start.elapsed().as_millis() as u64;

    let stats = ConversionStats {
        page_count: pages.len(),
        render_duration_ms,
        store_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };
    info!(
        "Conversion complete: {} pages, {}ms total",
        stats.page_count, stats.total_duration_ms
    );

    Ok(ConversionOutput {
        kind: rendered.kind,
        title: rendered.title,
        pages,
        stats,
    })
}

/// Produce the page bitmaps without storing them.
pub async fn render_document(
    bytes: &[u8],
    source_name: &str,
    config: &ConversionConfig,
) -> Result<Vec<RenderedPage>, Doc2PagesError> {
    let pages = render_inner(bytes, source_name, config).await?.pages;
    tokio::task::spawn_blocking(move || {
        pages
            .into_iter()
            .map(PendingPage::into_rendered)
            .collect()
    })
    .await
    .map_err(|e| Doc2PagesError::Internal(format!("Render task panicked: {}", e)))
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    sink: &dyn PageSink,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Doc2PagesError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Doc2PagesError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_str, sink, config))
}

/// Report page count and metadata without rendering or storing anything.
///
/// Text documents are extracted and paginated; PDFs are only opened.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<DocumentInfo, Doc2PagesError> {
    let loaded =
        input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    let kind = resolve_kind(&loaded.source_name)?;

    if kind == DocumentKind::Pdf {
        return rasterize::inspect_pdf(&loaded.bytes, &loaded.source_name).await;
    }

    let extracted = extract::extract_plain_text(&loaded.bytes, kind, &loaded.source_name)?;
    let pages = Paginator::new(config.geometry)
        .paginate(&extracted.text, Some(extracted.title.as_str()))?;
    Ok(DocumentInfo {
        kind,
        page_count: pages.len(),
        title: Some(extracted.title),
        author: None,
        producer: None,
        pdf_version: None,
    })
}

// ── Internals ────────────────────────────────────────────────────────────

struct RenderedDocument {
    kind: DocumentKind,
    title: Option<String>,
    pages: Vec<PendingPage>,
}

/// What a text page is drawn with.
struct TextLayout {
    title: String,
    geometry: PageGeometry,
    font: PageFont,
}

/// A page that is either a finished bitmap or paginated text still to be
/// drawn.
enum PendingPage {
    Bitmap(RenderedPage),
    Text {
        page_num: usize,
        page: Page,
        layout: Arc<TextLayout>,
    },
}

impl PendingPage {
    fn page_num(&self) -> usize {
        match self {
            PendingPage::Bitmap(rendered) => rendered.page_num,
            PendingPage::Text { page_num, .. } => *page_num,
        }
    }

    /// Draw text pages; bitmaps pass through.
    fn into_rendered(self) -> RenderedPage {
        match self {
            PendingPage::Bitmap(rendered) => rendered,
            PendingPage::Text {
                page_num,
                page,
                layout,
            } => {
                let image = render_page(
                    &page,
                    Some(layout.title.as_str()),
                    &layout.geometry,
                    &layout.font,
                );
                debug!("Rendered text page {} ({} lines)", page_num, page.len());
                RenderedPage {
                    page_num,
                    image: DynamicImage::ImageRgb8(image),
                }
            }
        }
    }
}

fn resolve_kind(source_name: &str) -> Result<DocumentKind, Doc2PagesError> {
    DocumentKind::from_path(source_name).ok_or_else(|| Doc2PagesError::UnsupportedDocument {
        extension: dotted_extension(source_name),
    })
}

async fn render_inner(
    bytes: &[u8],
    source_name: &str,
    config: &ConversionConfig,
) -> Result<RenderedDocument, Doc2PagesError> {
    let kind = resolve_kind(source_name)?;
    debug!("'{}' resolved to {}", source_name, kind);

    if !kind.is_text_based() {
        let pages = rasterize::rasterise_pdf(bytes, source_name, config).await?;
        return Ok(RenderedDocument {
            kind,
            title: None,
            pages: pages.into_iter().map(PendingPage::Bitmap).collect(),
        });
    }

    let extracted = extract::extract_plain_text(bytes, kind, source_name)?;
    let geometry = config.geometry;
    let pages =
        Paginator::new(geometry).paginate(&extracted.text, Some(extracted.title.as_str()))?;
    if pages.is_empty() {
        warn!("'{}' has no text; no pages produced", source_name);
    }

    let layout = Arc::new(TextLayout {
        title: extracted.title.clone(),
        geometry,
        font: resolve_font(config.font_face.as_deref(), geometry.font_size),
    });
    let pages = pages
        .into_iter()
        .enumerate()
        .map(|(i, page)| PendingPage::Text {
            page_num: i + 1,
            page,
            layout: Arc::clone(&layout),
        })
        .collect();

    Ok(RenderedDocument {
        kind,
        title: Some(extracted.title),
        pages,
    })
}

async fn store_pages(
    pages: Vec<PendingPage>,
    filename: &str,
    sink: &dyn PageSink,
    config: &ConversionConfig,
) -> Result<Vec<StoredPage>, Doc2PagesError> {
    let total_pages = pages.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(total_pages);
    }

    let format = config.image_format;
    let results: Vec<Result<StoredPage, Doc2PagesError>> =
        stream::iter(pages.into_iter().map(|page| async move {
            let page_num = page.page_num();
            let result = store_one(page, filename, sink, config).await;
            if let Some(ref cb) = config.progress_callback {
                match &result {
                    Ok(stored) => cb.on_page_stored(page_num, total_pages, &stored.key),
                    Err(e) => cb.on_page_error(page_num, total_pages, &e.to_string()),
                }
            }
            result
        }))
        .buffer_unordered(config.concurrency)
        .collect()
        .await;

    let success_count = results.iter().filter(|r| r.is_ok()).count();
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(total_pages, success_count);
    }
    debug!("Stored {}/{} {} pages", success_count, total_pages, format);

    let mut stored = Vec::with_capacity(results.len());
    let mut first_error = None;
    for result in results {
        match result {
            Ok(page) => stored.push(page),
            Err(e) => {
                warn!("Page store failed: {}", e);
                first_error.get_or_insert(e);
            }
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }

    stored.sort_by_key(|p| p.page);
    Ok(stored)
}

async fn store_one(
    page: PendingPage,
    filename: &str,
    sink: &dyn PageSink,
    config: &ConversionConfig,
) -> Result<StoredPage, Doc2PagesError> {
    let page_num = page.page_num();
    let format = config.image_format;

    let bytes = tokio::task::spawn_blocking(move || {
        let rendered = page.into_rendered();
        encode::encode_numbered(&rendered.image, format, page_num)
    })
    .await
    .map_err(|e| Doc2PagesError::Internal(format!("Encode task panicked: {}", e)))??;

    let key = config.page_key(filename, page_num);
    let location = sink
        .store(page_num, &key, bytes, format.mime_type())
        .await?;
    debug!("Page {} stored at {}", page_num, location);

    Ok(StoredPage {
        key,
        page: page_num,
        filename: filename.to_string(),
        file_id: config.file_id.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::PageGeometry;
    use crate::sink::MemorySink;

    fn small_config() -> ConversionConfig {
        let geometry = PageGeometry::builder()
            .page_size(300, 200)
            .margin(20)
            .font_size(10)
            .line_height(20)
            .max_chars_per_line(20)
            .build()
            .unwrap();
        ConversionConfig::builder()
            .geometry(geometry)
            .output_prefix("out")
            .file_id("f-1")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn unsupported_extension_is_rejected() {
        let sink = MemorySink::new();
        let err = convert_bytes(b"a,b", "sheet.xlsx", &sink, &small_config())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "File type .xlsx not supported for conversion");
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn text_pages_are_stored_in_order() {
        let sink = MemorySink::new();
        let text = (1..=20).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let out = convert_bytes(text.as_bytes(), "in/notes.txt", &sink, &small_config())
            .await
            .unwrap();

        assert_eq!(out.kind, DocumentKind::Text);
        assert_eq!(out.title.as_deref(), Some("notes"));
        assert!(out.pages.len() > 1);
        for (i, page) in out.pages.iter().enumerate() {
            assert_eq!(page.page, i + 1);
            assert_eq!(page.key, format!("out/notes-{}.png", i + 1));
            assert_eq!(page.filename, "notes");
            assert_eq!(page.file_id, "f-1");
            let obj = sink.get(&page.key).unwrap();
            assert_eq!(obj.content_type, "image/png");
        }
        assert_eq!(out.stats.page_count, out.pages.len());
    }

    #[tokio::test]
    async fn empty_text_produces_no_pages() {
        let sink = MemorySink::new();
        let out = convert_bytes(b"", "empty.txt", &sink, &small_config())
            .await
            .unwrap();
        assert!(out.pages.is_empty());
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn render_document_matches_page_geometry() {
        let pages = render_document(b"# Hi\n\nthere", "a.md", &small_config())
            .await
            .unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!((pages[0].width(), pages[0].height()), (300, 200));
    }

    #[tokio::test]
    async fn text_pages_are_drawn_only_when_stored() {
        let text = (1..=20).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let doc = render_inner(text.as_bytes(), "a.txt", &small_config())
            .await
            .unwrap();
        assert_eq!(doc.pages.len(), 3);
        for (i, page) in doc.pages.iter().enumerate() {
            assert!(matches!(page, PendingPage::Text { .. }));
            assert_eq!(page.page_num(), i + 1);
        }

        let drawn = doc.pages.into_iter().next().unwrap().into_rendered();
        assert_eq!(drawn.page_num, 1);
        assert_eq!((drawn.width(), drawn.height()), (300, 200));
    }

    #[tokio::test]
    async fn pdf_kind_goes_to_the_rasteriser() {
        let err = render_inner(b"plain text", "scan.pdf", &small_config())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Doc2PagesError::NotAPdf { .. }));
    }

    #[tokio::test]
    async fn inspect_counts_text_pages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.txt");
        std::fs::write(&path, "x\n".repeat(50)).unwrap();

        let config = small_config();
        let info = inspect(path.to_str().unwrap(), &config).await.unwrap();
        let rendered = render_document(&std::fs::read(&path).unwrap(), "long.txt", &config)
            .await
            .unwrap();
        assert_eq!(info.kind, DocumentKind::Text);
        assert_eq!(info.page_count, rendered.len());
        assert_eq!(info.title.as_deref(), Some("long"));
    }
}
