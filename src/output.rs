//! Result types returned by the conversion entry points.

use crate::document::DocumentKind;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// A finished page bitmap tagged with its 1-based page number.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub page_num: usize,
    pub image: DynamicImage,
}

impl RenderedPage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// One stored page, as handed to the next pipeline step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPage {
    /// Object key (or relative path) the page was written under.
    pub key: String,
    /// 1-based page number.
    pub page: usize,
    /// Source file name without its extension.
    pub filename: String,
    /// Caller-supplied identifier of the source document.
    pub file_id: String,
}

/// Timing and count summary for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages produced and stored.
    pub page_count: usize,
    /// Time spent extracting, laying out and rasterising.
    pub render_duration_ms: u64,
    /// Time spent encoding and writing to the sink.
    pub store_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Full result of a document conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    pub kind: DocumentKind,
    /// Display title (the file stem); `None` for PDFs, which carry their own.
    pub title: Option<String>,
    /// Stored pages in page order.
    pub pages: Vec<StoredPage>,
    pub stats: ConversionStats,
}

/// Document facts gathered without storing anything.
///
/// For PDFs this comes from the document info dictionary; for text documents
/// the page count is what the paginator would produce and the title is the
/// file stem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub kind: DocumentKind,
    pub page_count: usize,
    pub title: Option<String>,
    pub author: Option<String>,
    pub producer: Option<String>,
    pub pdf_version: Option<String>,
}
