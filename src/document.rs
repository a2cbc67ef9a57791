//! Supported document kinds.
//!
//! Dispatch happens on the file extension. PDFs are rasterised page by page;
//! every other kind is reduced to plain text and laid out by the paginator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// The closed set of document kinds the pipeline converts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Rasterised directly by pdfium.
    Pdf,
    /// Word document (`.docx`, and `.doc` names routed the same way).
    Docx,
    /// Plain UTF-8 text.
    Text,
    /// Markdown, flattened to text before layout.
    Markdown,
}

impl DocumentKind {
    /// Map a file extension (with or without the leading dot) to a kind.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "doc" | "docx" => Some(DocumentKind::Docx),
            "txt" => Some(DocumentKind::Text),
            "md" => Some(DocumentKind::Markdown),
            _ => None,
        }
    }

    /// Map a path or object key to a kind using its last extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// True for kinds that go through the text paginator.
    pub fn is_text_based(&self) -> bool {
        !matches!(self, DocumentKind::Pdf)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DocumentKind::Pdf => "PDF",
            DocumentKind::Docx => "DOCX",
            DocumentKind::Text => "TXT",
            DocumentKind::Markdown => "Markdown",
        };
        f.write_str(s)
    }
}

/// Lower-cased extension of `path` including the dot, or `""` if none.
///
/// Used in "not supported" messages so they read `.xlsx` rather than `xlsx`.
pub fn dotted_extension(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// File stem of `path` up to its first dot (`report.final.pdf` → `report`).
pub fn base_name(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.split('.').next().unwrap_or(n).to_string())
        .unwrap_or_default()
}
