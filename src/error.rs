//! Error types for the edgequake-doc2pages library.
//!
//! Two layers reflect two scopes of failure:
//!
//! * [`LayoutError`]: raised by the paginator itself. Its two variants stay
//!   distinct: a [`LayoutError::Configuration`] means the page
//!   geometry cannot hold even one line and must reach the caller untouched,
//!   while a [`RenderError`] is something the renderer can usually degrade
//!   around (a missing font face falls back to the default face).
//!
//! * [`Doc2PagesError`]: **Fatal** for a whole conversion: bad input,
//!   unreadable document, PDF engine unavailable, sink failure. Returned as
//!   `Err(Doc2PagesError)` from the top-level `convert*` functions.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the text paginator.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The page geometry is unusable (page too small for a single line, zero
    /// characters per line, margins larger than the page, …).
    #[error("Invalid page geometry: {0}")]
    Configuration(String),

    /// Drawing or font resources failed.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Failures while turning laid-out pages into bitmaps.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The requested font face is not available.
    #[error("Font face '{face}' is not available (known faces: {known})")]
    FontUnavailable { face: String, known: String },

    /// Encoding a finished bitmap into PNG/JPEG failed.
    #[error("Failed to encode page {page} as {format}: {detail}")]
    Encode {
        page: usize,
        format: String,
        detail: String,
    },
}

/// All fatal errors returned by the edgequake-doc2pages library.
#[derive(Debug, Error)]
pub enum Doc2PagesError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// A step-function task input is missing fields or has the wrong types.
    #[error("Invalid task event: {0}")]
    InvalidEvent(String),

    /// The object key does not follow the `<folder>/<file>.<ext>` layout.
    #[error("Invalid object key '{key}': expected '<folder>/<file>.<ext>'")]
    InvalidKey { key: String },

    // ── Document errors ───────────────────────────────────────────────────
    /// The extension does not map to a supported document kind.
    #[error("File type {extension} not supported for conversion")]
    UnsupportedDocument { extension: String },

    /// A text or Markdown document is not valid UTF-8.
    #[error("'{name}' is not valid UTF-8 text: {detail}")]
    InvalidText { name: String, detail: String },

    /// A DOCX archive is unreadable or has no main document part.
    #[error("'{name}' is not a readable DOCX document: {detail}")]
    InvalidDocx { name: String, detail: String },

    /// The bytes claim to be a PDF but do not start with `%PDF`.
    #[error("'{name}' is not a valid PDF\nFirst bytes: {magic:?}")]
    NotAPdf { name: String, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{name}' is corrupt: {detail}")]
    CorruptPdf { name: String, detail: String },

    /// PDF requires a password; the pipeline has no way to supply one.
    #[error("PDF '{name}' is encrypted and requires a password.")]
    PasswordRequired { name: String },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDF pages are rasterised by pdfium, which must be installed separately:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (or its directory), or\n\
  • Install libpdfium where the system loader can find it.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Layout errors ─────────────────────────────────────────────────────
    /// The paginator rejected the geometry or could not render.
    #[error(transparent)]
    Layout(#[from] LayoutError),

    // ── Output errors ─────────────────────────────────────────────────────
    /// A sink could not persist a page.
    #[error("Failed to store page {page} at '{location}': {detail}")]
    StoreFailed {
        page: usize,
        location: String,
        detail: String,
    },

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RenderError> for Doc2PagesError {
    fn from(e: RenderError) -> Self {
        Doc2PagesError::Layout(LayoutError::Render(e))
    }
}

impl Doc2PagesError {
    /// True when the failure comes from unusable page geometry.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Doc2PagesError::Layout(LayoutError::Configuration(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_propagates_unmodified() {
        let e: Doc2PagesError = LayoutError::Configuration("page too small".into()).into();
        assert!(e.is_configuration());
        assert_eq!(e.to_string(), "Invalid page geometry: page too small");
    }

    #[test]
    fn render_error_is_distinct_from_configuration() {
        let e: Doc2PagesError = RenderError::FontUnavailable {
            face: "comic".into(),
            known: "10x20".into(),
        }
        .into();
        assert!(!e.is_configuration());
        assert!(matches!(
            e,
            Doc2PagesError::Layout(LayoutError::Render(RenderError::FontUnavailable { .. }))
        ));
    }

    #[test]
    fn unsupported_display_matches_handler_message() {
        let e = Doc2PagesError::UnsupportedDocument {
            extension: ".xlsx".into(),
        };
        assert_eq!(e.to_string(), "File type .xlsx not supported for conversion");
    }

    #[test]
    fn store_failed_display() {
        let e = Doc2PagesError::StoreFailed {
            page: 3,
            location: "s3://bucket/out/doc-3.png".into(),
            detail: "access denied".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("page 3"), "got: {msg}");
        assert!(msg.contains("access denied"));
    }
}
