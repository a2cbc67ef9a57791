//! PDF rasterisation: render every page to a `DynamicImage` via pdfium.
//!
//! pdfium is not async-safe, so all work runs inside
//! `tokio::task::spawn_blocking`. Documents are loaded straight from the
//! in-memory bytes; nothing touches the filesystem.
//!
//! ## Binding
//!
//! The library is bound at call time:
//!
//! 1. `PDFIUM_LIB_PATH`, either the library file itself or the directory
//!    holding it;
//! 2. the system library (`LD_LIBRARY_PATH`, `/usr/lib`, …).
//!
//! ## Resolution
//!
//! Pages render at `pdf_dpi` (points × dpi / 72) with either edge capped at
//! `max_rendered_pixels`, so an A0 poster cannot blow up memory.

use crate::config::ConversionConfig;
use crate::document::DocumentKind;
use crate::error::Doc2PagesError;
use crate::output::{DocumentInfo, RenderedPage};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming the pdfium library or its directory.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Resolve a `PDFIUM_LIB_PATH` value to the library file.
fn library_path_for(configured: &Path) -> PathBuf {
    if configured.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(configured)
    } else {
        configured.to_path_buf()
    }
}

/// Bind to pdfium, preferring `PDFIUM_LIB_PATH` over the system library.
pub fn bind_pdfium() -> Result<Pdfium, Doc2PagesError> {
    let mut attempts = Vec::new();

    if let Some(configured) = std::env::var_os(PDFIUM_LIB_PATH_ENV) {
        let path = library_path_for(Path::new(&configured));
        match Pdfium::bind_to_library(&path) {
            Ok(bindings) => {
                debug!("Bound pdfium from {}", path.display());
                return Ok(Pdfium::new(bindings));
            }
            Err(e) => {
                warn!("Could not bind pdfium at {}: {}", path.display(), e);
                attempts.push(format!("{}: {}", path.display(), e));
            }
        }
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => {
            debug!("Bound system pdfium library");
            Ok(Pdfium::new(bindings))
        }
        Err(e) => {
            attempts.push(format!("system library: {}", e));
            Err(Doc2PagesError::PdfiumBindingFailed(attempts.join("; ")))
        }
    }
}

/// Reject bytes that cannot be a PDF before handing them to pdfium.
fn check_magic(bytes: &[u8], name: &str) -> Result<(), Doc2PagesError> {
    if bytes.len() < PDF_MAGIC.len() {
        return Err(Doc2PagesError::CorruptPdf {
            name: name.to_string(),
            detail: format!("only {} bytes", bytes.len()),
        });
    }
    if &bytes[..4] != PDF_MAGIC {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(Doc2PagesError::NotAPdf {
            name: name.to_string(),
            magic,
        });
    }
    Ok(())
}

fn map_load_error(err: PdfiumError, name: &str) -> Doc2PagesError {
    let detail = format!("{:?}", err);
    if detail.contains("Password") || detail.contains("password") {
        Doc2PagesError::PasswordRequired {
            name: name.to_string(),
        }
    } else {
        Doc2PagesError::CorruptPdf {
            name: name.to_string(),
            detail,
        }
    }
}

/// Rasterise every page of a PDF, numbered from 1.
pub async fn rasterise_pdf(
    bytes: &[u8],
    name: &str,
    config: &ConversionConfig,
) -> Result<Vec<RenderedPage>, Doc2PagesError> {
    check_magic(bytes, name)?;

    let bytes = bytes.to_vec();
    let name = name.to_string();
    let dpi = config.pdf_dpi;
    let max_pixels = config.max_rendered_pixels;

    tokio::task::spawn_blocking(move || rasterise_blocking(&bytes, &name, dpi, max_pixels))
        .await
        .map_err(|e| Doc2PagesError::Internal(format!("Render task panicked: {}", e)))?
}

fn rasterise_blocking(
    bytes: &[u8],
    name: &str,
    dpi: u32,
    max_pixels: u32,
) -> Result<Vec<RenderedPage>, Doc2PagesError> {
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| map_load_error(e, name))?;

    let pages = document.pages();
    info!("PDF '{}' loaded: {} pages", name, pages.len());

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(dpi as f32 / 72.0)
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut rendered = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            Doc2PagesError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        rendered.push(RenderedPage {
            page_num: idx + 1,
            image,
        });
    }

    Ok(rendered)
}

/// Read page count and document info without rendering.
pub async fn inspect_pdf(bytes: &[u8], name: &str) -> Result<DocumentInfo, Doc2PagesError> {
    check_magic(bytes, name)?;

    let bytes = bytes.to_vec();
    let name = name.to_string();
    tokio::task::spawn_blocking(move || inspect_blocking(&bytes, &name))
        .await
        .map_err(|e| Doc2PagesError::Internal(format!("Inspect task panicked: {}", e)))?
}

fn inspect_blocking(bytes: &[u8], name: &str) -> Result<DocumentInfo, Doc2PagesError> {
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| map_load_error(e, name))?;

    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata
            .get(tag)
            .map(|t| t.value().to_string())
            .filter(|v| !v.is_empty())
    };

    Ok(DocumentInfo {
        kind: DocumentKind::Pdf,
        page_count: document.pages().len() as usize,
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        pdf_version: Some(format!("{:?}", document.version())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_accepts_pdf_header() {
        assert!(check_magic(b"%PDF-1.7\n", "a.pdf").is_ok());
    }

    #[test]
    fn magic_rejects_other_files() {
        match check_magic(b"PK\x03\x04rest", "a.pdf").unwrap_err() {
            Doc2PagesError::NotAPdf { name, magic } => {
                assert_eq!(name, "a.pdf");
                assert_eq!(&magic, b"PK\x03\x04");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn magic_rejects_truncated_input() {
        assert!(matches!(
            check_magic(b"%P", "a.pdf"),
            Err(Doc2PagesError::CorruptPdf { .. })
        ));
    }

    #[test]
    fn library_path_for_file_is_unchanged() {
        let p = Path::new("/opt/pdfium/lib/libpdfium.so");
        assert_eq!(library_path_for(p), p);
    }

    #[test]
    fn library_path_for_directory_appends_platform_name() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = library_path_for(dir.path());
        assert_eq!(resolved.parent(), Some(dir.path()));
        assert!(resolved
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.contains("pdfium")));
    }

    #[tokio::test]
    async fn rasterise_rejects_non_pdf_without_binding() {
        let config = ConversionConfig::default();
        let err = rasterise_pdf(b"hello world", "notes.pdf", &config)
            .await
            .unwrap_err();
        assert!(matches!(err, Doc2PagesError::NotAPdf { .. }));
    }
}
