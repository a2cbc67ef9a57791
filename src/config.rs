//! Configuration types for document-to-page-image conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The struct is created once at process
//! start (from CLI flags or environment variables) and passed down to every
//! stage; nothing in the pipeline reads the environment on its own.

use crate::error::Doc2PagesError;
use crate::layout::PageGeometry;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Configuration for a document conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_doc2pages::{ConversionConfig, ImageFormat};
///
/// let config = ConversionConfig::builder()
///     .image_format(ImageFormat::Jpeg)
///     .output_prefix("images")
///     .pdf_dpi(150)
///     .build()
///     .unwrap();
/// assert_eq!(config.pdf_dpi, 150);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Page size, margins and line metrics for text documents.
    pub geometry: PageGeometry,

    /// Bitmap face used for text pages. `None` uses the default face.
    ///
    /// An unknown face is not an error: rendering falls back to the default
    /// face and logs a warning.
    pub font_face: Option<String>,

    /// Encoding of stored pages. Default: PNG.
    pub image_format: ImageFormat,

    /// Key prefix under which pages are stored. Default: empty.
    pub output_prefix: String,

    /// Identifier echoed back in every [`crate::output::StoredPage`].
    pub file_id: String,

    /// Rendering DPI used when rasterising PDF pages. Range: 36–400. Default: 100.
    pub pdf_dpi: u32,

    /// Maximum rendered PDF page dimension in pixels. Default: 4000.
    ///
    /// Caps either edge of very large pages (posters, drawings) so a single
    /// page cannot exhaust memory regardless of DPI.
    pub max_rendered_pixels: u32,

    /// Number of pages encoded and stored concurrently. Default: 4.
    pub concurrency: usize,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            geometry: PageGeometry::default(),
            font_face: None,
            image_format: ImageFormat::default(),
            output_prefix: String::new(),
            file_id: String::new(),
            pdf_dpi: 100,
            max_rendered_pixels: 4000,
            concurrency: 4,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("geometry", &self.geometry)
            .field("font_face", &self.font_face)
            .field("image_format", &self.image_format)
            .field("output_prefix", &self.output_prefix)
            .field("file_id", &self.file_id)
            .field("pdf_dpi", &self.pdf_dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("concurrency", &self.concurrency)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Storage key for page `page_num` of the document named `filename`.
    ///
    /// `{prefix}/{filename}-{page}.{ext}`, or without the prefix segment when
    /// the prefix is empty.
    pub fn page_key(&self, filename: &str, page_num: usize) -> String {
        let name = format!("{}-{}.{}", filename, page_num, self.image_format.extension());
        let prefix = self.output_prefix.trim_end_matches('/');
        if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        }
    }
}

/// Builder for [`ConversionConfig`].
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl fmt::Debug for ConversionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ConversionConfigBuilder {
    pub fn geometry(mut self, geometry: PageGeometry) -> Self {
        self.config.geometry = geometry;
        self
    }

    pub fn font_face(mut self, face: impl Into<String>) -> Self {
        self.config.font_face = Some(face.into());
        self
    }

    pub fn image_format(mut self, format: ImageFormat) -> Self {
        self.config.image_format = format;
        self
    }

    pub fn output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.output_prefix = prefix.into();
        self
    }

    pub fn file_id(mut self, id: impl Into<String>) -> Self {
        self.config.file_id = id.into();
        self
    }

    pub fn pdf_dpi(mut self, dpi: u32) -> Self {
        self.config.pdf_dpi = dpi.clamp(36, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Doc2PagesError> {
        let c = &self.config;
        c.geometry.validate()?;
        if c.pdf_dpi < 36 || c.pdf_dpi > 400 {
            return Err(Doc2PagesError::InvalidConfig(format!(
                "PDF DPI must be 36–400, got {}",
                c.pdf_dpi
            )));
        }
        if c.concurrency == 0 {
            return Err(Doc2PagesError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Raster encoding of stored pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Lossless; the default.
    #[default]
    Png,
    /// Quality 100 JPEG; much smaller for scanned PDFs.
    Jpeg,
}

impl ImageFormat {
    /// File extension, also used as the `image/<ext>` subtype.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ImageFormat {
    type Err = Doc2PagesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            other => Err(Doc2PagesError::InvalidConfig(format!(
                "Unsupported image format '{other}' (expected png or jpeg)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_handler() {
        let c = ConversionConfig::default();
        assert_eq!(c.image_format, ImageFormat::Png);
        assert_eq!(c.pdf_dpi, 100);
        assert!(c.output_prefix.is_empty());
        assert_eq!(c.geometry, PageGeometry::default());
    }

    #[test]
    fn builder_clamps_dpi_and_concurrency() {
        let c = ConversionConfig::builder()
            .pdf_dpi(10_000)
            .concurrency(0)
            .build()
            .unwrap();
        assert_eq!(c.pdf_dpi, 400);
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn builder_rejects_invalid_geometry() {
        let mut g = PageGeometry::default();
        g.margin = 5000;
        let err = ConversionConfig::builder().geometry(g).build().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn page_key_with_and_without_prefix() {
        let c = ConversionConfig::builder()
            .output_prefix("images/")
            .build()
            .unwrap();
        assert_eq!(c.page_key("report", 3), "images/report-3.png");

        let c = ConversionConfig::builder()
            .image_format(ImageFormat::Jpeg)
            .build()
            .unwrap();
        assert_eq!(c.page_key("report", 1), "report-1.jpeg");
    }

    #[test]
    fn image_format_parsing() {
        assert_eq!("PNG".parse::<ImageFormat>().unwrap(), ImageFormat::Png);
        assert_eq!("jpg".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert_eq!("jpeg".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert!("gif".parse::<ImageFormat>().is_err());
        assert_eq!(ImageFormat::Jpeg.mime_type(), "image/jpeg");
    }
}
