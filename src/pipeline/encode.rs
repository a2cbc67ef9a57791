//! Image encoding: `DynamicImage` → PNG or JPEG bytes for the sink.
//!
//! JPEG is written at quality 100 from an RGB8 copy; the JPEG encoder has no
//! alpha channel and pdfium bitmaps come back as RGBA.

use crate::config::ImageFormat;
use crate::error::RenderError;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// JPEG quality used for every encoded page.
pub const JPEG_QUALITY: u8 = 100;

/// Encode one page bitmap.
pub fn encode_page(img: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    match format {
        ImageFormat::Png => {
            img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
        }
        ImageFormat::Jpeg => {
            let rgb = img.to_rgb8();
            JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY).encode_image(&rgb)?;
        }
    }
    debug!(
        "Encoded {}x{} page → {} bytes {}",
        img.width(),
        img.height(),
        buf.len(),
        format
    );
    Ok(buf)
}

/// [`encode_page`] with the failure tagged by page number.
pub fn encode_numbered(
    img: &DynamicImage,
    format: ImageFormat,
    page: usize,
) -> Result<Vec<u8>, RenderError> {
    encode_page(img, format).map_err(|e| RenderError::Encode {
        page,
        format: format.to_string(),
        detail: e.to_string(),
    })
}
