//! Fixed-width bitmap faces used to draw text pages.
//!
//! Faces come from embedded-graphics' ISO-8859-1 mono fonts, so every glyph
//! cell has the same advance and wrapping by character count matches what
//! ends up on the page. The cell is scaled by an integer factor to approach
//! the requested font size: a 36 px font draws the 10×20 face at 2×.
//!
//! A face that cannot be loaded is not fatal. [`resolve_font`] logs the
//! problem and carries on with [`DEFAULT_FACE`].

use crate::error::RenderError;
use embedded_graphics::mono_font::iso_8859_1::{
    FONT_10X20, FONT_6X10, FONT_6X13, FONT_7X13, FONT_7X14, FONT_8X13, FONT_9X15, FONT_9X18,
};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use tracing::{debug, warn};

/// Face used when none is requested or the requested one is unavailable.
pub const DEFAULT_FACE: &str = "10x20";

const FACES: &[(&str, &MonoFont<'static>)] = &[
    ("6x10", &FONT_6X10),
    ("6x13", &FONT_6X13),
    ("7x13", &FONT_7X13),
    ("7x14", &FONT_7X14),
    ("8x13", &FONT_8X13),
    ("9x15", &FONT_9X15),
    ("9x18", &FONT_9X18),
    ("10x20", &FONT_10X20),
];

/// Names of every face [`load_font`] understands.
pub fn known_faces() -> impl Iterator<Item = &'static str> {
    FACES.iter().map(|(name, _)| *name)
}

fn lookup(face: &str) -> Option<(&'static str, &'static MonoFont<'static>)> {
    let wanted = face.trim().to_ascii_lowercase();
    FACES
        .iter()
        .find(|(name, _)| *name == wanted)
        .map(|(name, font)| (*name, *font))
}

/// A loaded face plus the integer scale it is drawn at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageFont {
    face: &'static str,
    scale: u32,
}

impl PageFont {
    pub fn face(&self) -> &'static str {
        self.face
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Glyph cell in page pixels (width, height) after scaling.
    pub fn cell_size(&self) -> (u32, u32) {
        let font = self.mono_font();
        let advance = font.character_size.width + font.character_spacing;
        (advance * self.scale, font.character_size.height * self.scale)
    }

    /// Rendered width of `text` in page pixels.
    pub fn text_width(&self, text: &str) -> u32 {
        self.cell_size().0 * text.chars().count() as u32
    }

    pub(crate) fn mono_font(&self) -> &'static MonoFont<'static> {
        lookup(self.face).map_or(&FONT_10X20, |(_, font)| font)
    }

    pub(crate) fn style(&self) -> MonoTextStyle<'static, BinaryColor> {
        MonoTextStyle::new(self.mono_font(), BinaryColor::On)
    }
}

/// Load `face` (or the default face when `None`) scaled for `font_size`.
pub fn load_font(face: Option<&str>, font_size: u32) -> Result<PageFont, RenderError> {
    let requested = face.unwrap_or(DEFAULT_FACE);
    let (name, font) = lookup(requested).ok_or_else(|| RenderError::FontUnavailable {
        face: requested.to_string(),
        known: known_faces().collect::<Vec<_>>().join(", "),
    })?;

    let cell_height = font.character_size.height.max(1);
    let scale = ((font_size as f32 / cell_height as f32).round() as u32).max(1);
    debug!("Loaded font face {} at {}x for {}px", name, scale, font_size);

    Ok(PageFont { face: name, scale })
}

/// Like [`load_font`], but never fails: an unavailable face degrades to
/// [`DEFAULT_FACE`].
pub fn resolve_font(face: Option<&str>, font_size: u32) -> PageFont {
    match load_font(face, font_size) {
        Ok(font) => font,
        Err(e) => {
            warn!("{}; falling back to '{}'", e, DEFAULT_FACE);
            load_font(None, font_size).unwrap_or(PageFont {
                face: DEFAULT_FACE,
                scale: 1,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_face_scales_to_36px() {
        let font = load_font(None, 36).unwrap();
        assert_eq!(font.face(), "10x20");
        assert_eq!(font.scale(), 2);
        assert_eq!(font.cell_size(), (20, 40));
    }

    #[test]
    fn tiny_font_size_never_scales_below_one() {
        let font = load_font(Some("6x10"), 1).unwrap();
        assert_eq!(font.scale(), 1);
    }

    #[test]
    fn face_names_are_case_insensitive() {
        assert_eq!(load_font(Some(" 9X18 "), 18).unwrap().face(), "9x18");
    }

    #[test]
    fn unknown_face_is_a_render_error() {
        let err = load_font(Some("DejaVuSans"), 36).unwrap_err();
        match err {
            RenderError::FontUnavailable { face, known } => {
                assert_eq!(face, "DejaVuSans");
                assert!(known.contains("10x20"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_face_falls_back_to_default() {
        let font = resolve_font(Some("DejaVuSans"), 36);
        assert_eq!(font, load_font(None, 36).unwrap());
    }

    #[test]
    fn text_width_is_monospace() {
        let font = load_font(None, 20).unwrap();
        assert_eq!(font.text_width("abc"), 3 * font.cell_size().0);
        assert_eq!(font.text_width(""), 0);
    }

    #[test]
    fn default_geometry_fits_eighty_columns() {
        let g = crate::PageGeometry::default();
        let font = load_font(None, g.font_size).unwrap();
        let line = "x".repeat(g.max_chars_per_line);
        assert!(font.text_width(&line) <= g.page_width - 2 * g.margin);
        assert!(font.cell_size().1 <= g.line_height);
    }
}
