//! Page rendering: draw paginated text onto white bitmaps.
//!
//! Each page is an RGB bitmap of exactly `page_width × page_height`. The
//! title (first page only) sits at `(margin, margin)` and pushes the first
//! text line down by two line heights; every other line is drawn
//! left-aligned at the margin, one `line_height` below the previous.
//!
//! Lines are not re-measured here. Keeping them inside the page width is the
//! word-wrapper's job.

use super::font::PageFont;
use super::{Page, PageGeometry, Paginator};
use crate::error::LayoutError;
use crate::output::RenderedPage;
use embedded_graphics::geometry::{OriginDimensions, Point, Size};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use embedded_graphics::Pixel;
use image::{DynamicImage, Rgb, RgbImage};
use std::convert::Infallible;
use tracing::debug;

pub const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
pub const FOREGROUND: Rgb<u8> = Rgb([0, 0, 0]);

/// Draw target that maps glyph pixels onto the page, each one blown up to a
/// `scale × scale` block starting at `origin`.
struct GlyphCanvas<'a> {
    page: &'a mut RgbImage,
    origin: (u32, u32),
    scale: u32,
}

impl OriginDimensions for GlyphCanvas<'_> {
    fn size(&self) -> Size {
        let (w, h) = self.page.dimensions();
        Size::new(
            w.saturating_sub(self.origin.0) / self.scale,
            h.saturating_sub(self.origin.1) / self.scale,
        )
    }
}

impl DrawTarget for GlyphCanvas<'_> {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (w, h) = self.page.dimensions();
        for Pixel(point, color) in pixels {
            if color != BinaryColor::On || point.x < 0 || point.y < 0 {
                continue;
            }
            let x0 = self.origin.0 + point.x as u32 * self.scale;
            let y0 = self.origin.1 + point.y as u32 * self.scale;
            for y in y0..(y0 + self.scale).min(h) {
                for x in x0..(x0 + self.scale).min(w) {
                    self.page.put_pixel(x, y, FOREGROUND);
                }
            }
        }
        Ok(())
    }
}

fn draw_line(page: &mut RgbImage, text: &str, x: u32, y: u32, font: &PageFont) {
    if text.is_empty() || x >= page.width() || y >= page.height() {
        return;
    }
    let mut canvas = GlyphCanvas {
        page,
        origin: (x, y),
        scale: font.scale(),
    };
    match Text::with_baseline(text, Point::zero(), font.style(), Baseline::Top).draw(&mut canvas) {
        Ok(_) => {}
        Err(never) => match never {},
    }
}

/// Render one page to a bitmap.
///
/// `title` is drawn only when `page.is_first()` and it is non-empty.
pub fn render_page(
    page: &Page,
    title: Option<&str>,
    geometry: &PageGeometry,
    font: &PageFont,
) -> RgbImage {
    let mut img = RgbImage::from_pixel(geometry.page_width, geometry.page_height, BACKGROUND);
    let mut y = geometry.margin;

    if let Some(title) = title.filter(|t| page.is_first() && !t.is_empty()) {
        draw_line(&mut img, title, geometry.margin, y, font);
        y = y.saturating_add(geometry.line_height.saturating_mul(2));
    }

    for line in page.lines() {
        draw_line(&mut img, line, geometry.margin, y, font);
        y = y.saturating_add(geometry.line_height);
    }

    img
}

/// Render already-paginated pages, numbering them from 1.
pub fn render_pages(
    pages: &[Page],
    title: Option<&str>,
    geometry: &PageGeometry,
    font: &PageFont,
) -> Vec<RenderedPage> {
    pages
        .iter()
        .enumerate()
        .map(|(i, page)| {
            let image = render_page(page, title, geometry, font);
            debug!("Rendered text page {} ({} lines)", i + 1, page.len());
            RenderedPage {
                page_num: i + 1,
                image: DynamicImage::ImageRgb8(image),
            }
        })
        .collect()
}

/// Wrap, paginate and render `text` in one go.
pub fn render_text(
    text: &str,
    title: Option<&str>,
    geometry: &PageGeometry,
    font: &PageFont,
) -> Result<Vec<RenderedPage>, LayoutError> {
    let pages = Paginator::new(*geometry).paginate(text, title)?;
    Ok(render_pages(&pages, title, geometry, font))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::font::load_font;

    fn small_geometry() -> PageGeometry {
        PageGeometry::builder()
            .page_size(400, 300)
            .margin(20)
            .font_size(20)
            .line_height(30)
            .max_chars_per_line(15)
            .build()
            .unwrap()
    }

    fn dark_rows(img: &RgbImage) -> Vec<u32> {
        (0..img.height())
            .filter(|&y| (0..img.width()).any(|x| *img.get_pixel(x, y) == FOREGROUND))
            .collect()
    }

    #[test]
    fn pages_have_exact_dimensions_and_white_background() {
        let g = small_geometry();
        let font = load_font(None, g.font_size).unwrap();
        let pages = render_text("hello", None, &g, &font).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!((pages[0].width(), pages[0].height()), (400, 300));
        let rgb = pages[0].image.to_rgb8();
        assert_eq!(*rgb.get_pixel(0, 0), BACKGROUND);
        assert_eq!(*rgb.get_pixel(399, 299), BACKGROUND);
    }

    #[test]
    fn ink_stays_inside_the_margin_box() {
        let g = small_geometry();
        let font = load_font(None, g.font_size).unwrap();
        let pages = render_text("hello world\nsecond line", Some("Doc"), &g, &font).unwrap();
        let rgb = pages[0].image.to_rgb8();
        for (x, y, px) in rgb.enumerate_pixels() {
            if *px == FOREGROUND {
                assert!(x >= g.margin && y >= g.margin, "ink at ({x},{y})");
                assert!(
                    x < g.page_width - g.margin && y < g.page_height - g.margin,
                    "ink at ({x},{y})"
                );
            }
        }
        assert!(!dark_rows(&rgb).is_empty());
    }

    #[test]
    fn title_shifts_first_line_by_two_line_heights() {
        let g = small_geometry();
        let font = load_font(None, g.font_size).unwrap();
        let pages = Paginator::new(g).paginate("x", Some("T")).unwrap();

        let with_title = render_page(&pages[0], Some("T"), &g, &font);
        let rows = dark_rows(&with_title);
        // Title ink starts in the first line slot, body ink no earlier than
        // the third one.
        assert!(rows.iter().any(|&y| y < g.margin + g.line_height));
        assert!(rows
            .iter()
            .any(|&y| y >= g.margin + 2 * g.line_height));
        assert!(!rows
            .iter()
            .any(|&y| y >= g.margin + g.line_height && y < g.margin + 2 * g.line_height));
    }

    #[test]
    fn title_is_not_drawn_on_later_pages() {
        let g = small_geometry();
        let font = load_font(None, g.font_size).unwrap();
        let text = "a\nb\nc\nd\ne\nf\ng\nh\ni\nj\nk";
        let pages = Paginator::new(g).paginate(text, Some("TITLE")).unwrap();
        assert!(pages.len() >= 2);

        let second_with = render_page(&pages[1], Some("TITLE"), &g, &font);
        let second_without = render_page(&pages[1], None, &g, &font);
        assert_eq!(second_with, second_without);
    }

    #[test]
    fn blank_line_leaves_a_gap() {
        let g = small_geometry();
        let font = load_font(None, g.font_size).unwrap();
        let pages = render_text("a\n\nb", None, &g, &font).unwrap();
        let rows = dark_rows(&pages[0].image.to_rgb8());
        let second_slot = g.margin + g.line_height..g.margin + 2 * g.line_height;
        assert!(!rows.iter().any(|y| second_slot.contains(y)));
        assert!(rows.iter().any(|&y| y >= g.margin + 2 * g.line_height));
    }

    #[test]
    fn rendering_is_deterministic() {
        let g = small_geometry();
        let font = load_font(None, g.font_size).unwrap();
        let a = render_text("same input", Some("t"), &g, &font).unwrap();
        let b = render_text("same input", Some("t"), &g, &font).unwrap();
        assert_eq!(a[0].image.to_rgb8(), b[0].image.to_rgb8());
    }

    #[test]
    fn page_numbers_start_at_one() {
        let g = small_geometry();
        let font = load_font(None, g.font_size).unwrap();
        let text = (0..20).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let pages = render_text(&text, None, &g, &font).unwrap();
        let nums: Vec<usize> = pages.iter().map(|p| p.page_num).collect();
        assert_eq!(nums, (1..=pages.len()).collect::<Vec<_>>());
    }
}
