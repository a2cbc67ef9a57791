//! Pagination and text-page rendering through the public API.

use edgequake_doc2pages::layout::render::BACKGROUND;
use edgequake_doc2pages::{
    load_font, render_text, resolve_font, LayoutError, PageGeometry, Paginator,
};
use proptest::prelude::*;

/// A page whose margin box holds exactly `lines` lines of 20px.
fn geometry(lines: u32, max_chars: usize) -> PageGeometry {
    PageGeometry::builder()
        .page_size(300, 40 + lines * 20)
        .margin(20)
        .font_size(10)
        .line_height(20)
        .max_chars_per_line(max_chars)
        .build()
        .unwrap()
}

#[test]
fn default_geometry_matches_a4_at_300_dpi() {
    let g = PageGeometry::default();
    assert_eq!((g.page_width, g.page_height), (2480, 3508));
    assert_eq!(g.margin, 200);
    assert_eq!(g.font_size, 36);
    assert_eq!(g.line_height, 54);
    assert_eq!(g.max_chars_per_line, 80);
}

#[test]
fn quick_brown_fox_wraps_at_ten() {
    let p = Paginator::new(geometry(5, 10));
    assert_eq!(p.wrap("the quick brown fox"), vec!["the quick", "brown fox"]);
}

#[test]
fn blank_line_between_paragraphs_is_kept() {
    let p = Paginator::new(geometry(5, 10));
    assert_eq!(p.wrap("A\n\nB"), vec!["A", "", "B"]);
}

#[test]
fn overlong_word_is_emitted_whole() {
    let p = Paginator::new(geometry(5, 10));
    assert_eq!(
        p.wrap("a supercalifragilistic b"),
        vec!["a", "supercalifragilistic", "b"]
    );
}

#[test]
fn title_costs_two_lines_on_the_first_page() {
    let p = Paginator::new(geometry(5, 10));
    let text = (1..=9).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
    let pages = p.paginate(&text, Some("Report")).unwrap();

    let sizes: Vec<usize> = pages.iter().map(|pg| pg.len()).collect();
    assert_eq!(sizes, vec![3, 5, 1]);
    assert!(pages[0].is_first());
    assert!(!pages[1].is_first());
}

// Zero pages for empty text is kept for compatibility with existing callers.
#[test]
fn empty_text_yields_zero_pages() {
    let p = Paginator::new(geometry(5, 10));
    assert!(p.paginate("", Some("Report")).unwrap().is_empty());
    assert!(p.paginate("", None).unwrap().is_empty());
}

#[test]
fn page_too_short_for_a_line_is_a_configuration_error() {
    let g = PageGeometry::builder()
        .page_size(300, 50)
        .margin(20)
        .line_height(20)
        .build()
        .unwrap();
    let err = Paginator::new(g).paginate("text", None).unwrap_err();
    assert!(matches!(err, LayoutError::Configuration(_)));
}

#[test]
fn rendered_pages_have_exact_size_and_white_margins() {
    let g = geometry(6, 20);
    let font = resolve_font(None, g.font_size);
    let text = "lorem ipsum dolor sit amet consectetur adipiscing elit\n".repeat(6);
    let pages = render_text(&text, Some("Lorem"), &g, &font).unwrap();
    assert!(pages.len() > 1);

    for (i, page) in pages.iter().enumerate() {
        assert_eq!(page.page_num, i + 1);
        assert_eq!((page.width(), page.height()), (g.page_width, g.page_height));

        let rgb = page.image.to_rgb8();
        let mut inked = 0;
        for (x, y, px) in rgb.enumerate_pixels() {
            let inside = x >= g.margin
                && x < g.page_width - g.margin
                && y >= g.margin
                && y < g.page_height - g.margin;
            if *px != BACKGROUND {
                assert!(inside, "ink at ({x}, {y}) on page {}", i + 1);
                inked += 1;
            }
        }
        assert!(inked > 0, "page {} is blank", i + 1);
    }
}

#[test]
fn unknown_font_face_falls_back_to_default() {
    assert!(load_font(Some("comic-sans"), 36).is_err());
    let font = resolve_font(Some("comic-sans"), 36);
    assert_eq!(font.face(), "10x20");
}

proptest! {
    #[test]
    fn pages_respect_capacity_and_keep_every_line(
        text in "[a-z]{1,12}( [a-z]{1,12}){0,8}(\n[a-z ]{0,40}){0,30}",
        lines in 3u32..10,
        max_chars in 5usize..30,
    ) {
        let p = Paginator::new(geometry(lines, max_chars));
        let pages = p.paginate(&text, Some("T")).unwrap();
        let wrapped = p.wrap(&text);

        let total: usize = pages.iter().map(|pg| pg.len()).sum();
        prop_assert_eq!(total, wrapped.len());
        prop_assert!(pages[0].len() <= lines as usize - 2);
        for page in &pages[1..] {
            prop_assert!(page.len() <= lines as usize);
        }
    }
}
