//! Text pagination: wrap plain text to a fixed character width and split it
//! into fixed-capacity pages.
//!
//! ## Data Flow
//!
//! ```text
//! text ──▶ logical lines ──▶ wrapped lines ──▶ pages ──▶ bitmaps
//!         (split on \n)    (word-wrap)      (greedy)   (render)
//! ```
//!
//! Everything in this module is pure: no I/O, no shared state, identical
//! inputs always give identical pages. Rendering lives in [`render`] and the
//! bitmap faces in [`font`].
//!
//! ## Capacity
//!
//! `lines_per_page = (page_height - 2 × margin) / line_height`. A title takes
//! two slots (title + blank separator) on the **first** page only; every later
//! page gets the full `lines_per_page`.

pub mod font;
pub mod render;

use crate::error::LayoutError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Lines reserved on the first page for a title and its blank separator.
pub const TITLE_RESERVED_LINES: usize = 2;

// ── Geometry ─────────────────────────────────────────────────────────────

/// Page dimensions, margins and line metrics, all in pixels.
///
/// The defaults describe an A4 page at 300 DPI with a 36 px font and 1.5×
/// line spacing, wrapped at 80 characters.
///
/// # Example
/// ```rust
/// use edgequake_doc2pages::PageGeometry;
///
/// let geometry = PageGeometry::builder()
///     .page_size(1240, 1754)
///     .margin(100)
///     .font_size(18)
///     .build()
///     .unwrap();
/// assert_eq!(geometry.line_height, 27);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageGeometry {
    /// Page width in pixels. Default: 2480.
    pub page_width: u32,
    /// Page height in pixels. Default: 3508.
    pub page_height: u32,
    /// Margin applied on all four sides. Default: 200.
    pub margin: u32,
    /// Nominal font size in pixels. Default: 36.
    pub font_size: u32,
    /// Vertical advance per line. Default: `font_size × 1.5` = 54.
    pub line_height: u32,
    /// Word-wrap limit in characters. Default: 80.
    pub max_chars_per_line: usize,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            page_width: 2480,
            page_height: 3508,
            margin: 200,
            font_size: 36,
            line_height: 54,
            max_chars_per_line: 80,
        }
    }
}

impl PageGeometry {
    /// Create a new builder starting from the defaults.
    pub fn builder() -> PageGeometryBuilder {
        PageGeometryBuilder {
            geometry: Self::default(),
            line_height_set: false,
        }
    }

    /// Check the structural invariants: the margin box is non-empty and the
    /// line metrics are positive.
    ///
    /// Whether a page can hold at least one line is checked by
    /// [`Paginator::capacity`], since the answer depends on the title.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.page_width <= self.margin.saturating_mul(2) {
            return Err(LayoutError::Configuration(format!(
                "page width {} must exceed twice the margin ({})",
                self.page_width, self.margin
            )));
        }
        if self.page_height <= self.margin.saturating_mul(2) {
            return Err(LayoutError::Configuration(format!(
                "page height {} must exceed twice the margin ({})",
                self.page_height, self.margin
            )));
        }
        if self.line_height == 0 {
            return Err(LayoutError::Configuration("line height must be ≥ 1".into()));
        }
        if self.font_size == 0 {
            return Err(LayoutError::Configuration("font size must be ≥ 1".into()));
        }
        if self.max_chars_per_line == 0 {
            return Err(LayoutError::Configuration(
                "characters per line must be ≥ 1".into(),
            ));
        }
        Ok(())
    }

    /// Height of the area between the top and bottom margins.
    pub fn usable_height(&self) -> u32 {
        self.page_height.saturating_sub(self.margin.saturating_mul(2))
    }

    /// Number of lines that fit between the margins, before any title
    /// reservation.
    pub fn lines_per_page(&self) -> usize {
        if self.line_height == 0 {
            return 0;
        }
        (self.usable_height() / self.line_height) as usize
    }
}

/// Builder for [`PageGeometry`].
#[derive(Debug)]
pub struct PageGeometryBuilder {
    geometry: PageGeometry,
    line_height_set: bool,
}

impl PageGeometryBuilder {
    pub fn page_size(mut self, width: u32, height: u32) -> Self {
        self.geometry.page_width = width;
        self.geometry.page_height = height;
        self
    }

    pub fn page_width(mut self, width: u32) -> Self {
        self.geometry.page_width = width;
        self
    }

    pub fn page_height(mut self, height: u32) -> Self {
        self.geometry.page_height = height;
        self
    }

    pub fn margin(mut self, margin: u32) -> Self {
        self.geometry.margin = margin;
        self
    }

    /// Set the font size. Unless [`line_height`](Self::line_height) is also
    /// set, the line height follows at 1.5× (truncated).
    pub fn font_size(mut self, size: u32) -> Self {
        self.geometry.font_size = size;
        if !self.line_height_set {
            self.geometry.line_height = size.saturating_mul(3) / 2;
        }
        self
    }

    pub fn line_height(mut self, height: u32) -> Self {
        self.geometry.line_height = height;
        self.line_height_set = true;
        self
    }

    pub fn max_chars_per_line(mut self, n: usize) -> Self {
        self.geometry.max_chars_per_line = n;
        self
    }

    /// Build the geometry, validating its invariants.
    pub fn build(self) -> Result<PageGeometry, LayoutError> {
        self.geometry.validate()?;
        Ok(self.geometry)
    }
}

// ── Measuring ────────────────────────────────────────────────────────────

/// Width function used by the word-wrapper.
///
/// Returns the rendered width of `text` in the same unit as
/// [`PageGeometry::max_chars_per_line`].
pub trait TextMeasure {
    fn width(&self, text: &str) -> usize;
}

/// Fixed-width metric: every `char` is one unit wide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CharCount;

impl TextMeasure for CharCount {
    fn width(&self, text: &str) -> usize {
        text.chars().count()
    }
}

impl<F> TextMeasure for F
where
    F: Fn(&str) -> usize,
{
    fn width(&self, text: &str) -> usize {
        self(text)
    }
}

// ── Pages ────────────────────────────────────────────────────────────────

/// One page worth of wrapped lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    lines: Vec<String>,
    first: bool,
}

impl Page {
    /// The wrapped lines of this page, top to bottom.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Only the first page may carry the document title.
    pub fn is_first(&self) -> bool {
        self.first
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Line capacity of the first page and of every later page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCapacity {
    pub first: usize,
    pub rest: usize,
}

impl PageCapacity {
    fn for_page(&self, page_idx: usize) -> usize {
        if page_idx == 0 {
            self.first
        } else {
            self.rest
        }
    }
}

/// Split `text` into logical lines.
///
/// Follows [`str::lines`]: `\n` and `\r\n` both end a line, a trailing line
/// break does not open an extra empty line, and empty text has no lines.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.lines().collect()
}

/// Word-wrap a single logical line.
///
/// Blank (empty or whitespace-only) lines yield one empty wrapped line. A
/// word wider than `max_width` is emitted alone and unshortened.
pub fn wrap_line<M: TextMeasure + ?Sized>(line: &str, max_width: usize, measure: &M) -> Vec<String> {
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return vec![String::new()];
    };

    let mut wrapped = Vec::new();
    let mut current = first.to_string();
    for word in words {
        let candidate_width = measure.width(&current) + measure.width(" ") + measure.width(word);
        if candidate_width <= max_width {
            current.push(' ');
            current.push_str(word);
        } else {
            wrapped.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    wrapped.push(current);
    wrapped
}

/// Splits text into pages for one [`PageGeometry`].
///
/// # Example
/// ```rust
/// use edgequake_doc2pages::{PageGeometry, Paginator};
///
/// let geometry = PageGeometry::builder().max_chars_per_line(10).build().unwrap();
/// let paginator = Paginator::new(geometry);
/// assert_eq!(paginator.wrap("the quick brown fox"), vec!["the quick", "brown fox"]);
/// ```
#[derive(Debug, Clone)]
pub struct Paginator<M = CharCount> {
    geometry: PageGeometry,
    measure: M,
}

impl Paginator<CharCount> {
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            measure: CharCount,
        }
    }
}

impl<M: TextMeasure> Paginator<M> {
    /// Use a custom width function instead of counting characters.
    pub fn with_measure(geometry: PageGeometry, measure: M) -> Self {
        Self { geometry, measure }
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    /// Wrap every logical line of `text`, preserving blank lines.
    pub fn wrap(&self, text: &str) -> Vec<String> {
        split_lines(text)
            .into_iter()
            .flat_map(|line| wrap_line(line, self.geometry.max_chars_per_line, &self.measure))
            .collect()
    }

    /// Compute how many wrapped lines the first and later pages hold.
    ///
    /// Fails with [`LayoutError::Configuration`] when either capacity would
    /// be below one line.
    pub fn capacity(&self, has_title: bool) -> Result<PageCapacity, LayoutError> {
        self.geometry.validate()?;
        let lines_per_page = self.geometry.lines_per_page();
        if lines_per_page < 1 {
            return Err(LayoutError::Configuration(format!(
                "usable height {}px holds no line of height {}px",
                self.geometry.usable_height(),
                self.geometry.line_height
            )));
        }

        let first = if has_title {
            lines_per_page.saturating_sub(TITLE_RESERVED_LINES)
        } else {
            lines_per_page
        };
        if first < 1 {
            return Err(LayoutError::Configuration(format!(
                "first page holds {lines_per_page} line(s), not enough for a title \
                 and at least one line of text"
            )));
        }

        Ok(PageCapacity {
            first,
            rest: lines_per_page,
        })
    }

    /// Wrap and paginate `text`.
    ///
    /// An empty `title` counts as no title. Text without any line yields no
    /// pages at all, not a single blank page.
    pub fn paginate(&self, text: &str, title: Option<&str>) -> Result<Vec<Page>, LayoutError> {
        let has_title = title.is_some_and(|t| !t.is_empty());
        let capacity = self.capacity(has_title)?;
        let wrapped = self.wrap(text);
        let pages = paginate_lines(wrapped, capacity);
        debug!(
            "Paginated {} wrapped lines into {} pages (capacity {}/{})",
            pages.iter().map(Page::len).sum::<usize>(),
            pages.len(),
            capacity.first,
            capacity.rest
        );
        Ok(pages)
    }
}

/// Greedily fill pages with already-wrapped lines.
pub fn paginate_lines(lines: Vec<String>, capacity: PageCapacity) -> Vec<Page> {
    let mut pages: Vec<Page> = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for line in lines {
        if current.len() >= capacity.for_page(pages.len()) {
            pages.push(Page {
                lines: std::mem::take(&mut current),
                first: pages.is_empty(),
            });
        }
        current.push(line);
    }

    if !current.is_empty() {
        pages.push(Page {
            lines: current,
            first: pages.is_empty(),
        });
    }

    pages
}
