//! Text extraction: reduce non-PDF documents to plain text for layout.
//!
//! | Kind     | Source                          | Reduction                        |
//! |----------|---------------------------------|----------------------------------|
//! | Text     | UTF-8 bytes                     | line endings normalised          |
//! | Markdown | UTF-8 bytes                     | rule pipeline, see below         |
//! | Docx     | zip archive, `word/document.xml`| one line per `<w:p>` paragraph   |
//!
//! The title of every text document is its file name up to the first dot.
//!
//! ## Markdown rules
//!
//! Markdown is flattened line by line, in this order: fence lines are dropped
//! (code inside fences is kept verbatim), then heading markers, setext
//! underlines and thematic breaks, blockquote markers and list bullets (not
//! on heading lines), images, links, inline code and emphasis.
//! Backslash-escaped punctuation stays literal. Inline HTML is removed by
//! [`strip_html`] and runs of blank lines collapse to one. Fenced lines and
//! inline code spans are parked behind placeholders while the other rules
//! run, so none of them touch code.

use crate::document::{base_name, DocumentKind};
use crate::error::Doc2PagesError;
use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::{Captures, Regex};
use std::io::{Cursor, Read};
use tracing::debug;

/// Main document part inside a DOCX archive.
const DOCX_MAIN_PART: &str = "word/document.xml";

/// Plain text ready for the paginator, plus the title drawn on page one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub title: String,
}

/// Extract plain text from a text-based document.
///
/// `name` is the source file name or object key; it supplies the title and
/// appears in error messages.
pub fn extract_plain_text(
    bytes: &[u8],
    kind: DocumentKind,
    name: &str,
) -> Result<ExtractedText, Doc2PagesError> {
    let text = match kind {
        DocumentKind::Text => normalise_line_endings(&decode_utf8(bytes, name)?),
        DocumentKind::Markdown => markdown_to_text(&decode_utf8(bytes, name)?),
        DocumentKind::Docx => docx_to_text(bytes, name)?,
        DocumentKind::Pdf => {
            return Err(Doc2PagesError::Internal(format!(
                "'{name}' is a PDF; PDFs are rasterised, not extracted"
            )))
        }
    };
    debug!("Extracted {} chars of {} text from '{}'", text.len(), kind, name);

    Ok(ExtractedText {
        text,
        title: base_name(name),
    })
}

fn decode_utf8(bytes: &[u8], name: &str) -> Result<String, Doc2PagesError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8(bytes.to_vec()).map_err(|e| Doc2PagesError::InvalidText {
        name: name.to_string(),
        detail: e.to_string(),
    })
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Markdown ─────────────────────────────────────────────────────────────

static RE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s{0,3}(```|~~~)").unwrap());
static RE_ATX_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s{0,3}#{1,6}(?:\s+|$)(.*?)(?:\s+#+)?\s*$").unwrap());
static RE_SETEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s{0,3}(?:=+|-+)\s*$").unwrap());
static RE_THEMATIC_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s{0,3}(?:(?:-\s*){3,}|(?:\*\s*){3,}|(?:_\s*){3,})$").unwrap()
});
static RE_BLOCKQUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s{0,3}(?:>\s?)+").unwrap());
static RE_LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-*+]|\d{1,9}[.)])\s+(?:\[[ xX]\]\s+)?").unwrap());
static RE_LINK_DEFINITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s{0,3}\[[^\]]+\]:\s+\S+").unwrap());
static RE_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\([^)]*\)").unwrap());
static RE_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap());
static RE_REF_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\[[^\]]*\]").unwrap());
static RE_AUTOLINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<((?:https?|mailto):[^>\s]+)>").unwrap());
static RE_STRONG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^*]+?)\*\*|\b__([^_]+?)__\b").unwrap());
static RE_EMPHASIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^*\s][^*]*?)\*|\b_([^_\s][^_]*?)_\b").unwrap());
static RE_STRIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"~~([^~]+?)~~").unwrap());
static RE_INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`+([^`]*?)`+").unwrap());
static RE_VERBATIM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x{F8FF}(\d+)\x{F8FF}").unwrap());
static RE_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\([\\`*_{}\[\]()#+\-.!>~|])").unwrap());

fn first_group(caps: &Captures<'_>) -> String {
    caps.iter()
        .skip(1)
        .flatten()
        .next()
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Flatten Markdown to the text a reader would see.
pub fn markdown_to_text(markdown: &str) -> String {
    let normalised = normalise_line_endings(markdown);
    let mut out: Vec<String> = Vec::new();
    let mut in_fence = false;
    let mut prev_blank = true;
    let mut verbatim = Verbatim::default();

    for line in normalised.lines() {
        if RE_FENCE.is_match(line) {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            out.push(verbatim.park(line));
            prev_blank = line.trim().is_empty();
            continue;
        }

        if RE_THEMATIC_BREAK.is_match(line) || (!prev_blank && RE_SETEXT.is_match(line)) {
            continue;
        }
        if RE_LINK_DEFINITION.is_match(line) {
            continue;
        }

        let line = match RE_ATX_HEADING.captures(line) {
            Some(caps) => caps[1].to_string(),
            None => {
                let line = RE_BLOCKQUOTE.replace(line, "");
                RE_LIST_MARKER.replace(&line, "").into_owned()
            }
        };
        let line = flatten_inline(&line, &mut verbatim);

        prev_blank = line.trim().is_empty();
        out.push(line);
    }

    let text = strip_html(&out.join("\n"));
    verbatim.restore(&collapse_blank_lines(&text))
}

/// Code text held aside while the Markdown and HTML rules run.
///
/// Each span is replaced by `U+F8FF <index> U+F8FF`, which none of the
/// rules match and which never reads as a blank line.
#[derive(Default)]
struct Verbatim {
    spans: Vec<String>,
}

impl Verbatim {
    fn park(&mut self, text: &str) -> String {
        self.spans.push(text.to_string());
        format!("\u{F8FF}{}\u{F8FF}", self.spans.len() - 1)
    }

    fn restore(&self, text: &str) -> String {
        RE_VERBATIM
            .replace_all(text, |caps: &Captures<'_>| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| self.spans.get(i))
                    .cloned()
                    .unwrap_or_default()
            })
            .into_owned()
    }
}

/// Escaped punctuation is parked in a private-use plane while the inline
/// rules run, so `\*` never opens emphasis.
const ESCAPE_PLANE: u32 = 0xF0000;

fn protect_escapes(line: &str) -> String {
    RE_ESCAPE
        .replace_all(line, |caps: &Captures<'_>| {
            caps[1]
                .chars()
                .filter_map(|c| char::from_u32(ESCAPE_PLANE + c as u32))
                .collect::<String>()
        })
        .into_owned()
}

fn restore_escapes(line: &str) -> String {
    line.chars()
        .map(|c| match (c as u32).checked_sub(ESCAPE_PLANE) {
            Some(code) if code < 0x80 => char::from_u32(code).unwrap_or(c),
            _ => c,
        })
        .collect()
}

fn flatten_inline(line: &str, verbatim: &mut Verbatim) -> String {
    // Backslashes inside code spans are literal, so code goes first.
    let line = RE_INLINE_CODE.replace_all(line, |caps: &Captures<'_>| verbatim.park(&caps[1]));
    let line = protect_escapes(&line);
    let s = RE_IMAGE.replace_all(&line, "$1");
    let s = RE_LINK.replace_all(&s, "$1");
    let s = RE_REF_LINK.replace_all(&s, "$1");
    let s = RE_AUTOLINK.replace_all(&s, "$1");
    let s = RE_STRONG.replace_all(&s, |c: &Captures<'_>| first_group(c));
    let s = RE_EMPHASIS.replace_all(&s, |c: &Captures<'_>| first_group(c));
    let s = RE_STRIKE.replace_all(&s, "$1");
    restore_escapes(s.trim_end())
}

fn collapse_blank_lines(input: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for line in input.lines() {
        let blank = line.trim().is_empty();
        if blank && out.last().is_none_or(|l| l.trim().is_empty()) {
            continue;
        }
        out.push(if blank { "" } else { line });
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

// ── HTML ─────────────────────────────────────────────────────────────────

static RE_SCRIPT_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(?:script|style)\s*>").unwrap());
static RE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static RE_BLOCK_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(?:p|div|h[1-6]|li|tr|blockquote|pre|table|ul|ol)\s*>").unwrap()
});
static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?[A-Za-z][^>]*>").unwrap());
static RE_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z]+);").unwrap());

/// Remove HTML markup and decode character entities.
///
/// `<script>` and `<style>` elements are dropped with their content. Block
/// closers and `<br>` become line breaks. Unknown named entities are left
/// as written.
pub fn strip_html(html: &str) -> String {
    let s = RE_SCRIPT_STYLE.replace_all(html, "");
    let s = RE_COMMENT.replace_all(&s, "");
    let s = RE_BLOCK_BREAK.replace_all(&s, "\n");
    let s = RE_TAG.replace_all(&s, "");
    RE_ENTITY
        .replace_all(&s, |caps: &Captures<'_>| {
            decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn decode_entity(entity: &str) -> Option<String> {
    let ch = if let Some(num) = entity.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        char::from_u32(code)?
    } else {
        match entity {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            "nbsp" => ' ',
            _ => return None,
        }
    };
    Some(ch.to_string())
}

// ── DOCX ─────────────────────────────────────────────────────────────────

fn docx_to_text(bytes: &[u8], name: &str) -> Result<String, Doc2PagesError> {
    let invalid = |detail: String| Doc2PagesError::InvalidDocx {
        name: name.to_string(),
        detail,
    };

    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| invalid(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name(DOCX_MAIN_PART)
        .map_err(|e| invalid(format!("{DOCX_MAIN_PART}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| invalid(format!("{DOCX_MAIN_PART}: {e}")))?;

    docx_xml_to_text(&xml).map_err(invalid)
}

/// Walk WordprocessingML and emit one line per paragraph.
///
/// Only `<w:t>` runs contribute text; field codes and deleted text are
/// ignored. Tab-stop definitions inside `<w:tabs>` are not tabs.
fn docx_xml_to_text(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut tabs_depth = 0usize;
    let mut entity_buf = String::with_capacity(16);

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"t" => in_text = true,
                b"tabs" => tabs_depth += 1,
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"tabs" => tabs_depth = tabs_depth.saturating_sub(1),
                b"p" => lines.push(std::mem::take(&mut current)),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" if tabs_depth == 0 => current.push(' '),
                b"br" | b"cr" => current.push('\n'),
                b"p" => lines.push(String::new()),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text => {
                let text = e.decode().map_err(|err| format!("decode error: {err:?}"))?;
                current.push_str(&text);
            }
            Ok(Event::GeneralRef(e)) if in_text => {
                let entity = e.decode().map_err(|err| format!("decode error: {err:?}"))?;
                entity_buf.clear();
                entity_buf.push('&');
                entity_buf.push_str(&entity);
                entity_buf.push(';');
                let resolved = quick_xml::escape::unescape(&entity_buf)
                    .map_err(|err| format!("unescape error: {err:?}"))?;
                current.push_str(&resolved);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "malformed XML at byte {}: {e}",
                    reader.buffer_position()
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    if !current.is_empty() {
        lines.push(current);
    }
    Ok(lines.join("\n"))
}
