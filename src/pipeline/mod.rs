//! Pipeline stages for document-to-page-image conversion.
//!
//! Each submodule implements exactly one transformation step; layout of text
//! pages lives in [`crate::layout`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ (layout) ──┐
//!   │                              ├──▶ encode ──▶ sink
//!   └─────▶ rasterize ─────────────┘
//! (path/URL)  (pdfium)            (PNG/JPEG)
//! ```
//!
//! 1. [`input`]    : load a local path or download a URL into memory
//! 2. [`extract`]  : reduce TXT, Markdown and DOCX to plain text
//! 3. [`rasterize`]: render PDF pages via pdfium in `spawn_blocking`
//! 4. [`encode`]   : PNG or quality-100 JPEG bytes for the sink

pub mod encode;
pub mod extract;
pub mod input;
pub mod rasterize;
