//! PDF fragment source for the page reader.
//!
//! Walks each page's content stream into positioned spans, groups the spans
//! into blocks and hands them out as [`hakusho_core::reader::Page`]s whose
//! fragments use a top-down y axis. Reading order is left to
//! [`hakusho_core::reader`].

use std::path::Path;

use thiserror::Error;

use hakusho_core::reader::{Page, TextFragment};
use parser::backend::{LopdfBackend, PdfBackend};

pub mod cleanup;
pub mod parser;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse PDF bytes into one [`Page`] per PDF page, in page order.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<Page>, PdfError> {
    let backend = LopdfBackend::load_bytes(bytes)?;
    extract_pages_from(&backend)
}

/// Read and parse the PDF at `path`.
pub fn read_pages(path: impl AsRef<Path>) -> Result<Vec<Page>, PdfError> {
    let bytes = std::fs::read(path)?;
    extract_pages(&bytes)
}

/// Build pages from any [`PdfBackend`]. Pages whose content cannot be read
/// come back empty, so every PDF page keeps its place.
pub fn extract_pages_from(backend: &dyn PdfBackend) -> Result<Vec<Page>, PdfError> {
    let pages = parser::spans::extract_all_pages(backend)
        .into_iter()
        .map(|(_, area, spans)| Page {
            width: area.width(),
            fragments: parser::fragments::spans_to_fragments(spans, &area)
                .into_iter()
                .map(clean_fragment)
                .collect(),
        })
        .collect();

    Ok(pages)
}

fn clean_fragment(fragment: TextFragment) -> TextFragment {
    TextFragment {
        text: cleanup::cleanup_text(&fragment.text),
        ..fragment
    }
}
