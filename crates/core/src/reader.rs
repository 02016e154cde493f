//! Column-aware page reading.
//!
//! Turns the positioned text fragments of a single page into a linear
//! sequence of lines that follows a human reading order. Pages are either
//! read top-to-bottom (one column) or left column first, then right column
//! (two columns).
//!
//! ```text
//! Page  ->  non-blank fragments  ->  classify_layout  ->  order_fragments  ->  lines
//! ```
//!
//! Nothing here validates geometry: fragments with inverted or out-of-page
//! coordinates are classified and sorted using their raw numbers.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Fragments required on *each* side of the midline, exclusive, before a
/// page is treated as two-column.
pub const DEFAULT_COLUMN_THRESHOLD: usize = 3;

/// A positioned run of text on a page.
///
/// Coordinates use a top-down y axis: smaller `y0` means higher on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    /// Raw content; may contain embedded line breaks.
    pub text: String,
}

impl TextFragment {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32, text: impl Into<String>) -> Self {
        Self {
            x0,
            y0,
            x1,
            y1,
            text: text.into(),
        }
    }

    /// Horizontal center of the bounding box.
    pub fn center_x(&self) -> f32 {
        (self.x0 + self.x1) / 2.0
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// One page worth of fragments plus the page width.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub width: f32,
    pub fragments: Vec<TextFragment>,
}

/// Number of reading columns detected on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layout {
    OneColumn,
    TwoColumn,
}

/// Tunables for [`render_page`] and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// A page is two-column only when strictly more than this many fragments
    /// sit on each side of the midline.
    pub column_threshold: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            column_threshold: DEFAULT_COLUMN_THRESHOLD,
        }
    }
}

/// `true` when the fragment's center lies strictly left of the midline.
fn is_left(fragment: &TextFragment, page_width: f32) -> bool {
    fragment.center_x() < page_width / 2.0
}

/// Decide whether a page is laid out in one or two columns.
///
/// Blank fragments are ignored. A page with no fragments is `OneColumn`.
pub fn classify_layout(
    fragments: &[TextFragment],
    page_width: f32,
    config: &ReaderConfig,
) -> Layout {
    let (left, right) = fragments
        .iter()
        .filter(|f| !f.is_blank())
        .fold((0usize, 0usize), |(left, right), f| {
            if is_left(f, page_width) {
                (left + 1, right)
            } else {
                (left, right + 1)
            }
        });

    if left > config.column_threshold && right > config.column_threshold {
        Layout::TwoColumn
    } else {
        Layout::OneColumn
    }
}

/// Top-to-bottom, then left-to-right.
fn by_position(a: &&TextFragment, b: &&TextFragment) -> Ordering {
    a.y0.total_cmp(&b.y0).then(a.x0.total_cmp(&b.x0))
}

/// Arrange fragments in reading order.
///
/// The sort is stable: fragments sharing `(y0, x0)` keep their input order.
/// For two-column pages the whole left column is read before the right one.
pub fn order_fragments<'a>(
    fragments: &'a [TextFragment],
    page_width: f32,
    config: &ReaderConfig,
) -> Vec<&'a TextFragment> {
    match classify_layout(fragments, page_width, config) {
        Layout::OneColumn => {
            let mut ordered: Vec<&TextFragment> = fragments.iter().collect();
            ordered.sort_by(by_position);
            ordered
        }
        Layout::TwoColumn => {
            let (mut left, mut right): (Vec<&TextFragment>, Vec<&TextFragment>) =
                fragments.iter().partition(|f| is_left(f, page_width));
            left.sort_by(by_position);
            right.sort_by(by_position);
            left.extend(right);
            left
        }
    }
}

/// Split each fragment into trimmed, non-empty lines, preserving order.
pub fn fragments_to_lines<'a, I>(ordered: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a TextFragment>,
{
    ordered
        .into_iter()
        .flat_map(|f| f.text.split(['\n', '\r']))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read one page into lines: drop blank fragments, order, split.
pub fn render_page(page: &Page, config: &ReaderConfig) -> Vec<String> {
    let fragments: Vec<TextFragment> = page
        .fragments
        .iter()
        .filter(|f| !f.is_blank())
        .cloned()
        .collect();
    fragments_to_lines(order_fragments(&fragments, page.width, config))
}
