//! Span grouping: positioned [`TextSpan`]s to the text blocks the page
//! reader orders.
//!
//! ```text
//! TextSpan[]  ->  TextLine[]  ->  TextBlock[]  ->  TextFragment[]
//!              rows, split at       stacked lines     top-down boxes
//!              column gutters       that overlap
//! ```
//!
//! A block never crosses a column gutter: rows are cut wherever the
//! horizontal gap is wider than [`MAX_JOIN_GAP_FACTOR`] font sizes, and lines
//! only stack when their horizontal extents overlap.

use hakusho_core::reader::TextFragment;

use super::backend::PageBox;
use super::spans::{is_spaceless_script_char, TextSpan};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A horizontally contiguous run of spans on one baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub x0: f32,
    pub x1: f32,
    /// Baseline, y up.
    pub y: f32,
    pub font_size: f32,
}

impl TextLine {
    fn top(&self) -> f32 {
        self.y + self.font_size
    }

    fn overlaps(&self, other: &TextLine) -> bool {
        self.x0 <= other.x1 && other.x0 <= self.x1
    }
}

/// Consecutive lines stacked on top of each other.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
}

impl TextBlock {
    /// Convert to a fragment measured from the top-left corner of `area`,
    /// y axis pointing down.
    pub fn to_fragment(&self, area: &PageBox) -> TextFragment {
        let x0 = self.lines.iter().map(|l| l.x0).fold(f32::INFINITY, f32::min);
        let x1 = self.lines.iter().map(|l| l.x1).fold(f32::NEG_INFINITY, f32::max);
        let top = self.lines.iter().map(TextLine::top).fold(f32::NEG_INFINITY, f32::max);
        let bottom = self.lines.iter().map(|l| l.y).fold(f32::INFINITY, f32::min);

        let text = self
            .lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        TextFragment::new(
            x0 - area.x0,
            area.y1 - top,
            x1 - area.x0,
            area.y1 - bottom,
            text,
        )
    }
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Spans whose baselines differ by at most this many points share a row.
const Y_TOLERANCE: f32 = 1.0;

/// Gap (points) under which adjacent spans are glued without a space.
const MIN_WORD_GAP: f32 = 1.5;

/// Gaps wider than this many font sizes separate columns or table cells.
const MAX_JOIN_GAP_FACTOR: f32 = 2.0;

/// A baseline-to-baseline gap above this multiple of the font size starts a
/// new block.
const BLOCK_GAP_FACTOR: f32 = 2.0;

// ---------------------------------------------------------------------------
// Span -> line grouping
// ---------------------------------------------------------------------------

fn by_row_then_x(a: &TextSpan, b: &TextSpan) -> std::cmp::Ordering {
    b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x))
}

/// Group spans into row segments.
///
/// Rows are read top to bottom. Within a row, spans are merged left to right;
/// a space is inserted for word-sized gaps between non-CJK characters, and a
/// gap wider than [`MAX_JOIN_GAP_FACTOR`] font sizes starts a new segment.
pub fn group_spans_into_lines(mut spans: Vec<TextSpan>) -> Vec<TextLine> {
    spans.retain(|s| !s.text.trim().is_empty());
    spans.sort_by(by_row_then_x);

    let mut lines: Vec<TextLine> = Vec::new();
    let mut row: Vec<TextSpan> = Vec::new();

    for span in spans {
        if let Some(first) = row.first() {
            if (first.y - span.y).abs() > Y_TOLERANCE {
                lines.extend(split_row(std::mem::take(&mut row)));
            }
        }
        row.push(span);
    }
    lines.extend(split_row(row));

    lines
}

fn boundary_is_spaceless(prev: &str, next: &str) -> bool {
    match (prev.chars().next_back(), next.chars().next()) {
        (Some(l), Some(f)) => is_spaceless_script_char(l) || is_spaceless_script_char(f),
        _ => true,
    }
}

fn split_row(mut row: Vec<TextSpan>) -> Vec<TextLine> {
    row.sort_by(|a, b| a.x.total_cmp(&b.x));

    let mut segments: Vec<TextLine> = Vec::new();
    for span in row {
        let span_end = span.x + span.width;

        if let Some(prev) = segments.last_mut() {
            let gap = span.x - prev.x1;
            let size = prev.font_size.max(span.font_size);

            if gap <= size * MAX_JOIN_GAP_FACTOR {
                if gap >= MIN_WORD_GAP && !boundary_is_spaceless(&prev.text, &span.text) {
                    prev.text.push(' ');
                }
                prev.text.push_str(span.text.trim());
                prev.x1 = prev.x1.max(span_end);
                prev.font_size = size;
                continue;
            }
        }

        segments.push(TextLine {
            text: span.text.trim().to_string(),
            x0: span.x,
            x1: span_end,
            y: span.y,
            font_size: span.font_size,
        });
    }

    segments
}

// ---------------------------------------------------------------------------
// Line -> block grouping
// ---------------------------------------------------------------------------

/// Stack lines into blocks.
///
/// Lines arrive top to bottom. Each line joins the most recent block whose
/// last line overlaps it horizontally and sits at most
/// [`BLOCK_GAP_FACTOR`] font sizes above it; otherwise it opens a block.
pub fn group_lines_into_blocks(lines: Vec<TextLine>) -> Vec<TextBlock> {
    let mut blocks: Vec<TextBlock> = Vec::new();

    for line in lines {
        let target = blocks.iter_mut().rev().find(|block| {
            block.lines.last().is_some_and(|prev| {
                let gap = prev.y - line.y;
                prev.overlaps(&line) && gap >= 0.0 && gap <= prev.font_size * BLOCK_GAP_FACTOR
            })
        });

        match target {
            Some(block) => block.lines.push(line),
            None => blocks.push(TextBlock { lines: vec![line] }),
        }
    }

    blocks
}

// ---------------------------------------------------------------------------
// Full pipeline
// ---------------------------------------------------------------------------

/// Spans of one page to fragments in top-down coordinates relative to the
/// visible page area.
pub fn spans_to_fragments(spans: Vec<TextSpan>, area: &PageBox) -> Vec<TextFragment> {
    group_lines_into_blocks(group_spans_into_lines(spans))
        .iter()
        .map(|block| block.to_fragment(area))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
